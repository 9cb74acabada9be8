//! Ticker helpers for the `<symbol> [qualifiers] <yellow key>` ticker form.

/// Market-sector suffixes ("yellow keys") in their canonical capitalization.
pub const YELLOW_KEYS: [&str; 10] = [
    "Comdty", "Equity", "Muni", "Pfd", "M-Mkt", "Govt", "Corp", "Index", "Curncy", "Mtge",
];

/// Upper-case every space-delimited token except the last, which is capitalized.
///
/// `"01234abc89 Us EQUITY"` becomes `"01234ABC89 US Equity"`. A single token is
/// upper-cased. Returns `None` for an empty ticker.
pub fn fix_case(ticker: &str) -> Option<String> {
    if ticker.is_empty() {
        return None;
    }
    let bits: Vec<&str> = ticker.split(' ').collect();
    if bits.len() == 1 {
        return Some(ticker.to_uppercase());
    }
    let (last, head) = bits.split_last()?;
    let mut out: Vec<String> = head.iter().map(|b| b.to_uppercase()).collect();
    out.push(capitalize(last));
    Some(out.join(" "))
}

/// True iff the ticker has at least two tokens and ends in a yellow key.
pub fn is_valid_ticker(ticker: &str) -> bool {
    let bits: Vec<&str> = ticker.split(' ').collect();
    if bits.len() < 2 {
        return false;
    }
    bits.last().is_some_and(|key| YELLOW_KEYS.contains(key))
}

/// Canonical form of a yellow key, matched case-insensitively.
pub fn canonical_yellow_key(token: &str) -> Option<&'static str> {
    YELLOW_KEYS
        .iter()
        .copied()
        .find(|key| key.eq_ignore_ascii_case(token))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
