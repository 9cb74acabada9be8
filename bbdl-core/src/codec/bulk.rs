//! Bulk field decoder.
//!
//! Wire form: `<d><dims><d><rows><d>[<cols><d>](<code><d><value><d>){rows*cols}`
//! where `<d>` is the first character of the string. Values are decoded
//! according to a per-item type code; code 8 nests another bulk value.

use super::scalar::{to_bool, to_date, to_datetime, to_month_year, to_number, to_str, to_time};
use super::value::{is_null_str, Value};
use crate::error::DecodeError;
use tracing::debug;

/// Named columns for bulk fields whose rows are better read as records.
pub const BULK_FIELD_KEYS: &[(&str, &[&str])] = &[
    ("CALL_SCHEDULE", &["Call Date", "Call Price"]),
    ("PUT_SCHEDULE", &["Put Date", "Put Price"]),
    ("SOFT_CALL_SCHEDULE", &["Soft Call Date", "Soft Call Price"]),
    ("SOFT_CALL_SCHEDULE_EXTENDED", &["Soft Call Date", "Soft Call Price"]),
    (
        "DDIS_AMT_OUTSTANDING_BY_YR_BNDLN",
        &["Year", "Amount Outstanding - Ultimate Parent"],
    ),
    (
        "ISSUE_UNDERWRITER",
        &["Role", "Firm", "Abbreviation", "Code", "Description", "Amount", "Order", "Date"],
    ),
    ("CONVERSION_RESET_SCHEDULE", &["Reset Date", "Conversion Price", "Floor"]),
    ("REDEMPTION_UNDERLYING", &["Ticker", "Type"]),
    (
        "REDEMPTION_UNDERLYING_DATA",
        &["Ticker", "Weight", "Initial Value", "Strike", "Upper Barrier", "Lower Barrier", "Num Shares"],
    ),
];

/// Column names registered for a bulk mnemonic.
pub fn bulk_keys(mnemonic: &str) -> Option<&'static [&'static str]> {
    BULK_FIELD_KEYS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(mnemonic))
        .map(|(_, keys)| *keys)
}

struct Cursor<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str, DecodeError> {
        let tok = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| DecodeError::Bulk(format!("ran out of tokens reading {what}")))?;
        self.pos += 1;
        Ok(tok)
    }

    fn next_usize(&mut self, what: &str) -> Result<usize, DecodeError> {
        let tok = self.next(what)?;
        tok.trim()
            .parse()
            .map_err(|_| DecodeError::Bulk(format!("bad {what}: '{tok}'")))
    }
}

/// Decode a bulk value into a list of scalars (one column) or tuples.
///
/// A malformed item stops decoding; whatever was decoded before it is returned
/// and the failure is logged. Non-bulk input decodes to `Null`.
pub fn to_list(raw: &str) -> Value {
    let s = raw.trim();
    if is_null_str(s) {
        return Value::Null;
    }
    let Some(delim) = s.chars().next().filter(char::is_ascii_punctuation) else {
        return Value::Null;
    };
    let mut items = Vec::new();
    if let Err(e) = decode_into(s, delim, &mut items) {
        debug!(error = %e, value = raw, "error parsing bulk field, skipping remainder");
    }
    Value::List(items)
}

fn decode_into(s: &str, delim: char, items: &mut Vec<Value>) -> Result<(), DecodeError> {
    let body = &s[delim.len_utf8()..];
    let body = body.strip_suffix(delim).unwrap_or(body);
    let mut cursor = Cursor {
        tokens: body.split(delim).collect(),
        pos: 0,
    };

    let dims = cursor.next_usize("dimension")?;
    if !(1..=2).contains(&dims) {
        return Err(DecodeError::Bulk(format!("dimension not supported: {dims}")));
    }
    let rows = cursor.next_usize("row count")?;
    let cols = if dims == 2 {
        cursor.next_usize("column count")?
    } else {
        1
    };
    if cols == 0 {
        return Err(DecodeError::Bulk("column count is zero".into()));
    }

    for _ in 0..rows {
        let mut row = Vec::new();
        for _ in 0..cols {
            let code = cursor.next_usize("type code")?;
            let value = cursor.next("value")?;
            row.push(convert_item(code, value)?);
        }
        if cols == 1 {
            items.extend(row);
        } else {
            items.push(Value::Tuple(row));
        }
    }
    Ok(())
}

fn convert_item(code: usize, raw: &str) -> Result<Value, DecodeError> {
    match code {
        1 | 4 | 11 => Ok(to_str(raw)),
        2 | 3 | 13 | 12 => Ok(to_number(raw)),
        5 => to_date(raw),
        6 => to_time(raw),
        7 => to_datetime(raw),
        8 => Ok(to_list(raw)),
        9 => to_month_year(raw),
        10 => Ok(to_bool(raw)),
        other => Err(DecodeError::Bulk(format!(
            "unexpected item type code {other} for value '{raw}'"
        ))),
    }
}

/// Turn decoded bulk rows into named records using the registered column names.
pub fn to_records(value: Value, keys: &[&str]) -> Value {
    let Value::List(rows) = value else {
        return value;
    };
    let records = rows
        .into_iter()
        .map(|row| {
            let cells = match row {
                Value::Tuple(cells) => cells,
                scalar => vec![scalar],
            };
            Value::Record(
                keys.iter()
                    .map(|k| k.to_string())
                    .zip(cells)
                    .collect(),
            )
        })
        .collect();
    Value::List(records)
}
