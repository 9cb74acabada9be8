//! Security identifiers as they appear in the request data block.

use crate::error::BbdlError;
use crate::ticker::canonical_yellow_key;
use std::fmt;

/// One line of the `START-OF-DATA` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A full ticker, e.g. `IBM US Equity`.
    Ticker(String),
    /// A value with an explicit identifier type, e.g. `459200101|CUSIP`.
    Typed { value: String, id_type: String },
    /// A typed value with field overrides.
    Override {
        value: String,
        id_type: String,
        overrides: Vec<(String, String)>,
    },
}

impl Identifier {
    pub fn ticker(t: impl Into<String>) -> Self {
        Identifier::Ticker(t.into())
    }

    pub fn typed(value: impl Into<String>, id_type: impl Into<String>) -> Self {
        Identifier::Typed {
            value: value.into(),
            id_type: id_type.into(),
        }
    }

    /// Build from raw parts: one part is a ticker, two are `value, type`, and an
    /// even count above three is `value, type, k1, v1, ..., kN, vN`.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Result<Self, BbdlError> {
        let parts: Vec<&str> = parts.iter().map(|p| p.as_ref()).collect();
        match parts.as_slice() {
            [ticker] => Ok(Identifier::ticker(*ticker)),
            [value, id_type] => Ok(Identifier::typed(*value, *id_type)),
            [value, id_type, rest @ ..] if parts.len() > 3 && parts.len() % 2 == 0 => {
                Ok(Identifier::Override {
                    value: value.to_string(),
                    id_type: id_type.to_string(),
                    overrides: rest
                        .chunks(2)
                        .map(|kv| (kv[0].to_string(), kv[1].to_string()))
                        .collect(),
                })
            }
            _ => Err(BbdlError::validation(format!(
                "unexpected identifier format: {parts:?}"
            ))),
        }
    }

    /// Parse the `|`-separated command-line form.
    pub fn parse(s: &str) -> Result<Self, BbdlError> {
        let trimmed = s.trim().trim_end_matches('|');
        if trimmed.is_empty() {
            return Err(BbdlError::validation("empty identifier"));
        }
        let parts: Vec<&str> = trimmed.split('|').map(str::trim).collect();
        Self::from_parts(&parts)
    }

    /// Wire form of this identifier.
    pub fn encode(&self) -> String {
        match self {
            Identifier::Ticker(t) => normalize_yellow_key(t),
            Identifier::Typed { value, id_type } => format!("{value}|{id_type}"),
            Identifier::Override {
                value,
                id_type,
                overrides,
            } => {
                let mut line = format!("{value}|{id_type}|{}", overrides.len());
                for (k, v) in overrides {
                    line.push('|');
                    line.push_str(k);
                    line.push('|');
                    line.push_str(v);
                }
                line
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::ticker(s)
    }
}

/// Tickers ending in a yellow key get the canonical `UPPER ... Key` casing;
/// anything else is passed through untouched.
fn normalize_yellow_key(ticker: &str) -> String {
    let Some((head, last)) = ticker.rsplit_once(' ') else {
        return ticker.to_string();
    };
    match canonical_yellow_key(last) {
        Some(key) => format!("{} {key}", head.to_uppercase()),
        None => ticker.to_string(),
    }
}
