//! Scalar token conversions.
//!
//! Every function here treats the null sentinels the same way: strings map to
//! `Value::Null`, booleans map to `false`, and nothing returns an error for a
//! null-like input.

use super::value::{is_null_str, Value};
use crate::error::DecodeError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y%m%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M", "%H%M%S"];

/// Trimmed string, or `Null` for a null-like token.
pub fn to_str(raw: &str) -> Value {
    if is_null_str(raw) {
        Value::Null
    } else {
        Value::Str(raw.trim().to_string())
    }
}

/// `Y`/`Yes`/`T`/`True`/`1` are true; anything else, null included, is false.
pub fn to_bool(raw: &str) -> Value {
    let truthy = match to_str(raw) {
        Value::Str(s) => s
            .chars()
            .next()
            .is_some_and(|c| matches!(c.to_ascii_uppercase(), '1' | 'T' | 'Y')),
        _ => false,
    };
    Value::Bool(truthy)
}

/// Integer or real number; thousands separators are accepted.
///
/// Unparseable input and non-finite results become `Null`.
pub fn to_number(raw: &str) -> Value {
    if is_null_str(raw) {
        return Value::Null;
    }
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(i) = cleaned.parse::<i64>() {
        return Value::Int(i);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Null,
    }
}

/// Parse a calendar date in any of the formats the service emits.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DecodeError> {
    let s = raw.trim();
    let parsed = if s.contains('/') {
        let year_len = s.rsplit('/').next().map_or(0, str::len);
        let fmt = if year_len == 4 { "%m/%d/%Y" } else { "%m/%d/%y" };
        NaiveDate::parse_from_str(s, fmt).ok()
    } else if s.contains('-') {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    } else if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::parse_from_str(s, "%Y%m%d").ok()
    } else {
        None
    };
    parsed.ok_or_else(|| DecodeError::invalid("date", raw))
}

pub fn to_date(raw: &str) -> Result<Value, DecodeError> {
    if is_null_str(raw) {
        return Ok(Value::Null);
    }
    parse_date(raw).map(Value::Date)
}

/// `MM/YY` (or `MM/YYYY`) as the first day of that month.
pub fn to_month_year(raw: &str) -> Result<Value, DecodeError> {
    if is_null_str(raw) {
        return Ok(Value::Null);
    }
    let s = raw.trim();
    let (month, year) = s
        .split_once('/')
        .ok_or_else(|| DecodeError::invalid("month/year", raw))?;
    let month: u32 = month
        .parse()
        .map_err(|_| DecodeError::invalid("month/year", raw))?;
    let year: i32 = year
        .parse()
        .map_err(|_| DecodeError::invalid("month/year", raw))?;
    let year = match year {
        0..=68 => 2000 + year,
        69..=99 => 1900 + year,
        y => y,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(Value::Date)
        .ok_or_else(|| DecodeError::invalid("month/year", raw))
}

/// Date-time; a bare date is taken at midnight, a bare time is passed through as `Time`.
pub fn to_datetime(raw: &str) -> Result<Value, DecodeError> {
    if is_null_str(raw) {
        return Ok(Value::Null);
    }
    let s = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Value::DateTime(dt));
        }
    }
    if let Ok(d) = parse_date(s) {
        return Ok(Value::DateTime(d.and_time(NaiveTime::MIN)));
    }
    to_time(s).map_err(|_| DecodeError::invalid("date-time", raw))
}

pub fn to_time(raw: &str) -> Result<Value, DecodeError> {
    if is_null_str(raw) {
        return Ok(Value::Null);
    }
    let s = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .map(Value::Time)
        .ok_or_else(|| DecodeError::invalid("time", raw))
}

/// Country code with noise stripped: only letters are kept.
///
/// Sequences yield their first non-null normalized element.
pub fn to_country_code(value: &Value) -> Value {
    match value {
        Value::Str(s) if !is_null_str(s) => {
            let letters: String = s.chars().filter(char::is_ascii_alphabetic).collect();
            if letters.is_empty() {
                Value::Null
            } else {
                Value::Str(letters)
            }
        }
        Value::List(items) | Value::Tuple(items) => items
            .iter()
            .map(to_country_code)
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
