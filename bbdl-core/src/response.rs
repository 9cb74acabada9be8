//! Response decoder.
//!
//! Line-driven state machine: `ScanHeader -> InFields -> ScanHeader -> InData -> Done`.
//! Marker nesting errors abort the whole file; conversion errors only null a field.

use crate::codec::{Codec, Value};
use crate::codec::scalar::parse_date;
use crate::error::BbdlError;
use crate::result::{ErrorRow, RequestResult, Row};
use crate::wire::{
    error_message, DATE, END_OF_DATA, END_OF_FIELDS, HISTORY_PROGRAM, IDENTIFIER, NFIELDS,
    RC_OK, RETCODE, START_OF_DATA, START_OF_FIELDS, STATUS_FIELDS,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ScanHeader,
    InFields,
    InData,
    Done,
}

/// What the header section of a request or response file declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub is_history: bool,
    pub fields: Vec<String>,
}

impl Header {
    /// Status columns followed by the declared fields.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = STATUS_FIELDS.to_vec();
        if self.is_history {
            cols.push(DATE);
        }
        cols.extend(self.fields.iter().map(String::as_str));
        cols
    }
}

/// Marker bookkeeping shared by header-only and full decoding.
struct Scanner {
    state: State,
    fields_done: bool,
    header: Header,
}

impl Scanner {
    fn new() -> Self {
        Self {
            state: State::ScanHeader,
            fields_done: false,
            header: Header::default(),
        }
    }

    /// Advance on one line. Returns the line back if it is a data line.
    fn feed<'l>(&mut self, lineno: usize, line: &'l str) -> Result<Option<&'l str>, BbdlError> {
        let trimmed = line.trim();
        match trimmed {
            START_OF_FIELDS => {
                if self.state != State::ScanHeader {
                    return Err(BbdlError::parse(lineno, "unexpected START-OF-FIELDS"));
                }
                self.state = State::InFields;
            }
            END_OF_FIELDS => {
                if self.state != State::InFields {
                    return Err(BbdlError::parse(lineno, "END-OF-FIELDS outside a fields block"));
                }
                self.state = State::ScanHeader;
                self.fields_done = true;
            }
            START_OF_DATA => {
                if self.state != State::ScanHeader {
                    return Err(BbdlError::parse(lineno, "unexpected START-OF-DATA"));
                }
                self.state = State::InData;
            }
            END_OF_DATA => {
                if self.state != State::InData {
                    return Err(BbdlError::parse(lineno, "END-OF-DATA outside a data block"));
                }
                self.state = State::Done;
            }
            _ => match self.state {
                State::ScanHeader if trimmed == HISTORY_PROGRAM => self.header.is_history = true,
                State::InFields if !trimmed.is_empty() => {
                    self.header.fields.push(trimmed.to_string())
                }
                State::InData if !trimmed.is_empty() => return Ok(Some(line)),
                _ => {}
            },
        }
        Ok(None)
    }

    fn finish(&self, lineno: usize) -> Result<(), BbdlError> {
        match self.state {
            State::InFields => Err(BbdlError::parse(lineno, "missing END-OF-FIELDS")),
            State::InData => Err(BbdlError::parse(lineno, "missing END-OF-DATA")),
            _ => Ok(()),
        }
    }

    /// A full reply must have reached `END-OF-DATA`.
    fn finish_reply(&self, lineno: usize) -> Result<(), BbdlError> {
        self.finish(lineno)?;
        match self.state {
            State::Done => Ok(()),
            _ if self.fields_done => Err(BbdlError::parse(lineno, "missing START-OF-DATA")),
            _ => Err(BbdlError::parse(lineno, "missing START-OF-FIELDS")),
        }
    }
}

fn lines<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader.lines().enumerate().map(|(i, l)| (i + 1, l))
}

/// Read only up to the end of the fields block.
pub fn read_header<R: BufRead>(reader: R) -> Result<Header, BbdlError> {
    let mut scanner = Scanner::new();
    let mut last = 0;
    for (lineno, line) in lines(reader) {
        let line = line?;
        last = lineno;
        scanner.feed(lineno, line.trim_end_matches('\r'))?;
        if scanner.fields_done {
            return Ok(scanner.header);
        }
    }
    scanner.finish(last)?;
    Ok(scanner.header)
}

/// Split a data line, dropping the single trailing empty token.
fn split_line(line: &str, delimiter: char) -> Vec<&str> {
    let mut tokens: Vec<&str> = line.split(delimiter).collect();
    if tokens.len() > 1 && tokens.last().is_some_and(|t| t.trim().is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Decode a full response stream.
pub fn decode<R: BufRead>(
    reader: R,
    codec: &Codec<'_>,
    delimiter: char,
) -> Result<RequestResult, BbdlError> {
    let mut scanner = Scanner::new();
    let mut result = RequestResult::new();
    let mut last = 0;

    for (lineno, line) in lines(reader) {
        let line = line?;
        last = lineno;
        let Some(data) = scanner.feed(lineno, line.trim_end_matches('\r'))? else {
            if scanner.state == State::Done {
                break;
            }
            continue;
        };
        decode_line(lineno, data, &scanner.header, codec, delimiter, &mut result);
    }
    scanner.finish_reply(last)?;

    if scanner.header.is_history {
        result.data = reshape_history(std::mem::take(&mut result.data));
    }
    debug!(
        rows = result.data.len(),
        errors = result.errors.len(),
        history = scanner.header.is_history,
        "decoded response"
    );
    Ok(result)
}

pub fn decode_file(
    path: &Path,
    codec: &Codec<'_>,
    delimiter: char,
) -> Result<RequestResult, BbdlError> {
    let file = File::open(path)?;
    decode(BufReader::new(file), codec, delimiter)
}

fn decode_line(
    lineno: usize,
    line: &str,
    header: &Header,
    codec: &Codec<'_>,
    delimiter: char,
    result: &mut RequestResult,
) {
    let tokens = split_line(line, delimiter);
    if tokens.len() < 2 {
        warn!(line = lineno, "skipping data line without a return code: {line:?}");
        return;
    }
    let retcode = tokens[1].trim();

    if retcode != RC_OK {
        let message = error_message(retcode);
        let date = if header.is_history {
            tokens.get(3).and_then(|d| parse_date(d.trim()).ok())
        } else {
            None
        };
        let error = ErrorRow {
            identifier: tokens[0].trim().to_string(),
            retcode: retcode.to_string(),
            nfields: tokens.get(2).and_then(|n| n.trim().parse().ok()),
            date,
            message,
        };
        warn!(
            identifier = %error.identifier,
            retcode = %error.retcode,
            "{}",
            message.unwrap_or("unmapped return code")
        );
        result.errors.push(error);
        return;
    }

    let mut row = Row::default();
    for (name, raw) in header.columns().into_iter().zip(tokens) {
        let value = codec.to_value(name, raw).unwrap_or_else(|e| {
            debug!(line = lineno, field = name, "conversion failed: {e}");
            Value::Null
        });
        result.push_column(name, codec.to_type(name));
        match name {
            IDENTIFIER => row.identifier = value.as_str().map(str::to_string),
            RETCODE => row.retcode = value.as_i64(),
            NFIELDS => row.nfields = value.as_i64(),
            _ => row.fields.push((name.to_string(), value)),
        }
    }
    result.data.push(row);
}

/// Fold one-row-per-date into one row per identifier, values as sequences.
fn reshape_history(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.identifier) {
            Some(&i) => {
                let entry = &mut out[i];
                for (name, value) in row.fields {
                    match entry.get_mut(&name) {
                        Some(Value::List(items)) => items.push(value),
                        _ => entry.insert(name, Value::List(vec![value])),
                    }
                }
            }
            None => {
                index.insert(row.identifier.clone(), out.len());
                out.push(Row {
                    fields: row
                        .fields
                        .into_iter()
                        .map(|(name, value)| (name, Value::List(vec![value])))
                        .collect(),
                    ..row
                });
            }
        }
    }
    out
}
