//! Error types for request/response processing.
//!
//! `BbdlError` is what callers see. `DecodeError` is the per-field conversion
//! failure; the response decoder catches and logs it, so it never escapes a
//! decode call.

use thiserror::Error;

/// Errors surfaced to callers of the library.
#[derive(Debug, Error)]
pub enum BbdlError {
    /// Transport-level failure reported by the file-transfer session.
    #[error("connection error: {0}")]
    Connection(String),

    /// The reply file never showed up within the poll budget (or the wait was cancelled).
    #[error("timeout waiting for reply file: {filename} (after {attempts} polls)")]
    Timeout { filename: String, attempts: u32 },

    /// Structurally malformed response file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Illegal options or a malformed identifier.
    #[error("validation error: {0}")]
    Validation(String),

    /// Field catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BbdlError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        BbdlError::Validation(msg.into())
    }

    pub(crate) fn parse(line: usize, msg: impl Into<String>) -> Self {
        BbdlError::Parse {
            line,
            message: msg.into(),
        }
    }
}

/// Failure converting one raw response token into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown type '{type_name}' for mnemonic {mnemonic}")]
    UnknownType { mnemonic: String, type_name: String },

    #[error("invalid {kind} value: '{value}'")]
    Invalid { kind: &'static str, value: String },

    #[error("bulk field: {0}")]
    Bulk(String),
}

impl DecodeError {
    pub(crate) fn invalid(kind: &'static str, value: &str) -> Self {
        DecodeError::Invalid {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_the_file() {
        let err = BbdlError::Timeout {
            filename: "fprp00.out.gz".into(),
            attempts: 120,
        };
        let msg = err.to_string();
        assert!(msg.contains("fprp00.out.gz"));
        assert!(msg.contains("120"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BbdlError = io.into();
        assert!(matches!(err, BbdlError::Io(_)));
    }
}
