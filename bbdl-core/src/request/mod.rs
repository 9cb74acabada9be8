//! Request file encoder.
//!
//! Layout, in order: header block (standard or BVAL), caller headers, either the
//! history block or the reference-data directives, `COMPRESS=yes`, the terminal
//! link block, the field list, the identifier list, and the trailer.

pub mod identifier;

pub use identifier::Identifier;

use crate::error::BbdlError;
use crate::options::{Options, TerminalLink};
use crate::wire::{
    COMPRESS_FLAG, END_OF_DATA, END_OF_FIELDS, END_OF_FILE, HISTORY_PROGRAM, START_OF_DATA,
    START_OF_FIELDS, START_OF_FILE,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const REFERENCE_DIRECTIVES: [&str; 3] = ["SECMASTER=yes", "CLOSINGVALUES=yes", "DERIVED=yes"];

/// Render the request text without touching the filesystem.
pub fn render<S: AsRef<str>>(
    identifiers: &[Identifier],
    fields: &[S],
    options: &Options,
) -> Result<String, BbdlError> {
    options.validate()?;

    let mut out = String::new();
    let username = options.username.as_deref().unwrap_or_default();
    let delimiter = options.delimiter;

    out.push_str(&format!("{START_OF_FILE}\n"));
    out.push_str(&format!("FIRMNAME={username}\n"));
    if options.bval {
        out.push_str("DERIVED=yes\n");
        out.push_str(&format!("DELIMITER={delimiter}\n"));
        out.push_str("PRICING_SOURCE=BVAL:NY4PM\n");
        out.push_str("SECMASTER=yes\n");
        out.push_str("PROGRAMNAME=getdata\n");
    } else {
        out.push_str(&format!("PROGRAMFLAG={}\n", options.programflag));
        out.push_str(&format!("DELIMITER={delimiter}\n"));
        out.push_str("ADJUSTED=yes\n");
        out.push_str(&format!("DATEFORMAT={}\n", options.dateformat));
    }

    let mut headers = options.headers.clone();
    match (options.begdate, options.enddate) {
        (None, None) => headers.extend(REFERENCE_DIRECTIVES.iter().map(|s| s.to_string())),
        (beg, end) => {
            let (beg, end) = (beg.or(end), end.or(beg));
            if let (Some(beg), Some(end)) = (beg, end) {
                headers.push(HISTORY_PROGRAM.to_string());
                headers.push("HIST_FORMAT=horizontal".to_string());
                headers.push(format!(
                    "DATERANGE={}|{}",
                    beg.format("%Y%m%d"),
                    end.format("%Y%m%d")
                ));
            }
        }
    }
    for header in &headers {
        out.push_str(&format!("{header}\n"));
    }
    if options.compressed && !headers.iter().any(|h| h == COMPRESS_FLAG) {
        out.push_str(&format!("{COMPRESS_FLAG}\n"));
    }

    match options.terminal_link() {
        Some(TerminalLink::Bba { usernumber }) => {
            out.push_str(&format!("USERNUMBER={usernumber}\n"));
        }
        Some(TerminalLink::Open { sn, ws, usernumber }) => {
            if let Some(usernumber) = usernumber {
                out.push_str(&format!("USERNUMBER={usernumber}\n"));
            }
            out.push_str(&format!("SN={sn}\n"));
            out.push_str(&format!("WS={ws}\n"));
        }
        None => {}
    }
    out.push('\n');

    out.push_str(&format!("{START_OF_FIELDS}\n"));
    for field in fields {
        out.push_str(&format!("{}\n", field.as_ref()));
    }
    out.push_str(&format!("{END_OF_FIELDS}\n"));
    out.push('\n');

    out.push_str(&format!("{START_OF_DATA}\n"));
    for identifier in identifiers {
        out.push_str(&format!("{}\n", identifier.encode()));
    }
    out.push_str(&format!("{END_OF_DATA}\n"));
    out.push('\n');

    out.push_str(&format!("{END_OF_FILE}\n"));
    Ok(out)
}

/// Write a request file to `destination` and return its path.
pub fn build<S: AsRef<str>>(
    identifiers: &[Identifier],
    fields: &[S],
    destination: &Path,
    options: &Options,
) -> Result<PathBuf, BbdlError> {
    let text = render(identifiers, fields, options)?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, &text)?;
    debug!(path = %destination.display(), "wrote request file:\n{text}");
    Ok(destination.to_path_buf())
}
