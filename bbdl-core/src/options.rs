//! Session and request options.
//!
//! WARNING on `programflag`: with `oneshot` the vendor locks the pulled data
//! categories for four months, so a single large `oneshot` pull is billed at
//! least that much for each of the next four months. `oneshot` is cheaper than
//! `adhoc` only when the selected fields are exactly the ones wanted. Mode and
//! terminal-linking fields are therefore validated strictly and never coerced.

use crate::codec::scalar::parse_date;
use crate::error::BbdlError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Remote program billing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProgramFlag {
    #[default]
    Adhoc,
    Oneshot,
}

impl ProgramFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramFlag::Adhoc => "adhoc",
            ProgramFlag::Oneshot => "oneshot",
        }
    }
}

impl FromStr for ProgramFlag {
    type Err = BbdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adhoc" => Ok(ProgramFlag::Adhoc),
            "oneshot" => Ok(ProgramFlag::Oneshot),
            other => Err(BbdlError::validation(format!(
                "programflag must be one of 'adhoc', 'oneshot'; got '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ProgramFlag {
    type Error = BbdlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProgramFlag> for String {
    fn from(flag: ProgramFlag) -> Self {
        flag.as_str().to_string()
    }
}

impl fmt::Display for ProgramFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active terminal-linking mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalLink<'a> {
    /// Bloomberg Anywhere: user number only.
    Bba { usernumber: &'a str },
    /// Serial number + workstation, optionally with a user number.
    Open {
        sn: &'a str,
        ws: &'a str,
        usernumber: Option<&'a str>,
    },
}

/// Per-request specialization applied on top of session options.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub bval: bool,
    pub headers: Vec<String>,
    pub begdate: Option<NaiveDate>,
    pub enddate: Option<NaiveDate>,
}

/// Options for one session, specialized per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub bval: bool,
    pub headers: Vec<String>,
    #[serde(deserialize_with = "deserialize_date")]
    pub begdate: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_date")]
    pub enddate: Option<NaiveDate>,
    pub compressed: bool,
    pub dateformat: String,
    pub programflag: ProgramFlag,
    pub delimiter: char,
    /// Minutes to wait for the reply file.
    pub wait_time: u32,
    /// Seconds between polls of the remote listing.
    pub poll_interval: u64,
    pub sn: Option<String>,
    pub ws: Option<String>,
    pub usernumber: Option<String>,
    pub is_bba: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub hostname: String,
    pub port: u16,
    pub secure: bool,
    pub remotedir: String,
    /// Local directory for request and response files.
    pub tempdir: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bval: false,
            headers: Vec::new(),
            begdate: None,
            enddate: None,
            compressed: false,
            dateformat: "yyyymmdd".into(),
            programflag: ProgramFlag::Adhoc,
            delimiter: '|',
            wait_time: 20,
            poll_interval: 10,
            sn: None,
            ws: None,
            usernumber: None,
            is_bba: false,
            username: None,
            password: None,
            hostname: "sftp.bloomberg.com".into(),
            port: 22,
            secure: true,
            remotedir: "/".into(),
            tempdir: std::env::temp_dir().join("bbdl"),
        }
    }
}

fn deserialize_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn blank_to_none(field: &mut Option<String>) {
    if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *field = None;
    }
}

impl Options {
    /// Load options from a flat TOML table.
    pub fn from_toml(content: &str) -> Result<Self, BbdlError> {
        let options: Options = toml::from_str(content)
            .map_err(|e| BbdlError::validation(format!("parse options TOML: {e}")))?;
        options.validated()
    }

    /// Load options from the table at a dotted path, e.g. `bbg.data.ftp`.
    pub fn from_toml_site(content: &str, site: &str) -> Result<Self, BbdlError> {
        let root: toml::Table = toml::from_str(content)
            .map_err(|e| BbdlError::validation(format!("parse options TOML: {e}")))?;
        let mut node = toml::Value::Table(root);
        for level in site.split('.') {
            node = match node {
                toml::Value::Table(mut table) => table.remove(level).ok_or_else(|| {
                    BbdlError::validation(format!("site '{site}' has no table '{level}'"))
                })?,
                _ => {
                    return Err(BbdlError::validation(format!(
                        "site '{site}': '{level}' is not a table"
                    )))
                }
            };
        }
        let options: Options = node
            .try_into()
            .map_err(|e| BbdlError::validation(format!("site '{site}': {e}")))?;
        options.validated()
    }

    /// Normalize and validate. Every constructor goes through here.
    ///
    /// BBA linking clears `sn`/`ws`; open linking requires both.
    pub fn validated(mut self) -> Result<Self, BbdlError> {
        blank_to_none(&mut self.sn);
        blank_to_none(&mut self.ws);
        blank_to_none(&mut self.usernumber);

        if self.wait_time == 0 {
            return Err(BbdlError::validation("wait_time must be at least one minute"));
        }
        if self.poll_interval == 0 {
            return Err(BbdlError::validation("poll_interval must be at least one second"));
        }
        if self.delimiter.is_alphanumeric() || self.delimiter.is_whitespace() {
            return Err(BbdlError::validation(format!(
                "delimiter must be a punctuation character, got {:?}",
                self.delimiter
            )));
        }

        if self.is_bba {
            if self.usernumber.is_none() {
                return Err(BbdlError::validation(
                    "USERNUMBER must be provided for BBA terminal linking",
                ));
            }
            self.sn = None;
            self.ws = None;
        } else if self.is_terminal() {
            if self.sn.is_none() {
                return Err(BbdlError::validation(
                    "SN must be provided for open terminal linking",
                ));
            }
            if self.ws.is_none() {
                return Err(BbdlError::validation(
                    "WS must be provided for open terminal linking",
                ));
            }
        }
        Ok(self)
    }

    /// Re-run validation without consuming (used before encoding).
    pub fn validate(&self) -> Result<(), BbdlError> {
        self.clone().validated().map(|_| ())
    }

    /// True if any terminal-linking field is set.
    pub fn is_terminal(&self) -> bool {
        self.sn.is_some() || self.ws.is_some() || self.usernumber.is_some()
    }

    pub fn terminal_link(&self) -> Option<TerminalLink<'_>> {
        if self.is_bba {
            return self
                .usernumber
                .as_deref()
                .map(|usernumber| TerminalLink::Bba { usernumber });
        }
        match (self.sn.as_deref(), self.ws.as_deref()) {
            (Some(sn), Some(ws)) => Some(TerminalLink::Open {
                sn,
                ws,
                usernumber: self.usernumber.as_deref(),
            }),
            _ => None,
        }
    }

    /// Historical requests carry a date range.
    pub fn is_history(&self) -> bool {
        self.begdate.is_some() || self.enddate.is_some()
    }

    /// Copy of these options for a single request.
    pub fn specialize(&self, spec: RequestSpec) -> Result<Self, BbdlError> {
        let mut options = self.clone();
        options.bval = spec.bval;
        options.headers = spec.headers;
        options.begdate = spec.begdate;
        options.enddate = spec.enddate;
        options.validated()
    }
}
