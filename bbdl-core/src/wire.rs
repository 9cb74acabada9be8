//! Section markers, fixed directives, and the remote return-code table.

pub const START_OF_FILE: &str = "START-OF-FILE";
pub const END_OF_FILE: &str = "END-OF-FILE";
pub const START_OF_FIELDS: &str = "START-OF-FIELDS";
pub const END_OF_FIELDS: &str = "END-OF-FIELDS";
pub const START_OF_DATA: &str = "START-OF-DATA";
pub const END_OF_DATA: &str = "END-OF-DATA";

pub const HISTORY_PROGRAM: &str = "PROGRAMNAME=gethistory";
pub const COMPRESS_FLAG: &str = "COMPRESS=yes";

/// Return code of a successfully resolved security.
pub const RC_OK: &str = "0";

pub const IDENTIFIER: &str = "IDENTIFIER";
pub const RETCODE: &str = "RETCODE";
pub const NFIELDS: &str = "NFIELDS";
pub const DATE: &str = "DATE";

/// Leading columns of every data line; historical replies add `DATE`.
pub const STATUS_FIELDS: [&str; 3] = [IDENTIFIER, RETCODE, NFIELDS];

const ERROR_MESSAGES: &[(&str, &str)] = &[
    ("-14", "Field is not recognized or supported by the gethistory program."),
    ("-13", "Field, security, and date range combination is not applicable."),
    ("-12", "Field is not available."),
    ("-10", "Start date > End date."),
    ("9", "Asset class not supported for BVAL Tier1 pricing."),
    ("10", "Bloomberg cannot find the security as specified."),
    ("11", "Restricted Security."),
    ("123", "User not authorized for private loan (PRPL)."),
    ("605", "Invalid macro value."),
    ("988", "System Error on security level."),
    ("989", "Unrecognized pricing source."),
    ("990", "System Error. Contact Product Support and Technical Assistance."),
    (
        "991",
        "Invalid override value (e.g., bad date or number) or Maximum number of overrides (20) exceeded.",
    ),
    ("992", "Unknown override field."),
    ("993", "Maximum number of overrides exceeded"),
    ("994", "Permission denied."),
    ("995", "Maximum number of fields exceeded."),
    (
        "996",
        "Maximum number of data points exceeded (some data for this security is missing).",
    ),
    ("997", "General override error (e.g., formatting error)."),
    ("998", "Security identifier type (e.g., CUSIP) is not recognized."),
    ("999", "Unloadable security"),
];

/// Human-readable message for a remote return code, if one is known.
pub fn error_message(code: &str) -> Option<&'static str> {
    ERROR_MESSAGES
        .iter()
        .find(|(c, _)| *c == code.trim())
        .map(|(_, msg)| *msg)
}
