//! bbdl core: batch request/response client for Bloomberg Data License.
//!
//! This crate contains the whole round trip:
//! - Options with strict program-mode and terminal-linking validation
//! - Request file encoder
//! - Transport poller over a pluggable file-transfer session
//! - Response decoder (reference and historical replies)
//! - Value codec, including the inline bulk-table format
//! - Result merge across field chunks

pub mod catalog;
pub mod codec;
pub mod error;
pub mod options;
pub mod request;
pub mod response;
pub mod result;
pub mod session;
pub mod ticker;
pub mod transport;
pub mod wire;

pub use catalog::{CsvFieldCatalog, FieldCatalog, FieldInfo};
pub use codec::{Codec, FieldType, Value};
pub use error::{BbdlError, DecodeError};
pub use options::{Options, ProgramFlag, RequestSpec};
pub use request::Identifier;
pub use result::{Column, ErrorRow, RequestResult, Row};
pub use session::Session;
pub use transport::{CancelToken, FileTransfer, PollConfig};
