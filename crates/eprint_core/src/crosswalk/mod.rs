//! Outward translations of an assembled record.
//!
//! # Responsibility
//! - Own the single visibility rule shared by every public surface.
//! - Translate a `Record` into the simplified record, the native JSON
//!   document and the native XML document; read the native forms back.
//!
//! # Invariants
//! - Translators are pure: no I/O, no clock, no global state.
//! - The same record always serializes to the same bytes.

pub mod access;
pub mod native_json;
pub mod native_xml;
pub mod simplified;

pub use access::is_public;
pub use native_json::{from_native_json, to_native_json};
pub use native_xml::{from_native_xml, to_native_xml, EPRINTS_NAMESPACE};
pub use simplified::{to_simplified, SimpleRecord};

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    Xml(quick_xml::Error),
    /// Document parsed but does not describe records.
    Malformed(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid JSON document: {err}"),
            Self::Xml(err) => write!(f, "invalid XML document: {err}"),
            Self::Malformed(message) => write!(f, "malformed document: {message}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Xml(err) => Some(err),
            Self::Malformed(_) => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value)
    }
}
