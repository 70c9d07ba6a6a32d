//! Public request errors and their status codes.

use crate::assemble::AssembleError;
use crate::crosswalk::CodecError;
use crate::db::DbError;
use crate::query::QueryError;
use crate::write::WriteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ApiResult<T> = Result<T, ApiError>;

/// Error surfaced to a caller.
///
/// `Integration` carries internal detail for the log only; callers see
/// `Internal Server Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Request(String),
    NotFound,
    Method,
    UnsupportedMedia(String),
    Integration(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Request(_) => 400,
            Self::NotFound => 404,
            Self::Method => 405,
            Self::UnsupportedMedia(_) => 415,
            Self::Integration(_) => 500,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Request(detail) => format!("Bad Request, {detail}"),
            Self::NotFound => "Not Found".to_string(),
            Self::Method => "Method Not Allowed".to_string(),
            Self::UnsupportedMedia(media) if media.is_empty() => {
                "Unsupported Media Type".to_string()
            }
            Self::UnsupportedMedia(media) => format!("Unsupported Media Type, {media:?}"),
            Self::Integration(_) => "Internal Server Error".to_string(),
        }
    }

    /// Text body `ERROR: <code> <message>`.
    pub fn body(&self) -> String {
        format!("ERROR: {} {}", self.status(), self.public_message())
    }

    /// Log-only detail for `Integration`.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Integration(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integration(detail) => write!(f, "integration error: {detail}"),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl Error for ApiError {}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        Self::Integration(value.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::Sqlite(err) => Self::Integration(err.to_string()),
            other => Self::Request(other.to_string()),
        }
    }
}

impl From<AssembleError> for ApiError {
    fn from(value: AssembleError) -> Self {
        match value {
            AssembleError::NotFound(_) => Self::NotFound,
            other => Self::Integration(other.to_string()),
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(value: CodecError) -> Self {
        Self::Request(value.to_string())
    }
}

impl From<WriteError> for ApiError {
    fn from(value: WriteError) -> Self {
        Self::Integration(value.to_string())
    }
}
