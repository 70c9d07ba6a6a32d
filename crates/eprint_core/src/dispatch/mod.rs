//! Framework-free request dispatch.
//!
//! # Responsibility
//! - Map a request path onto the configuration documents or a routed
//!   endpoint of one repository.
//! - Turn every outcome into a reply and one `http_request` log line.
//!
//! # Invariants
//! - Only GET and POST are served.
//! - Integration detail is logged, never returned.
//!
//! # See also
//! - `router::ENDPOINTS` for the endpoint catalogue.

pub mod context;
pub mod error;

pub use context::{Repository, ServiceContext};
pub use error::{ApiError, ApiResult};

use crate::logging::sanitize_message;
use crate::router::{docs, Call};
use log::{error, info};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

pub const CONTENT_TEXT: &str = "text/plain";
pub const CONTENT_JSON: &str = "application/json";
pub const CONTENT_XML: &str = "application/xml";

const HELP_SEGMENT: &str = "help";
const LOG_ERROR_MAX_CHARS: usize = 240;

/// Transport-independent request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Raw path, still percent-encoded.
    pub path: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub remote_addr: String,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    /// Media type without parameters, lowercased.
    pub fn media_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn document(text: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TEXT,
            body: text.into_bytes(),
        }
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> ApiResult<Self> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|err| ApiError::Integration(format!("encode json reply: {err}")))?;
        Ok(Self {
            status: 200,
            content_type: CONTENT_JSON,
            body,
        })
    }

    /// Pre-encoded JSON text.
    pub fn json_text(text: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_JSON,
            body: text.into_bytes(),
        }
    }

    pub fn xml(text: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_XML,
            body: text.into_bytes(),
        }
    }

    pub fn empty() -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TEXT,
            body: Vec::new(),
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            content_type: CONTENT_TEXT,
            body: err.body().into_bytes(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serves one request against the service context.
pub fn dispatch(ctx: &ServiceContext, request: &Request) -> Reply {
    let started_at = Instant::now();
    let request_id = Uuid::new_v4();
    let outcome = route(ctx, request);
    let reply = match &outcome {
        Ok(reply) => reply.clone(),
        Err(err) => Reply::error(err),
    };

    let path = sanitize_message(&request.path, LOG_ERROR_MAX_CHARS);
    match &outcome {
        Ok(_) => info!(
            "event=http_request module=dispatch status={} method={} path={path} remote_addr={} request_id={request_id} error=OK duration_ms={}",
            reply.status,
            request.method,
            request.remote_addr,
            started_at.elapsed().as_millis()
        ),
        Err(err) => {
            let detail = err.detail().map_or_else(|| err.public_message(), str::to_string);
            let detail = sanitize_message(&detail, LOG_ERROR_MAX_CHARS);
            let line = format!(
                "event=http_request module=dispatch status={} method={} path={path} remote_addr={} request_id={request_id} error={detail} duration_ms={}",
                reply.status,
                request.method,
                request.remote_addr,
                started_at.elapsed().as_millis()
            );
            if err.detail().is_some() {
                error!("{line}");
            } else {
                info!("{line}");
            }
        }
    }
    reply
}

fn route(ctx: &ServiceContext, request: &Request) -> ApiResult<Reply> {
    if request.method != "GET" && request.method != "POST" {
        return Err(ApiError::Method);
    }
    let mut segments = path_segments(&request.path)?;
    let wants_help = segments.last().is_some_and(|last| last == HELP_SEGMENT);

    match segments.first().map(String::as_str) {
        None => return Ok(Reply::document(docs::README.to_string())),
        Some("favicon.ico") => return Ok(Reply::empty()),
        Some("repositories") => {
            if wants_help {
                return Ok(Reply::document(docs::REPOSITORIES.to_string()));
            }
            return Reply::json(&ctx.repository_ids());
        }
        Some("repository") => {
            if wants_help || segments.len() < 2 {
                return Ok(Reply::document(docs::REPOSITORY.to_string()));
            }
            let repository = ctx.repository(&segments[1]).ok_or(ApiError::NotFound)?;
            return Reply::json(&repository.schema);
        }
        Some(_) => {}
    }

    if wants_help {
        segments.pop();
    }
    match segments.len() {
        0 => return Ok(Reply::document(docs::README.to_string())),
        1 => return Ok(Reply::document(docs::render(docs::README, &segments[0]))),
        _ => {}
    }
    let repository_id = segments[0].clone();
    let endpoint = segments[1].clone();
    let args = segments.split_off(2);

    let spec = ctx
        .routes()
        .get(&repository_id)
        .and_then(|table| table.get(&endpoint))
        .ok_or(ApiError::NotFound)?;
    if wants_help || spec.serves_document(&request.method, &args) {
        return Ok(Reply::document(docs::render(spec.doc, &repository_id)));
    }
    let repository = ctx.repository(&repository_id).ok_or(ApiError::NotFound)?;

    spec.handler.handle(&Call {
        repository,
        request,
        args: &args,
    })
}

/// Non-empty, percent-decoded path segments.
fn path_segments(path: &str) -> ApiResult<Vec<String>> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| ApiError::Request("path is not valid UTF-8".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{path_segments, Reply, Request};
    use crate::dispatch::ApiError;

    #[test]
    fn segments_are_decoded_and_empty_parts_dropped() {
        let segments = path_segments("//authors/doi/10.1000%2Fxyz//?q=1").expect("segments");
        assert_eq!(segments, vec!["authors", "doi", "10.1000/xyz"]);
        let names = path_segments("/authors/creator-name/Doe/Jane%20Q").expect("segments");
        assert_eq!(names[3], "Jane Q");
    }

    #[test]
    fn media_type_ignores_parameters_and_case() {
        let request = Request {
            content_type: "Application/JSON; charset=utf-8".to_string(),
            ..Request::default()
        };
        assert_eq!(request.media_type(), "application/json");
        assert_eq!(Request::get("/").media_type(), "");
    }

    #[test]
    fn error_reply_is_plain_text() {
        let reply = Reply::error(&ApiError::NotFound);
        assert_eq!(reply.status, 404);
        assert_eq!(reply.content_type, "text/plain");
        assert_eq!(reply.body_text(), "ERROR: 404 Not Found");
    }
}
