//! HTTP conversion for gateway events
//!
//! Turns a hyper request into an `InboundEvent` and an `Envelope` back into a
//! hyper response.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::collections::HashMap;
use thiserror::Error;

use super::{Envelope, InboundEvent};
use crate::logger;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request body too large (max: {max} bytes)")]
    TooLarge { max: u64 },

    #[error("Failed to read request body: {0}")]
    Read(String),

    #[error("Request body is not valid UTF-8")]
    InvalidUtf8,

    #[error("Timed out reading request")]
    Timeout,
}

impl RequestError {
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::TooLarge { .. } => 413,
            Self::Timeout => 408,
            Self::Read(_) | Self::InvalidUtf8 => 400,
        }
    }
}

/// Build an inbound event from a live request, reading the whole body
///
/// Reading stops as soon as the body passes `max_body_size`, whether or not
/// the request declared a Content-Length.
pub async fn event_from_request<B>(
    req: Request<B>,
    max_body_size: u64,
) -> Result<InboundEvent, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(size) = declared_length(&req) {
        if size > max_body_size {
            return Err(RequestError::TooLarge { max: max_body_size });
        }
    }

    let (parts, body) = req.into_parts();
    let query_string_parameters = parts.uri.query().and_then(parse_query);

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                RequestError::TooLarge { max: max_body_size }
            } else {
                RequestError::Read(e.to_string())
            }
        })?
        .to_bytes();

    let body = if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8(bytes.to_vec()).map_err(|_| RequestError::InvalidUtf8)?)
    };

    Ok(InboundEvent {
        http_method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query_string_parameters,
        body,
    })
}

/// Content-Length header, when present and well formed
fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    let value = req.headers().get("content-length")?;
    match value.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) => Some(size),
        None => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            None
        }
    }
}

/// Decode a query string; an empty query yields no parameter map
fn parse_query(query: &str) -> Option<HashMap<String, String>> {
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

/// Write an envelope out as a hyper response
pub fn envelope_into_response(envelope: Envelope) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(envelope.status_code);
    for (name, value) in &envelope.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let body = envelope.body.map_or_else(Bytes::new, Bytes::from);
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build response: {e}"));
        let mut response = Response::new(Full::new(Bytes::from("Internal server error")));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
