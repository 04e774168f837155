// API response utility functions module

use crate::event::Envelope;
use crate::logger;
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::MessageBody;

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Fixed headers carried by every envelope
fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
    headers
}

/// Build an envelope; the body is serialized only when present
pub fn build_response<T: Serialize>(status: u16, body: Option<&T>) -> Envelope {
    let body = match body.map(serde_json::to_string).transpose() {
        Ok(json) => json,
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            return internal_error();
        }
    };

    Envelope {
        status_code: status,
        headers: default_headers(),
        body,
    }
}

/// Envelope without a body
pub fn empty_response(status: u16) -> Envelope {
    build_response::<()>(status, None)
}

/// Envelope whose body is `{"Message": ...}`
pub fn message_response(status: u16, message: &str) -> Envelope {
    build_response(status, Some(&MessageBody { message }))
}

/// 404 for unknown routes: body is the JSON string "Not found"
pub fn not_found() -> Envelope {
    build_response(NOT_FOUND, Some(&"Not found"))
}

/// 400 Bad Request response
pub fn bad_request(message: &str) -> Envelope {
    message_response(BAD_REQUEST, message)
}

/// 500 response for storage faults
pub fn internal_error() -> Envelope {
    Envelope {
        status_code: INTERNAL_SERVER_ERROR,
        headers: default_headers(),
        body: Some(r#"{"Message":"Internal server error"}"#.to_string()),
    }
}
