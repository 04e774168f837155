//! Event gateway module
//!
//! Wire types exchanged with the hosting collaborator:
//! - `InboundEvent`: method, path, query parameters and raw body of one request
//! - `Envelope`: status code, headers and optional serialized body of the reply
//!
//! The `http` submodule converts live hyper requests and responses to and from these.

pub mod http;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One inbound request, shaped like an API gateway proxy event
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// JSON text, when the request carried a body
    #[serde(default)]
    pub body: Option<String>,
}

#[cfg(test)]
impl InboundEvent {
    pub fn new(http_method: &str, path: &str) -> Self {
        Self {
            http_method: http_method.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl InboundEvent {
    /// Look up a single query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }
}

/// Uniform response wrapper returned for every event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gateway_event() {
        let raw = r#"{
            "httpMethod": "GET",
            "path": "/product",
            "queryStringParameters": {"productId": "p1"},
            "body": null,
            "requestContext": {"stage": "prod"}
        }"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.http_method, "GET");
        assert_eq!(event.path, "/product");
        assert_eq!(event.query_param("productId"), Some("p1"));
        assert!(event.body.is_none());
    }

    #[test]
    fn test_parse_event_without_optional_fields() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"httpMethod": "GET", "path": "/products"}"#).unwrap();
        assert!(event.query_string_parameters.is_none());
        assert_eq!(event.query_param("productId"), None);
    }

    #[test]
    fn test_envelope_omits_absent_body() {
        let envelope = Envelope {
            status_code: 200,
            headers: BTreeMap::new(),
            body: None,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, serde_json::json!({"statusCode": 200, "headers": {}}));
    }
}
