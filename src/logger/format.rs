//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with variables

use chrono::{DateTime, Local};
use serde::Serialize;

/// Access log entry for one dispatched request
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    /// Client address
    pub remote_addr: String,
    /// Time the request was received
    #[serde(serialize_with = "serialize_rfc3339")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Envelope status code
    pub status: u16,
    /// Envelope body size in bytes
    pub body_bytes: usize,
    pub user_agent: Option<String>,
    /// Dispatch time in microseconds
    pub request_time_us: u64,
}

fn serialize_rfc3339<S: serde::Serializer>(
    time: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            status: 200,
            body_bytes: 0,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent "-" "$http_user_agent"`
    fn format_combined(&self) -> String {
        format!(
            "{} \"-\" \"{}\"",
            self.format_common(),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.method,
            self.request_uri(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Request URI with query string
    /// - `$status` - Envelope status code
    /// - `$body_bytes_sent` - Envelope body size
    /// - `$http_user_agent` - User-Agent header
    /// - `$request_time` - Dispatch time in seconds (3 decimal places)
    fn format_custom(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        pattern
            .replace("$remote_addr", &self.remote_addr)
            .replace("$time_local", &self.time_local())
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_time", &format!("{request_time:.3}"))
            .replace("$request_method", &self.method)
            .replace("$request_uri", &self.request_uri())
            .replace("$status", &self.status.to_string())
            .replace("$body_bytes_sent", &self.body_bytes.to_string())
            .replace(
                "$http_user_agent",
                self.user_agent.as_deref().unwrap_or("-"),
            )
    }
}
