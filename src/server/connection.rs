// Connection handling module
// Serves one TCP connection, turning each request into a dispatched event

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api;
use crate::config::AppState;
use crate::event::http::{envelope_into_response, event_from_request, RequestError};
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve a connection in a spawned task.
///
/// `read_timeout` bounds reading each request's headers and body. A keep-alive
/// connection lives at most `keep_alive_timeout` seconds in total; without
/// keep-alive the single exchange is bounded by `read_timeout + write_timeout`.
fn handle_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let keep_alive = performance.keep_alive_timeout > 0;
        let timeout_duration = Duration::from_secs(if keep_alive {
            performance.keep_alive_timeout
        } else {
            performance.read_timeout + performance.write_timeout
        });

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(keep_alive)
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(performance.read_timeout));

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Convert a request into an event, dispatch it, and write the envelope back
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let read_timeout = Duration::from_secs(state.config.performance.read_timeout);
    let read = tokio::time::timeout(
        read_timeout,
        event_from_request(req, state.config.http.max_body_size),
    )
    .await
    .unwrap_or(Err(RequestError::Timeout));

    let envelope = match read {
        Ok(event) => {
            // Storage calls block, keep them off the reactor threads.
            let dispatch_state = Arc::clone(&state);
            match tokio::task::spawn_blocking(move || dispatch_state.dispatcher.dispatch(&event))
                .await
            {
                Ok(envelope) => envelope,
                Err(e) => {
                    logger::log_error(&format!("Dispatch task failed: {e}"));
                    api::internal_error()
                }
            }
        }
        Err(e) => {
            logger::log_warning(&e.to_string());
            api::message_response(e.status_code(), &e.to_string())
        }
    };

    entry.status = envelope.status_code;
    entry.body_bytes = envelope.body.as_ref().map_or(0, String::len);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    if state.config.logging.access_log {
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(envelope_into_response(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Dispatcher;
    use crate::config::Config;
    use crate::server::bind_listener;
    use crate::store::MemoryStore;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Serve connections on an ephemeral port backed by an empty memory store
    async fn start_server(max_body_size: u64, read_timeout: u64) -> SocketAddr {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        config.http.max_body_size = max_body_size;
        config.performance.read_timeout = read_timeout;
        config.logging.access_log = false;

        let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()), 100);
        let state = Arc::new(AppState::new(config, dispatcher));
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, peer_addr)) = listener.accept().await {
                accept_connection(stream, peer_addr, &state);
            }
        });
        addr
    }

    /// Status, lowercased head and body once a full response has arrived
    fn parse_response(buf: &[u8]) -> Option<(u16, String, String)> {
        let text = std::str::from_utf8(buf).ok()?;
        let (head, body) = text.split_once("\r\n\r\n")?;
        let status = head.split(' ').nth(1)?.parse().ok()?;
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        (body.len() >= length).then(|| {
            (
                status,
                head.to_ascii_lowercase(),
                body[..length].to_string(),
            )
        })
    }

    /// Write raw bytes on a fresh connection and read back one response
    async fn exchange(addr: SocketAddr, raw: &[u8]) -> (u16, String, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            if let Some(response) = parse_response(&buf) {
                return response;
            }
            match tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => buf.extend_from_slice(&chunk[..n]),
                other => panic!(
                    "incomplete response ({other:?}): {}",
                    String::from_utf8_lossy(&buf)
                ),
            }
        }
    }

    fn post(path: &str, body: &str) -> Vec<u8> {
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    fn get(path: &str) -> Vec<u8> {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .into_bytes()
    }

    #[tokio::test]
    async fn test_request_round_trip_through_dispatch() {
        let addr = start_server(1024, 30).await;

        let (status, head, body) = exchange(addr, &get("/health")).await;
        assert_eq!(status, 200);
        assert!(body.is_empty());
        assert!(head.contains("content-type: application/json"));
        assert!(head.contains("access-control-allow-origin: *"));

        let record = r#"{"productId":"p 1","name":"Widget","price":5}"#;
        let (status, _, body) = exchange(addr, &post("/product", record)).await;
        assert_eq!(status, 200);
        let saved: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(saved["Operation"], "SAVE");

        let (status, _, body) = exchange(addr, &get("/product?productId=p%201")).await;
        assert_eq!(status, 200);
        assert_eq!(body, record);

        let (status, _, body) = exchange(addr, &get("/missing")).await;
        assert_eq!(status, 404);
        assert_eq!(body, "\"Not found\"");
    }

    #[tokio::test]
    async fn test_empty_body_is_missing_body() {
        let addr = start_server(1024, 30).await;
        let (status, _, body) = exchange(addr, &post("/product", "")).await;
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"Message":"Missing request body"}"#);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_rejected() {
        let addr = start_server(16, 30).await;
        // Rejected on the header alone, before any body bytes are sent.
        let raw = b"POST /product HTTP/1.1\r\nHost: localhost\r\n\
                    Content-Length: 4096\r\n\r\n";
        let (status, _, body) = exchange(addr, raw).await;
        assert_eq!(status, 413);
        assert!(body.contains("max: 16 bytes"));
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_rejected_while_reading() {
        let addr = start_server(16, 30).await;

        // One oversized chunk and no terminating chunk: the reply must not wait for the rest.
        let mut raw = b"POST /product HTTP/1.1\r\nHost: localhost\r\n\
                        Transfer-Encoding: chunked\r\n\r\n1000\r\n"
            .to_vec();
        raw.extend(std::iter::repeat(b'x').take(4096));
        raw.extend_from_slice(b"\r\n");

        let (status, _, body) = exchange(addr, &raw).await;
        assert_eq!(status, 413);
        assert!(body.contains("Request body too large"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_body_rejected() {
        let addr = start_server(1024, 30).await;
        let mut raw = b"POST /product HTTP/1.1\r\nHost: localhost\r\n\
                        Connection: close\r\nContent-Length: 3\r\n\r\n"
            .to_vec();
        raw.extend_from_slice(&[0xff, 0xfe, 0xfd]);

        let (status, _, body) = exchange(addr, &raw).await;
        assert_eq!(status, 400);
        assert!(body.contains("UTF-8"));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let addr = start_server(1024, 1).await;
        let raw = b"POST /product HTTP/1.1\r\nHost: localhost\r\n\
                    Content-Length: 40\r\n\r\n{\"productId\"";

        let (status, _, _) = exchange(addr, raw).await;
        assert_eq!(status, 408);
    }
}
