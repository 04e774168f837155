//! Logger module
//!
//! Provides logging utilities for the inventory service including:
//! - Server lifecycle logging
//! - Inbound event and API result logging
//! - Access logging with multiple formats
//! - Error and warning logging, filtered by level
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use crate::event::InboundEvent;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup. With `keep_stdout_clean`,
/// info lines without a log file go to stderr so stdout carries only output.
pub fn init(config: &Config, keep_stdout_clean: bool) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        keep_stdout_clean,
    )
}

fn enabled(level: Level) -> bool {
    if writer::is_initialized() {
        writer::get().enabled(level)
    } else {
        level <= Level::Info
    }
}

/// Write to info/access log
fn write_info(message: &str) {
    if !enabled(Level::Info) {
        return;
    }
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    if !enabled(level) {
        return;
    }
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    if writer::is_initialized() {
        writer::get().write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Product inventory service started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    write_info(&format!(
        "Storage: {} ({}, table {})",
        config.storage.backend, config.storage.path, config.storage.table
    ));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    if enabled(Level::Debug) {
        write_info(&format!("[Connection] Accepted from: {peer_addr}"));
    }
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_api_error(message: &str) {
    write_error(Level::Error, &format!("[API ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

/// Log the raw inbound event before dispatch
pub fn log_event(event: &InboundEvent) {
    if !enabled(Level::Info) {
        return;
    }
    match serde_json::to_string(event) {
        Ok(json) => write_info(&format!("[EVENT] {json}")),
        Err(e) => log_warning(&format!("Failed to serialize event: {e}")),
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    write_info(&format!("[API] {method} {path} - {status}"));
}

pub fn log_shutdown() {
    write_info("\n[Shutdown] Stopped accepting connections");
}
