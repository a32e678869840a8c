//! Logger module
//!
//! Provides logging utilities for the development server:
//! - Startup banner and shutdown confirmation (stdout)
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => eprintln!("{message}"),
    }
}

/// Print the startup banner to stdout
pub fn log_server_start(addr: &SocketAddr, root: &Path, api_key_hint: &str) {
    println!("🚀 Development server running at:");
    println!("   http://localhost:{}", addr.port());
    println!("   (bound to {addr})");
    println!("\n📁 Serving files from: {}", root.display());
    println!("🔑 {api_key_hint}");
    println!("\nPress Ctrl+C to stop the server");
}

pub fn log_shutdown_started() {
    println!("\n\nShutting down, waiting for open connections to finish...");
}

pub fn log_server_stopped() {
    println!("✅ Development server stopped");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
