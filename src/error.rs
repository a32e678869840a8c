//! Startup error taxonomy
//!
//! Only startup can fail. Per-request failures are mapped to HTTP status
//! codes inside the handler and never reach this type.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Fatal error raised before or while bringing the server up
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("invalid value for header {name}: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("cannot access root directory '{}': {source}", .path.display())]
    RootDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file: {0}")]
    Logger(#[source] std::io::Error),

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
