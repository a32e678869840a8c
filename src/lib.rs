//! Local development HTTP server.
//!
//! Serves static files from a root directory and adds permissive CORS
//! headers to every response, so a browser front end under development
//! can call external APIs without cross-origin errors. `OPTIONS`
//! preflight requests are answered directly with `200 OK`.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use error::{Result, ServerError};
