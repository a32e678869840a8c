//! Request handler module
//!
//! Responsible for preflight handling, static file serving and CORS
//! header injection.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::{handle_request, respond};
