//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! request handler: CORS headers, MIME detection, conditional requests
//! and response builders.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cors::CorsHeaders;
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_options_response, build_redirect_response, HttpResponse,
};
