//! CORS header injection
//!
//! Every response leaving the server, including preflight answers and
//! error pages, passes through [`CorsHeaders::apply`].

use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::Response;

use crate::config::CorsConfig;
use crate::error::ServerError;

/// Prevalidated CORS header values
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    entries: [(HeaderName, HeaderValue); 3],
}

impl CorsHeaders {
    pub fn from_config(cors: &CorsConfig) -> Result<Self, ServerError> {
        Ok(Self {
            entries: [
                (
                    ACCESS_CONTROL_ALLOW_ORIGIN,
                    parse_value("Access-Control-Allow-Origin", &cors.allow_origin)?,
                ),
                (
                    ACCESS_CONTROL_ALLOW_METHODS,
                    parse_value("Access-Control-Allow-Methods", &cors.allow_methods)?,
                ),
                (
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    parse_value("Access-Control-Allow-Headers", &cors.allow_headers)?,
                ),
            ],
        })
    }

    /// Add the CORS headers, replacing any value already present
    pub fn apply_to_headers(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.entries {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn apply<B>(&self, response: &mut Response<B>) {
        self.apply_to_headers(response.headers_mut());
    }
}

fn parse_value(name: &'static str, value: &str) -> Result<HeaderValue, ServerError> {
    HeaderValue::from_str(value).map_err(|_| ServerError::InvalidHeader {
        name,
        value: value.to_string(),
    })
}
