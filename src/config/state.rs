// Application state module
// Immutable per-process state shared by every connection

use std::path::PathBuf;

use hyper::header::HeaderValue;

use super::types::Config;
use crate::error::ServerError;
use crate::http::CorsHeaders;

/// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical directory requests are resolved against
    pub root: PathBuf,
    pub cors: CorsHeaders,
    pub server_name: HeaderValue,
}

impl AppState {
    pub fn new(config: Config, root: PathBuf) -> Result<Self, ServerError> {
        let cors = CorsHeaders::from_config(&config.cors)?;
        let server_name =
            HeaderValue::from_str(&config.http.server_name).map_err(|_| {
                ServerError::InvalidHeader {
                    name: "Server",
                    value: config.http.server_name.clone(),
                }
            })?;

        Ok(Self {
            config,
            root,
            cors,
            server_name,
        })
    }
}
