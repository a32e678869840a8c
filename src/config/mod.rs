// Configuration module entry point
// Layers built-in defaults, an optional TOML file and command-line overrides

mod state;
mod types;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{BannerConfig, Config, CorsConfig, HttpConfig, LoggingConfig, ServerConfig};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "devserver.toml";
pub const DEFAULT_PORT: u16 = 8000;

/// Values that take precedence over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
    pub quiet: bool,
}

/// A loaded configuration together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Config file that was actually read, if any
    pub source_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicitly named file must exist; the default `devserver.toml`
    /// is optional.
    pub fn load(
        config_path: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<LoadedConfig, ServerError> {
        let (path, required) = match config_path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("server.shutdown_timeout", 10_i64)?
            .set_default("http.index_files", vec!["index.html", "index.htm"])?
            .set_default("http.directory_listing", true)?
            .set_default(
                "http.server_name",
                concat!("cors-devserver/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("cors.allow_origin", "*")?
            .set_default("cors.allow_methods", "GET, POST, OPTIONS")?
            .set_default("cors.allow_headers", "*")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("banner.api_key_hint", "Using API key from main.js")?
            .add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(required),
            );

        if let Some(ref host) = overrides.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(ref root) = overrides.root {
            // Anchored here so only roots written in the file are file-relative
            let root = std::path::absolute(root).map_err(|source| ServerError::RootDir {
                path: root.clone(),
                source,
            })?;
            builder = builder.set_override("server.root", root.to_string_lossy().into_owned())?;
        }
        if overrides.quiet {
            builder = builder.set_override("logging.access_log", false)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        let source_file = path.is_file().then_some(path);

        Ok(LoadedConfig {
            config,
            source_file,
        })
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        self.server
            .host
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.server.port))
            .map_err(|e| ServerError::InvalidAddress {
                addr: format!("{}:{}", self.server.host, self.server.port),
                reason: e.to_string(),
            })
    }
}

impl LoadedConfig {
    /// Resolve the directory to serve as an absolute, canonical path.
    ///
    /// Precedence: `server.root`, then the directory holding the config
    /// file that was read, then the working directory. A relative
    /// `server.root` from the file is taken relative to the file.
    pub fn resolve_root(&self) -> Result<PathBuf, ServerError> {
        let config_dir = self.source_file.as_deref().map(|file| {
            file.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });

        let candidate = match (&self.config.server.root, config_dir) {
            (Some(root), Some(dir)) => dir.join(root),
            (Some(root), None) => root.clone(),
            (None, Some(dir)) => dir,
            (None, None) => PathBuf::from("."),
        };

        let canonical = candidate
            .canonicalize()
            .map_err(|source| ServerError::RootDir {
                path: candidate.clone(),
                source,
            })?;
        if !canonical.is_dir() {
            return Err(ServerError::NotADirectory(canonical));
        }
        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load_file(path: &Path, overrides: &Overrides) -> LoadedConfig {
        Config::load(Some(path), overrides).expect("config should load")
    }

    #[test]
    fn test_defaults_without_file() {
        let loaded = Config::load(None, &Overrides::default()).unwrap();
        let cfg = &loaded.config;

        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.shutdown_timeout, 10);
        assert_eq!(cfg.cors.allow_origin, "*");
        assert_eq!(cfg.cors.allow_methods, "GET, POST, OPTIONS");
        assert_eq!(cfg.cors.allow_headers, "*");
        assert_eq!(cfg.http.index_files, vec!["index.html", "index.htm"]);
        assert!(cfg.logging.access_log);
        assert!(loaded.source_file.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = Config::load(Some(&missing), &Overrides::default());
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn test_file_values_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devserver.toml");
        fs::write(
            &path,
            "[server]\nport = 9100\nhost = \"127.0.0.1\"\n\n[cors]\nallow_headers = \"Content-Type\"\n",
        )
        .unwrap();

        let loaded = load_file(&path, &Overrides::default());
        assert_eq!(loaded.config.server.port, 9100);
        assert_eq!(loaded.config.cors.allow_headers, "Content-Type");
        assert_eq!(loaded.config.cors.allow_origin, "*");
        assert_eq!(loaded.source_file.as_deref(), Some(path.as_path()));

        let overrides = Overrides {
            port: Some(9200),
            quiet: true,
            ..Overrides::default()
        };
        let loaded = load_file(&path, &overrides);
        assert_eq!(loaded.config.server.port, 9200);
        assert_eq!(loaded.config.server.host, "127.0.0.1");
        assert!(!loaded.config.logging.access_log);
    }

    #[test]
    fn test_root_defaults_to_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devserver.toml");
        fs::write(&path, "").unwrap();

        let loaded = load_file(&path, &Overrides::default());
        let root = loaded.resolve_root().unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_root_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir(&site).unwrap();
        let path = dir.path().join("devserver.toml");
        fs::write(&path, "").unwrap();

        let overrides = Overrides {
            root: Some(site.clone()),
            ..Overrides::default()
        };
        let root = load_file(&path, &overrides).resolve_root().unwrap();
        assert_eq!(root, site.canonicalize().unwrap());
    }

    #[test]
    fn test_relative_root_in_file_is_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("public");
        fs::create_dir(&site).unwrap();
        let path = dir.path().join("devserver.toml");
        fs::write(&path, "[server]\nroot = \"public\"\n").unwrap();

        let root = load_file(&path, &Overrides::default()).resolve_root().unwrap();
        assert_eq!(root, site.canonicalize().unwrap());
    }

    #[test]
    fn test_relative_cli_root_is_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devserver.toml");
        fs::write(&path, "").unwrap();

        // "src" exists in the crate directory, not next to the config file
        let overrides = Overrides {
            root: Some(PathBuf::from("src")),
            ..Overrides::default()
        };
        let root = load_file(&path, &overrides).resolve_root().unwrap();
        assert_eq!(root, Path::new("src").canonicalize().unwrap());
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let overrides = Overrides {
            root: Some(file),
            ..Overrides::default()
        };
        let result = Config::load(None, &overrides).unwrap().resolve_root();
        assert!(matches!(result, Err(ServerError::NotADirectory(_))));

        let overrides = Overrides {
            root: Some(dir.path().join("missing")),
            ..Overrides::default()
        };
        let result = Config::load(None, &overrides).unwrap().resolve_root();
        assert!(matches!(result, Err(ServerError::RootDir { .. })));
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load(None, &Overrides::default()).unwrap().config;
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "0.0.0.0:8000".parse::<SocketAddr>().unwrap()
        );

        cfg.server.host = "::1".to_string();
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "[::1]:8000".parse::<SocketAddr>().unwrap()
        );

        cfg.server.host = "not-an-ip".to_string();
        assert!(matches!(
            cfg.get_socket_addr(),
            Err(ServerError::InvalidAddress { .. })
        ));
    }
}
