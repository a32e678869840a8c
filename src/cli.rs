use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;

/// Local development server: static files plus permissive CORS headers
#[derive(Debug, Parser)]
#[command(name = "cors-devserver", version, about)]
pub struct Args {
    /// Port to listen on [default: 8000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Directory to serve [default: config file's directory, else current directory]
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file [default: ./devserver.toml if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable the access log
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            root: self.root.clone(),
            quiet: self.quiet,
        }
    }
}
