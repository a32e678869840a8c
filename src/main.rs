use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use cors_devserver::cli::Args;
use cors_devserver::config::{AppState, Config};
use cors_devserver::{logger, server, Result, ServerError};

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let loaded = Config::load(args.config.as_deref(), &args.overrides())?;
    let root = loaded.resolve_root()?;
    let addr = loaded.config.get_socket_addr()?;
    logger::init(&loaded.config.logging).map_err(ServerError::Logger)?;

    // Create Tokio runtime, worker count from config or CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = loaded.config.server.workers.filter(|&w| w > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(ServerError::Runtime)?;

    runtime.block_on(async_main(loaded.config, root, addr))
}

async fn async_main(config: Config, root: PathBuf, addr: SocketAddr) -> Result<()> {
    let api_key_hint = config.banner.api_key_hint.clone();
    let state = Arc::new(AppState::new(config, root)?);

    let listener = server::create_listener(addr)?;
    let local_addr = listener.local_addr()?;
    logger::log_server_start(&local_addr, &state.root, &api_key_hint);

    server::start_server_loop(listener, state, server::shutdown_signal()).await;

    logger::log_server_stopped();
    Ok(())
}
