// Signal handling module
//
// - SIGINT  (Ctrl+C): graceful shutdown
// - SIGTERM (Unix):   graceful shutdown

use crate::logger;

/// Resolve once the process is asked to stop.
///
/// A signal that cannot be registered is logged and never fires; the
/// remaining one still works.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = interrupt => {}
        () = terminate() => {}
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            std::future::pending::<()>().await;
        }
    }
}

/// Windows: only Ctrl+C is supported
#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
