// Server loop module
// Accepts connections until shutdown, then drains open connections

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::connection::spawn_connection;
use crate::config::AppState;
use crate::logger;

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Serve connections from `listener` until `shutdown` resolves.
///
/// When it does, the listener is closed so no new connections are
/// accepted and every open connection is told to finish its current
/// response. Connections still open after `server.shutdown_timeout`
/// seconds are aborted.
pub async fn start_server_loop<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = ()>,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        spawn_connection(
                            &mut connections,
                            stream,
                            peer_addr,
                            Arc::clone(&state),
                            shutdown_rx.clone(),
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }

            Some(joined) = connections.join_next() => {
                if let Err(e) = joined {
                    logger::log_error(&format!("Connection task failed: {e}"));
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown_started();

    // Receivers only see the change, the value itself is not inspected
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(state.config.server.shutdown_timeout);
    if tokio::time::timeout(grace, drain(&mut connections)).await.is_err() {
        logger::log_warning(&format!(
            "Closing {} connection(s) still open after {}s",
            connections.len(),
            grace.as_secs()
        ));
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}

async fn drain(connections: &mut JoinSet<()>) {
    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            logger::log_error(&format!("Connection task failed: {e}"));
        }
    }
}
