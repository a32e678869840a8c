// Connection handling module
// Serves one accepted TCP connection on its own task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Time a client has to finish sending a request head
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawn a task serving `stream` into `tasks`.
///
/// The connection keeps serving until the client closes it or the
/// shutdown channel fires. On shutdown the response being written is
/// finished and idle keep-alive connections are closed.
pub fn spawn_connection(
    tasks: &mut JoinSet<()>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) {
    tasks.spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(true)
            .timer(TokioTimer::new())
            .header_read_timeout(HEADER_READ_TIMEOUT);

        let service = service_fn(move |req: Request<Incoming>| {
            handler::handle_request(req, Arc::clone(&state), peer_addr)
        });
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            res = conn.as_mut() => res,
            _ = shutdown.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        };

        if let Err(err) = result {
            logger::log_connection_error(&err);
        }
    });
}
