// Server loop module
// Accepts connections until a shutdown signal arrives

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::shutdown_signal;
use crate::config::AppState;
use crate::logger;

/// Accept connections and hand them to connection tasks.
///
/// Returns once SIGINT or SIGTERM is received; connections already being
/// served finish on their own tasks.
pub async fn run_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}
