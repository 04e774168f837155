// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use crate::logger;

/// Resolve when the process is asked to stop (Unix)
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            interrupt().await;
            return;
        }
    };

    tokio::select! {
        () = interrupt() => {}
        _ = sigterm.recv() => {}
    }
}

/// Resolve when the process is asked to stop (non-Unix: Ctrl+C only)
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    interrupt().await;
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_warning(&format!("Failed to listen for Ctrl+C: {e}"));
        std::future::pending::<()>().await;
    }
}
