use std::future::Future;
use std::io;

use crate::services::CancellationToken;

/// Resolves once `signal` fires, after cancelling running jobs
///
/// If the signal cannot be installed the server keeps running; it never
/// resolves in that case.
pub async fn shutdown_on<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, cancelling running jobs");
    cancel.cancel();
}
