use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Token for `worker wait`, cancelled on SIGTERM or SIGINT.
///
/// [`TaskPoller::next_task`](crate::worker::TaskPoller::next_task) checks it
/// between dequeue attempts, so a signal never interrupts a rename halfway.
/// A task the worker already claimed stays in its claim area until it is
/// completed, failed or requeued. If the handlers cannot be installed the
/// token is simply never cancelled.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to install signal handlers");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping");
            }
        }

        token_clone.cancel();
    });

    token
}
