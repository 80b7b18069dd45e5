//! Termination signal handling.

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `shutdown` on the first SIGTERM, SIGHUP or SIGINT.
///
/// The listeners are registered before this returns, so a signal delivered
/// afterwards is never missed. The task also ends if `shutdown` is cancelled
/// for another reason.
pub fn cancel_on_signals(shutdown: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    let mut term = signal(SignalKind::terminate())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut int = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = hup.recv() => "SIGHUP",
            _ = int.recv() => "SIGINT",
            _ = shutdown.cancelled() => return,
        };
        info!(signal = name, "Got {}, exiting", name);
        shutdown.cancel();
    }))
}
