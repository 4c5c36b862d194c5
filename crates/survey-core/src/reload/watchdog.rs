// Stalled-reload watchdog: one timer per reload epoch, restarted by newer
// requests, disarmed by `Finished`.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ReloadSignal;
use super::coordinator::ReloadCoordinator;

pub(super) async fn run(
    coordinator: ReloadCoordinator,
    mut signals: broadcast::Receiver<ReloadSignal>,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let mut watching = coordinator.active_epoch();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = signals.recv() => match signal {
                Ok(ReloadSignal::Requested { epoch }) => {
                    watching = Some(epoch);
                    deadline.as_mut().reset(Instant::now() + timeout);
                }
                Ok(ReloadSignal::Finished { .. }) => watching = None,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "watchdog lagged behind reload signals");
                    watching = coordinator.active_epoch();
                    deadline.as_mut().reset(Instant::now() + timeout);
                }
                Err(RecvError::Closed) => break,
            },
            () = &mut deadline, if watching.is_some() => {
                if let Some(epoch) = watching.take() {
                    coordinator.report_if_stalled(epoch);
                }
            }
        }
    }

    debug!("reload watchdog exiting");
}
