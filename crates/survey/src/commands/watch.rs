//! `watch`: mount every provider and stream notifications until Ctrl-C.

use std::pin::pin;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, sleep_until};
use tracing::{info, warn};

use survey_core::{HttpBackend, ReloadSignal, Session};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    session: &Session<HttpBackend>,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let watchdog = session.watchdog();
    if args.abandon_stalled && watchdog.is_none() {
        return Err(CliError::Validation {
            reason: "--abandon-stalled needs a reload watchdog (reload_watchdog_secs > 0)".into(),
        });
    }

    let color = output::should_color(&global.color);
    let mut feed = session.notifications().subscribe();
    let mut signals = session.reload().subscribe();
    session.start().await;
    info!("watching; press Ctrl-C to stop");

    // Stalled reloads are abandoned one watchdog period after the
    // watchdog reported them.
    let mut abandon_at: Option<(u64, Instant)> = None;
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());

    let result = loop {
        let deadline = abandon_at.map(|(_, at)| at);
        tokio::select! {
            biased;

            res = &mut ctrl_c => {
                if let Err(e) = res {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                break Ok(());
            }

            batch = feed.next() => {
                let Some(batch) = batch else { break Ok(()) };
                for n in &batch {
                    println!("{}", output::notification_line(n, color));
                }
            }

            signal = signals.recv() => match signal {
                Ok(ReloadSignal::Requested { epoch }) => {
                    if args.reloads {
                        eprintln!("reload #{epoch} started");
                    }
                    if args.abandon_stalled {
                        abandon_at = watchdog.map(|t| (epoch, Instant::now() + t * 2));
                    }
                }
                Ok(ReloadSignal::Finished { epoch }) => {
                    if args.reloads {
                        eprintln!("reload #{epoch} finished");
                    }
                    if abandon_at.is_some_and(|(e, _)| e == epoch) {
                        abandon_at = None;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watch lagged behind reload signals");
                }
                Err(RecvError::Closed) => break Ok(()),
            },

            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let stalled = abandon_at.take().map(|(epoch, _)| epoch);
                if stalled.is_some() && session.reload().active_epoch() == stalled {
                    let abandoned = session.abandon_reload();
                    warn!(count = abandoned.len(), "abandoned stalled reload");
                }
            }
        }
    };

    session.shutdown().await;
    for n in feed.drain_new() {
        println!("{}", output::notification_line(&n, color));
    }
    result
}
