use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;

/// Starts the background loops that run alongside the API server. Each stops when
/// `shutdown` flips to `true`.
pub(crate) fn spawn(state: AppState, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    vec![tokio::spawn(sweep_leases_loop(state, shutdown))]
}

/// Waits for every loop started by [`spawn`] to finish.
pub(crate) async fn join(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }
}

async fn sweep_leases_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().grading().lock_sweep_interval_seconds.max(1));
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let evicted = state.flights().sweep_expired();
                if evicted > 0 {
                    tracing::warn!(evicted, "Evicted expired submission leases");
                }
            }
        }
    }

    tracing::debug!("Lease sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_test_context;

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let ctx = setup_test_context().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = spawn(ctx.state.clone(), shutdown_rx);
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), join(handles))
            .await
            .expect("sweeper should stop after shutdown");
        assert_eq!(ctx.state.flights().held(), 0);
    }
}
