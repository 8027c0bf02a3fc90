//! Idle-phrase watchdog
//!
//! The only part of the engine that acts without an input event: it closes
//! a typing phrase once no token has arrived for longer than the typing gap.

use super::ActionEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawn the watchdog on the current runtime. It exits when `cancel_token`
/// or the engine's own shutdown token fires.
pub fn spawn_watchdog(engine: Arc<ActionEngine>, cancel_token: CancellationToken) -> JoinHandle<()> {
    let interval = engine.config().watchdog_interval;
    tokio::spawn(watchdog_loop(engine, interval, cancel_token))
}

async fn watchdog_loop(engine: Arc<ActionEngine>, interval: Duration, cancel_token: CancellationToken) {
    let shutdown = engine.shutdown_token();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Typing watchdog started (interval={:?})", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if engine.check_idle() {
                    tracing::debug!("Typing watchdog closed an idle phrase");
                }
            }
            _ = cancel_token.cancelled() => break,
            _ = shutdown.cancelled() => break,
        }
    }

    tracing::debug!("Typing watchdog stopped");
}
