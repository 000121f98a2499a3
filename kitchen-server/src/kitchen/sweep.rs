//! TimerSweep - 定时检测到期的烹饪计时器
//!
//! The sweep is the only place that decides a timer has expired. Displays
//! render a countdown but wait for the `OrderUpdated` event (or the next poll)
//! before showing `timer_expired`.

use std::sync::Arc;
use std::time::Duration;

use shared::util::now_millis;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::KitchenManager;

/// Default sweep cadence
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

/// Periodic expiry scan over all kitchens
pub struct TimerSweep {
    manager: Arc<KitchenManager>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl TimerSweep {
    pub fn new(manager: Arc<KitchenManager>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// Run until cancelled
    ///
    /// Each tick awaits the blocking sweep before the next one can fire, and
    /// missed ticks are skipped rather than bunched up.
    pub async fn run(self) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Timer sweep started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Timer sweep received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let manager = self.manager.clone();
        let result =
            tokio::task::spawn_blocking(move || manager.sweep_expired(now_millis())).await;

        match result {
            Ok(report) if report.failed > 0 => {
                tracing::warn!(
                    expired = report.expired.len(),
                    failed = report.failed,
                    "Timer sweep finished with failures"
                );
            }
            Ok(report) if !report.expired.is_empty() => {
                tracing::debug!(expired = report.expired.len(), "Timer sweep expired orders");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Timer sweep pass panicked");
            }
        }
    }
}
