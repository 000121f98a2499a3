//! Kitchen order state machine
//!
//! ```text
//! pending ──StartTimer──▶ cooking ──SweepTick──▶ timer_expired
//!                           ▲                        │
//!                           └────────AddTime─────────┘
//! cooking | timer_expired ──MarkReady──▶ ready
//! cooking | timer_expired ──Complete───▶ completed
//! any ──Delete──▶ removed (handled by the manager, not an action)
//! ```
//!
//! Transitions are pure: they take the current record and a clock reading and
//! return the next record. Persistence and broadcast belong to the manager.

use shared::kitchen::{KitchenOrder, KitchenOrderStatus, MILLIS_PER_SECOND};
use thiserror::Error;

const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;

/// An event applied to one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenAction {
    StartTimer { cooking_time_minutes: u32 },
    AddTime { extra_seconds: u32 },
    MarkReady,
    Complete,
    /// Issued by the timer sweep only
    SweepTick,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} order {order_id} in status {status}")]
    Invalid {
        order_id: i64,
        status: KitchenOrderStatus,
        action: &'static str,
    },

    #[error("{action} needs a duration greater than zero")]
    ZeroDuration { action: &'static str },
}

impl KitchenAction {
    /// Action name as reported to displays
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartTimer { .. } => "start_timer",
            Self::AddTime { .. } => "add_time",
            Self::MarkReady => "mark_ready",
            Self::Complete => "complete",
            Self::SweepTick => "sweep_tick",
        }
    }

    /// Apply the action at `now` (unix millis)
    ///
    /// `Ok(None)` is only returned for `SweepTick` when there is nothing to
    /// expire, which keeps the sweep idempotent.
    pub fn apply(
        &self,
        order: &KitchenOrder,
        now: i64,
    ) -> Result<Option<KitchenOrder>, TransitionError> {
        use KitchenOrderStatus::*;

        let mut next = order.clone();
        match (*self, order.status) {
            (Self::StartTimer { cooking_time_minutes }, Pending) => {
                if cooking_time_minutes == 0 {
                    return Err(TransitionError::ZeroDuration { action: self.name() });
                }
                next.status = Cooking;
                next.timer_start = Some(now);
                next.timer_end = Some(now + i64::from(cooking_time_minutes) * MILLIS_PER_MINUTE);
            }
            (Self::AddTime { extra_seconds }, TimerExpired) => {
                if extra_seconds == 0 {
                    return Err(TransitionError::ZeroDuration { action: self.name() });
                }
                // Fresh window from now, not an extension of the old end
                let start = order.timer_start.unwrap_or(now);
                let end = now + i64::from(extra_seconds) * MILLIS_PER_SECOND;
                next.status = Cooking;
                next.timer_start = Some(start.min(now));
                next.timer_end = Some(end);
            }
            (Self::MarkReady, Cooking | TimerExpired) => {
                next.status = Ready;
            }
            (Self::Complete, Cooking | TimerExpired) => {
                next.status = Completed;
                next.completed_at = Some(now);
            }
            (Self::SweepTick, Cooking) if order.is_timer_elapsed(now) => {
                next.status = TimerExpired;
            }
            (Self::SweepTick, _) => return Ok(None),
            (_, status) => {
                return Err(TransitionError::Invalid {
                    order_id: order.id,
                    status,
                    action: self.name(),
                });
            }
        }

        next.updated_at = now.max(order.updated_at + 1);
        Ok(Some(next))
    }
}
