//! Kitchen order record and its status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds per second, timers are stored in unix millis
pub const MILLIS_PER_SECOND: i64 = 1_000;

/// Default extension applied by `AddTime` when the caller gives none
pub const DEFAULT_EXTRA_SECONDS: u32 = 20;

// ============================================================================
// Status
// ============================================================================

/// Production status of a kitchen order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum KitchenOrderStatus {
    /// 已下单，未开始计时
    #[default]
    Pending,
    /// 计时中
    Cooking,
    /// 计时已到，等待厨师处理（报警）
    TimerExpired,
    /// 已出餐待取
    Ready,
    /// 已完成
    Completed,
}

impl KitchenOrderStatus {
    /// Wire name of the status
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cooking => "cooking",
            Self::TimerExpired => "timer_expired",
            Self::Ready => "ready",
            Self::Completed => "completed",
        }
    }

    /// Statuses that carry a timer window
    pub const fn has_timer(&self) -> bool {
        matches!(self, Self::Cooking | Self::TimerExpired)
    }
}

impl fmt::Display for KitchenOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order
// ============================================================================

/// One in-flight kitchen order (a cooking batch of one menu item)
///
/// Every event carries a full copy of this record, so displays never merge
/// partial diffs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrder {
    pub id: i64,
    /// Kitchen scope, selects the broadcast topic
    pub restaurant_id: i64,
    pub table_section: i32,
    pub menu_item_id: i64,
    /// 1..=3, anything else resolves to batch 1
    pub batch_number: u8,
    pub batch_size: u32,
    pub status: KitchenOrderStatus,
    #[serde(default)]
    pub timer_start: Option<i64>,
    #[serde(default)]
    pub timer_end: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A violated record invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order {order_id}: {reason}")]
pub struct InvariantViolation {
    pub order_id: i64,
    pub reason: &'static str,
}

impl KitchenOrder {
    /// Build a fresh `pending` order from intake data
    pub fn new_pending(id: i64, input: &NewKitchenOrder, now: i64) -> Self {
        Self {
            id,
            restaurant_id: input.restaurant_id,
            table_section: input.table_section,
            menu_item_id: input.menu_item_id,
            batch_number: input.batch_number,
            batch_size: input.batch_size,
            status: KitchenOrderStatus::Pending,
            timer_start: None,
            timer_end: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Verify the record-level invariants
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let fail = |reason| {
            Err(InvariantViolation {
                order_id: self.id,
                reason,
            })
        };

        match (self.timer_start, self.timer_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if end <= start {
                    return fail("timer_end must be after timer_start");
                }
            }
            _ => return fail("timer_start and timer_end must be set together"),
        }

        if self.completed_at.is_some() != (self.status == KitchenOrderStatus::Completed) {
            return fail("completed_at must be set iff status is completed");
        }

        if self.status.has_timer() && self.timer_end.is_none() {
            return fail("cooking and timer_expired orders need a timer_end");
        }

        if self.status == KitchenOrderStatus::Pending && self.timer_start.is_some() {
            return fail("pending orders have no timer");
        }

        Ok(())
    }

    /// Whole seconds left on the timer, 0 when not cooking or already past
    pub fn remaining_seconds(&self, now: i64) -> u64 {
        match (self.status, self.timer_end) {
            (KitchenOrderStatus::Cooking, Some(end)) if end > now => {
                ((end - now) / MILLIS_PER_SECOND) as u64
            }
            _ => 0,
        }
    }

    /// Cooking order whose window has elapsed (due for the sweep)
    pub fn is_timer_elapsed(&self, now: i64) -> bool {
        self.status == KitchenOrderStatus::Cooking && self.timer_end.is_some_and(|end| now >= end)
    }

    /// Still shown on the live board
    pub fn is_active(&self) -> bool {
        self.status != KitchenOrderStatus::Completed
    }
}

// ============================================================================
// Intake
// ============================================================================

/// Intake payload for a new kitchen order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewKitchenOrder {
    /// Overwritten from the route when submitted over HTTP
    #[serde(default)]
    pub restaurant_id: i64,
    #[serde(default)]
    pub table_section: i32,
    pub menu_item_id: i64,
    #[serde(default = "default_batch_number")]
    pub batch_number: u8,
    pub batch_size: u32,
}

fn default_batch_number() -> u8 {
    1
}

impl NewKitchenOrder {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batchSize must be greater than 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Menu item cooking times
// ============================================================================

/// Configured cook times (minutes) of a menu item, one per batch
///
/// Read-only input: callers resolve the duration and pass it to `StartTimer`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemTimes {
    pub cooking_time_batch1: u32,
    pub cooking_time_batch2: u32,
    pub cooking_time_batch3: u32,
}

impl MenuItemTimes {
    /// Cook time for a batch, batch 1 when absent or out of range
    pub fn cooking_minutes_for(&self, batch_number: Option<u8>) -> u32 {
        match batch_number {
            Some(2) => self.cooking_time_batch2,
            Some(3) => self.cooking_time_batch3,
            _ => self.cooking_time_batch1,
        }
    }
}
