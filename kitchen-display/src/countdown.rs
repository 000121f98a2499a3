//! Countdown rendering
//!
//! Purely cosmetic. A countdown reaching zero never changes an order's status;
//! the display waits for the server to report `timer_expired`.

use shared::kitchen::{KitchenOrder, KitchenOrderStatus};

/// Whole seconds left in the cook window
///
/// `cooking` orders count down to zero, `timer_expired` stays at zero, any
/// other status has no countdown.
pub fn remaining_seconds(order: &KitchenOrder, now: i64) -> Option<u64> {
    match order.status {
        KitchenOrderStatus::Cooking => Some(order.remaining_seconds(now)),
        KitchenOrderStatus::TimerExpired => Some(0),
        _ => None,
    }
}

/// `MM:SS`, minutes grow past 99 instead of wrapping
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
