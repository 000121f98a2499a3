//! Change notifications fanned out to kitchen displays

use serde::{Deserialize, Serialize};

use super::order::KitchenOrder;

/// Kitchen change event
///
/// Order-carrying variants hold the full record, never a diff, so a display
/// that misses or reorders one event is corrected by the next.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum KitchenEvent {
    OrderCreated { order: KitchenOrder },
    /// StartTimer, AddTime, MarkReady and timer expiry
    OrderUpdated { order: KitchenOrder },
    /// Fires before the deletion when completion also removes the order
    OrderCompleted { order: KitchenOrder },
    #[serde(rename_all = "camelCase")]
    OrderDeleted { order_id: i64 },
    AllOrdersDeleted,
}

impl KitchenEvent {
    /// Order the event refers to, `None` for bulk clears
    pub fn order_id(&self) -> Option<i64> {
        match self {
            Self::OrderCreated { order }
            | Self::OrderUpdated { order }
            | Self::OrderCompleted { order } => Some(order.id),
            Self::OrderDeleted { order_id } => Some(*order_id),
            Self::AllOrdersDeleted => None,
        }
    }

    /// Snapshot carried by the event
    pub fn order(&self) -> Option<&KitchenOrder> {
        match self {
            Self::OrderCreated { order }
            | Self::OrderUpdated { order }
            | Self::OrderCompleted { order } => Some(order),
            _ => None,
        }
    }

    /// Event kind name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "OrderCreated",
            Self::OrderUpdated { .. } => "OrderUpdated",
            Self::OrderCompleted { .. } => "OrderCompleted",
            Self::OrderDeleted { .. } => "OrderDeleted",
            Self::AllOrdersDeleted => "AllOrdersDeleted",
        }
    }
}
