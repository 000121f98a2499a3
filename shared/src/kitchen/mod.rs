//! Kitchen production board types
//!
//! - [`KitchenOrder`]: the record every event and snapshot carries
//! - [`KitchenEvent`]: change notifications pushed per kitchen
//! - [`DisplayMessage`] / [`DisplayCommand`]: display WebSocket protocol

pub mod event;
pub mod order;
pub mod ws;

pub use event::KitchenEvent;
pub use order::{
    DEFAULT_EXTRA_SECONDS, InvariantViolation, KitchenOrder, KitchenOrderStatus, MILLIS_PER_SECOND,
    MenuItemTimes, NewKitchenOrder,
};
pub use ws::{DisplayCommand, DisplayMessage};
