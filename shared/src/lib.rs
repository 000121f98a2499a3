//! Shared types for the kitchen order engine
//!
//! Wire types used by both kitchen-server and kitchen displays: the order
//! record, change events, the display WebSocket protocol, and the unified
//! error/response envelope.

pub mod error;
pub mod kitchen;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use kitchen::{KitchenEvent, KitchenOrder, KitchenOrderStatus};
