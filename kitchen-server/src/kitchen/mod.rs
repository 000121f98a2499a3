//! 厨房订单模块
//!
//! # 模块结构
//!
//! - [`actions`] - 订单状态机 (pure transitions)
//! - [`storage`] - redb 持久化
//! - [`manager`] - 命令处理 + 广播
//! - [`hub`] - 按厨房的发布/订阅
//! - [`sweep`] - 计时器到期检测

pub mod actions;
pub mod hub;
pub mod manager;
pub mod storage;
pub mod sweep;

pub use actions::{KitchenAction, TransitionError};
pub use hub::KitchenHub;
pub use manager::{KitchenManager, ManagerError, ManagerResult, SweepReport};
pub use storage::{KitchenStorage, Mutation, StorageError};
pub use sweep::TimerSweep;
