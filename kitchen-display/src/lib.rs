//! Kitchen Display - 厨房显示屏客户端
//!
//! Keeps a display's local order table consistent with the kitchen server:
//!
//! - [`reconcile`] - 本地订单表合并 + 告警判断
//! - [`alarm`] - 告警输出
//! - [`countdown`] - 倒计时渲染
//! - [`http`] - 命令与查询
//! - [`display`] - 运行循环 (推送 + 轮询 + 重连)
//!
//! ```ignore
//! let config = DisplayConfig::new("http://localhost:3000", 1);
//! let display = KitchenDisplay::connect(config, TracingAlarm::new(1))?;
//! let mut views = display.subscribe();
//! tokio::spawn(async move { display.run(shutdown).await });
//! ```

pub mod alarm;
pub mod config;
pub mod countdown;
pub mod display;
pub mod error;
pub mod http;
pub mod reconcile;

pub use alarm::{AlarmCommand, AlarmSignal, AlarmSink, TracingAlarm};
pub use config::DisplayConfig;
pub use display::KitchenDisplay;
pub use error::{DisplayError, DisplayResult};
pub use http::{KitchenBackend, KitchenHttpClient};
pub use reconcile::{OrderView, ReconcileOutcome, Reconciler, Update};
