//! Kitchen Server - 厨房订单生产引擎
//!
//! # 架构概述
//!
//! - **厨房订单** (`kitchen`): 状态机、redb 存储、命令处理、计时器扫描、按厨房广播
//! - **HTTP API** (`api`): RESTful 命令接口 + 显示屏 WebSocket 推送
//! - **核心** (`core`): 配置、状态、后台任务、服务器
//!
//! # 模块结构
//!
//! ```text
//! kitchen-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── kitchen/       # 订单状态机 + 存储 + 广播
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod core;
pub mod kitchen;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use kitchen::{KitchenHub, KitchenManager, KitchenStorage};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env，初始化日志
///
/// `LOG_LEVEL` / `LOG_DIR` are read here because logging starts before
/// [`Config::from_env`] runs.
pub fn setup_environment() -> anyhow::Result<()> {
    if let Err(e) = dotenv::dotenv() {
        // .env is optional
        if !e.not_found() {
            anyhow::bail!("Failed to load .env: {e}");
        }
    }

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __ __ _ __       __
   / //_/(_) /______/ /_  ___  ____
  / ,<  / / __/ ___/ __ \/ _ \/ __ \
 / /| |/ / /_/ /__/ / / /  __/ / / /
/_/ |_/_/\__/\___/_/ /_/\___/_/ /_/
    "#
    );
}
