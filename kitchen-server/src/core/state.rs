use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::kitchen::{KitchenHub, KitchenManager, KitchenStorage, TimerSweep};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，每个 handler 克隆成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | manager | Arc<KitchenManager> | 订单存储 + 命令处理 + 广播 |
/// | started_at | Instant | 启动时间 (health 接口) |
/// | shutdown | CancellationToken | 关闭信号 (HTTP、WS 会话、后台任务共用) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub manager: Arc<KitchenManager>,
    pub started_at: Instant,
    pub shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(config: Config, manager: Arc<KitchenManager>) -> Self {
        Self {
            config,
            manager,
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 确保工作目录存在
    /// 2. 打开 redb (WORK_DIR/kitchen.redb)
    /// 3. 创建厨房 hub
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let db_path = config.database_path();
        let storage = KitchenStorage::open(&db_path)?;
        tracing::info!(
            path = %db_path.display(),
            orders = storage.count()?,
            "Kitchen order store opened"
        );
        Ok(Self::with_storage(config.clone(), storage))
    }

    /// 使用已有存储构造 (测试使用内存 redb)
    pub fn with_storage(config: Config, storage: KitchenStorage) -> Self {
        let hub = KitchenHub::new(config.subscriber_buffer);
        let manager = Arc::new(KitchenManager::new(storage, hub));
        Self::new(config, manager)
    }

    pub fn hub(&self) -> &KitchenHub {
        self.manager.hub()
    }

    /// 注册后台任务 (计时器扫描)
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let sweep = TimerSweep::new(
            self.manager.clone(),
            self.config.sweep_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("timer_sweep", TaskKind::Periodic, sweep.run());
    }
}
