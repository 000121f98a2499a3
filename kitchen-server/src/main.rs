use anyhow::Context;
use kitchen_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment()?;

    // 打印横幅
    print_banner();

    tracing::info!("🍳 Kitchen server starting...");

    // 2. 加载配置
    let config = Config::from_env();
    tracing::info!(
        work_dir = %config.work_dir,
        http_port = config.http_port,
        environment = %config.environment,
        "Configuration loaded"
    );

    // 3. 初始化服务器状态 (打开 redb)
    let state = ServerState::initialize(&config).context("Failed to initialize server state")?;

    // 4. 启动 HTTP 服务器 (serve 会启动计时器扫描)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
