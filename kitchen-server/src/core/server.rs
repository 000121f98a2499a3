//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Bind `0.0.0.0:HTTP_PORT` and serve until Ctrl-C or `state.shutdown`
    pub async fn run(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config)?,
        };

        let shutdown = state.shutdown.clone();
        let mut tasks = BackgroundTasks::with_token(shutdown.child_token());
        state.start_background_tasks(&mut tasks);

        let app = crate::api::build_app(state);
        tracing::info!("🍳 Kitchen server listening on {}", listener.local_addr()?);

        let signal = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received, shutting down..."),
                _ = shutdown.cancelled() => tracing::info!("Shutdown requested"),
            }
            shutdown.cancel();
        };

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;

        tasks.shutdown(self.config.shutdown_timeout()).await;
        served?;
        Ok(())
    }
}
