//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`kitchen_orders`] - 厨房订单命令与查询
//! - [`kitchen_ws`] - 厨房显示屏 WebSocket 推送

pub mod health;
pub mod kitchen_orders;
pub mod kitchen_ws;

use axum::Router;
use http::Uri;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::kitchen::{KitchenManager, ManagerResult};
use crate::utils::{AppError, AppResult};

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Kitchen order commands and queries
        .merge(kitchen_orders::router())
        // Display push channel
        .merge(kitchen_ws::router())
        .fallback(unknown_route)
}

/// Unknown paths answer with the error envelope
async fn unknown_route(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}

/// Build the fully configured application
///
/// Used by the HTTP server and by router tests through `oneshot`.
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // CORS - displays are served from other origins
        .layer(CorsLayer::permissive())
        // Trace - Request tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a manager call on the blocking pool
///
/// The manager holds redb's single writer for the duration of a command, so
/// it never runs on the async workers.
pub(crate) async fn run_blocking<T, F>(state: &ServerState, f: F) -> AppResult<T>
where
    F: FnOnce(&KitchenManager) -> ManagerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let manager = state.manager.clone();
    tokio::task::spawn_blocking(move || f(&manager))
        .await
        .map_err(|e| AppError::internal(format!("Blocking task failed: {e}")))?
        .map_err(AppError::from)
}
