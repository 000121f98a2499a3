//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 服务状态 + 订单存储检查 |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptimeSeconds": 42,
//!   "orders": 3,
//!   "kitchens": 1
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// 健康检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    /// 订单总数 (存储不可读时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    orders: Option<u64>,
    /// 有在线显示屏的厨房数
    kitchens: usize,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let manager = state.manager.clone();
    let orders = tokio::task::spawn_blocking(move || manager.storage().count())
        .await
        .ok()
        .and_then(|r| {
            r.map_err(|e| tracing::warn!(error = %e, "Health check could not read order store"))
                .ok()
        });

    Json(HealthResponse {
        status: if orders.is_some() { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        orders,
        kitchens: state.hub().kitchen_count(),
    })
}
