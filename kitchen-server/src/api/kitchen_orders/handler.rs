//! Kitchen Orders API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use shared::kitchen::{KitchenOrder, NewKitchenOrder};

use crate::api::run_blocking;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Body for `POST /api/kitchen-orders/{id}/start-timer`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerRequest {
    pub cooking_time_minutes: u32,
}

/// Body for `POST /api/kitchen-orders/{id}/add-time`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTimeRequest {
    /// Defaults to 20 seconds
    #[serde(default)]
    pub extra_seconds: Option<u32>,
}

/// Query for `POST /api/kitchen-orders/{id}/complete`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteQuery {
    /// Complete and purge in one step
    #[serde(default)]
    pub remove: bool,
}

/// Response for `DELETE /api/kitchens/{kitchen_id}/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub removed: usize,
}

/// Map axum's plain-text body rejection into the API error format
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::invalid_request(e.body_text()))
}

/// GET /api/kitchens/:kitchen_id/orders - All orders of one kitchen, oldest first
pub async fn list(
    State(state): State<ServerState>,
    Path(kitchen_id): Path<i64>,
) -> AppResult<Json<Vec<KitchenOrder>>> {
    let orders = run_blocking(&state, move |m| m.list_orders(kitchen_id)).await?;
    Ok(Json(orders))
}

/// POST /api/kitchens/:kitchen_id/orders - Intake from the ordering side
///
/// `restaurantId` always comes from the path.
pub async fn create(
    State(state): State<ServerState>,
    Path(kitchen_id): Path<i64>,
    payload: Result<Json<NewKitchenOrder>, JsonRejection>,
) -> AppResult<Json<KitchenOrder>> {
    let mut input = body(payload)?;
    input.restaurant_id = kitchen_id;
    let order = run_blocking(&state, move |m| m.create_order(input)).await?;
    Ok(Json(order))
}

/// DELETE /api/kitchens/:kitchen_id/orders - Administrative reset
pub async fn delete_all(
    State(state): State<ServerState>,
    Path(kitchen_id): Path<i64>,
) -> AppResult<Json<DeleteAllResponse>> {
    let removed = run_blocking(&state, move |m| m.delete_all(kitchen_id)).await?;
    Ok(Json(DeleteAllResponse { removed }))
}

/// GET /api/kitchen-orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<KitchenOrder>> {
    let order = run_blocking(&state, move |m| m.get_order(id)).await?;
    Ok(Json(order))
}

/// POST /api/kitchen-orders/:id/start-timer
pub async fn start_timer(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    payload: Result<Json<StartTimerRequest>, JsonRejection>,
) -> AppResult<Json<KitchenOrder>> {
    let req = body(payload)?;
    let order = run_blocking(&state, move |m| m.start_timer(id, req.cooking_time_minutes)).await?;
    Ok(Json(order))
}

/// POST /api/kitchen-orders/:id/add-time
///
/// An empty body is accepted and uses the default extension.
pub async fn add_time(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    payload: Result<Json<AddTimeRequest>, JsonRejection>,
) -> AppResult<Json<KitchenOrder>> {
    let req = match payload {
        Err(JsonRejection::MissingJsonContentType(_)) => AddTimeRequest::default(),
        other => body(other)?,
    };
    let order = run_blocking(&state, move |m| m.add_time(id, req.extra_seconds)).await?;
    Ok(Json(order))
}

/// POST /api/kitchen-orders/:id/ready
pub async fn mark_ready(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<KitchenOrder>> {
    let order = run_blocking(&state, move |m| m.mark_ready(id)).await?;
    Ok(Json(order))
}

/// POST /api/kitchen-orders/:id/complete?remove=bool
pub async fn complete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(query): Query<CompleteQuery>,
) -> AppResult<Json<KitchenOrder>> {
    let order = if query.remove {
        run_blocking(&state, move |m| m.complete_and_remove(id)).await?
    } else {
        run_blocking(&state, move |m| m.complete(id)).await?
    };
    Ok(Json(order))
}

/// DELETE /api/kitchen-orders/:id
pub async fn delete(State(state): State<ServerState>, Path(id): Path<i64>) -> AppResult<Json<bool>> {
    run_blocking(&state, move |m| m.delete(id)).await?;
    Ok(Json(true))
}
