//! Kitchen Orders API Module
//!
//! REST endpoints for the kitchen order lifecycle. Every command answers with
//! the order as stored after the transition.

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub use handler::{AddTimeRequest, CompleteQuery, DeleteAllResponse, StartTimerRequest};

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/kitchens", kitchen_routes())
        .nest("/api/kitchen-orders", order_routes())
}

fn kitchen_routes() -> Router<ServerState> {
    Router::new().route(
        "/{kitchen_id}/orders",
        get(handler::list)
            .post(handler::create)
            .delete(handler::delete_all),
    )
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}", get(handler::get_by_id).delete(handler::delete))
        .route("/{id}/start-timer", post(handler::start_timer))
        .route("/{id}/add-time", post(handler::add_time))
        .route("/{id}/ready", post(handler::mark_ready))
        .route("/{id}/complete", post(handler::complete))
}

#[cfg(test)]
mod tests;
