use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::build_app;
use crate::core::{Config, ServerState};
use crate::kitchen::KitchenStorage;

fn state() -> ServerState {
    let storage = KitchenStorage::open_in_memory().unwrap();
    ServerState::with_storage(Config::default(), storage)
}

async fn call(state: &ServerState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = build_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(state: &ServerState, kitchen: i64) -> i64 {
    let (status, body) = call(
        state,
        "POST",
        &format!("/api/kitchens/{kitchen}/orders"),
        Some(json!({ "menuItemId": 7, "batchSize": 4, "tableSection": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_takes_kitchen_from_path() {
    let state = state();
    let (status, body) = call(
        &state,
        "POST",
        "/api/kitchens/12/orders",
        Some(json!({ "restaurantId": 99, "menuItemId": 7, "batchSize": 4 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["restaurantId"], 12);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["batchNumber"], 1);

    let (_, list) = call(&state, "GET", "/api/kitchens/12/orders", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (_, other) = call(&state, "GET", "/api/kitchens/99/orders", None).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let state = state();
    let (status, body) = call(
        &state,
        "POST",
        "/api/kitchens/1/orders",
        Some(json!({ "menuItemId": 7, "batchSize": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);

    let (status, body) = call(&state, "POST", "/api/kitchens/1/orders", Some(json!({ "nope": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_lifecycle_over_http() {
    let state = state();
    let id = create(&state, 1).await;

    let (status, body) = call(
        &state,
        "POST",
        &format!("/api/kitchen-orders/{id}/start-timer"),
        Some(json!({ "cookingTimeMinutes": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cooking");
    let start = body["timerStart"].as_i64().unwrap();
    assert_eq!(body["timerEnd"].as_i64().unwrap() - start, 180_000);

    let (status, body) = call(&state, "POST", &format!("/api/kitchen-orders/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["completedAt"].is_i64());

    let (status, body) = call(&state, "DELETE", &format!("/api/kitchen-orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (status, body) = call(&state, "GET", &format!("/api/kitchen-orders/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
    assert_eq!(body["details"]["orderId"], id);
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let state = state();
    let id = create(&state, 1).await;

    let (status, body) = call(&state, "POST", &format!("/api/kitchen-orders/{id}/add-time"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4002);
    assert_eq!(body["details"]["currentStatus"], "pending");
    assert_eq!(body["details"]["attemptedAction"], "add_time");

    // rejected command left the order alone
    let (_, body) = call(&state, "GET", &format!("/api/kitchen-orders/{id}"), None).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_ready_is_terminal() {
    let state = state();
    let id = create(&state, 1).await;
    call(
        &state,
        "POST",
        &format!("/api/kitchen-orders/{id}/start-timer"),
        Some(json!({ "cookingTimeMinutes": 1 })),
    )
    .await;

    let (status, body) = call(&state, "POST", &format!("/api/kitchen-orders/{id}/ready"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, body) = call(&state, "POST", &format!("/api/kitchen-orders/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["currentStatus"], "ready");

    let (status, _) = call(&state, "DELETE", &format!("/api/kitchen-orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_complete_with_remove() {
    let state = state();
    let id = create(&state, 3).await;
    call(
        &state,
        "POST",
        &format!("/api/kitchen-orders/{id}/start-timer"),
        Some(json!({ "cookingTimeMinutes": 2 })),
    )
    .await;

    let (status, body) = call(
        &state,
        "POST",
        &format!("/api/kitchen-orders/{id}/complete?remove=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (_, list) = call(&state, "GET", "/api/kitchens/3/orders", None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_all_is_scoped() {
    let state = state();
    create(&state, 1).await;
    create(&state, 1).await;
    create(&state, 2).await;

    let (status, body) = call(&state, "DELETE", "/api/kitchens/1/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);

    let (_, list) = call(&state, "GET", "/api/kitchens/2/orders", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_health() {
    let state = state();
    create(&state, 1).await;
    let (status, body) = call(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["orders"], 1);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let state = state();
    let (status, body) = call(&state, "GET", "/api/kitchens/1/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 3);
    assert_eq!(body["details"]["resource"], "/api/kitchens/1/nothing-here");
}
