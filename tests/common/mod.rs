use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pets_api::{app, in_memory_store, AppState, NewPet, PetRepository, PetTransaction};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_BODY_LIMIT: usize = 64 * 1024;

/// Router over a fresh in-memory store, plus the state so tests can inspect the store directly.
pub async fn test_app(max_page_size: u32) -> (Router, AppState) {
    let store = in_memory_store().await.unwrap();
    let state = AppState::new(Arc::new(store), max_page_size);
    (app(state.clone(), TEST_BODY_LIMIT), state)
}

/// Insert and commit pets in one transaction, returning their ids in order.
#[allow(dead_code)]
pub async fn seed(state: &AppState, names: &[&str]) -> Vec<i64> {
    let mut tx = state.store.begin().await.unwrap();
    let mut ids = Vec::new();
    for name in names {
        ids.push(tx.insert(&NewPet::new(*name)).await.unwrap());
    }
    tx.commit().await.unwrap();
    ids
}

#[allow(dead_code)]
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
