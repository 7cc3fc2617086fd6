//! Pets API routes. Every matched route runs inside one transaction.

use crate::handlers::pets::{create, delete as delete_handler, list, read, update, update_by_id};
use crate::state::AppState;
use crate::transaction::transaction_per_request;
use axum::{middleware, routing::get, Router};

pub fn pet_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/pets", get(list).post(create).put(update))
        .route(
            "/api/pets/:id",
            get(read).put(update_by_id).delete(delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            transaction_per_request,
        ))
        .with_state(state)
}
