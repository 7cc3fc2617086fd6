mod common;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use async_trait::async_trait;
use common::{send, test_app};
use pets_api::{
    app, transaction_per_request, AppError, AppState, NewPet, Pet, PetRepository, PetStore,
    PetTransaction, Tx,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn insert_then_fail(mut tx: Tx) -> Result<Json<Pet>, AppError> {
    tx.repo()?.insert(&NewPet::new("Doomed")).await?;
    Err(AppError::Validation("refusing after write".into()))
}

async fn insert_then_500(mut tx: Tx) -> Result<(StatusCode, &'static str), AppError> {
    tx.repo()?.insert(&NewPet::new("Doomed")).await?;
    Ok((StatusCode::INTERNAL_SERVER_ERROR, "boom"))
}

async fn insert_twice(mut tx: Tx) -> Result<Json<Vec<i64>>, AppError> {
    let repo = tx.repo()?;
    let a = repo.insert(&NewPet::new("Lala")).await?;
    let b = repo.insert(&NewPet::new("Mandy")).await?;
    Ok(Json(vec![a, b]))
}

async fn unwrapped(mut tx: Tx) -> Result<Json<Vec<Pet>>, AppError> {
    Ok(Json(tx.repo()?.list(0, 10).await?))
}

fn boundary_routes(state: AppState) -> Router {
    Router::new()
        .route("/fail", post(insert_then_fail))
        .route("/server-error", post(insert_then_500))
        .route("/ok", post(insert_twice))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            transaction_per_request,
        ))
        .route("/unwrapped", get(unwrapped))
        .with_state(state.clone())
        .merge(pets_api::pet_routes(state))
}

#[tokio::test]
async fn handler_error_rolls_back_its_writes() {
    let (_, state) = test_app(1000).await;
    let app = boundary_routes(state);

    let (status, _) = send(&app, "POST", "/fail", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/pets", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn server_error_status_rolls_back() {
    let (_, state) = test_app(1000).await;
    let app = boundary_routes(state);

    let (status, body) = send(&app, "POST", "/server-error", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!("boom"));

    let (_, body) = send(&app, "GET", "/api/pets", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn successful_handler_commits_all_writes() {
    let (_, state) = test_app(1000).await;
    let app = boundary_routes(state);

    let (status, body) = send(&app, "POST", "/ok", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([1, 2]));

    let (_, body) = send(&app, "GET", "/api/pets", None).await;
    assert_eq!(
        body,
        json!([{"id": 1, "name": "Lala"}, {"id": 2, "name": "Mandy"}])
    );
}

#[tokio::test]
async fn route_without_boundary_is_internal_error() {
    let (_, state) = test_app(1000).await;
    let app = boundary_routes(state);

    let (status, body) = send(&app, "GET", "/unwrapped", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "internal_error");
}

#[tokio::test]
async fn not_found_on_update_leaves_store_unchanged() {
    let (app, state) = test_app(1000).await;
    common::seed(&state, &["Lala"]).await;

    let (status, _) = send(&app, "PUT", "/api/pets/42", Some(json!({"name": "Ghost"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/pets", None).await;
    assert_eq!(body, json!([{"id": 1, "name": "Lala"}]));
}

/// Store double whose begin/commit/rollback/ping can be made to fail.
#[derive(Default)]
struct FlakyStore {
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
    fail_ping: bool,
    calls: Arc<Calls>,
}

#[derive(Default)]
struct Calls {
    inserts: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

struct FlakyTx {
    fail_commit: bool,
    fail_rollback: bool,
    calls: Arc<Calls>,
}

fn store_down() -> AppError {
    AppError::Db(sqlx::Error::PoolClosed)
}

#[async_trait]
impl PetStore for FlakyStore {
    async fn begin(&self) -> Result<Box<dyn PetTransaction>, AppError> {
        if self.fail_begin {
            return Err(store_down());
        }
        Ok(Box::new(FlakyTx {
            fail_commit: self.fail_commit,
            fail_rollback: self.fail_rollback,
            calls: self.calls.clone(),
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        if self.fail_ping {
            return Err(store_down());
        }
        Ok(())
    }
}

#[async_trait]
impl PetRepository for FlakyTx {
    async fn list(&mut self, _start: u32, _max: u32) -> Result<Vec<Pet>, AppError> {
        Ok(Vec::new())
    }

    async fn find_by_id(&mut self, _id: i64) -> Result<Option<Pet>, AppError> {
        Ok(None)
    }

    async fn insert(&mut self, _pet: &NewPet) -> Result<i64, AppError> {
        self.calls.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    async fn update(&mut self, _pet: &Pet) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn delete(&mut self, _id: i64) -> Result<bool, AppError> {
        Ok(false)
    }
}

#[async_trait]
impl PetTransaction for FlakyTx {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.calls.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit {
            return Err(store_down());
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.calls.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.fail_rollback {
            return Err(store_down());
        }
        Ok(())
    }
}

fn flaky_app(store: FlakyStore) -> (Router, Arc<Calls>) {
    let calls = store.calls.clone();
    let state = AppState::new(Arc::new(store), 1000);
    (app(state, 64 * 1024), calls)
}

#[tokio::test]
async fn begin_failure_is_500_and_handler_never_runs() {
    let (app, calls) = flaky_app(FlakyStore {
        fail_begin: true,
        ..Default::default()
    });

    let (status, body) = send(&app, "POST", "/api/pets", Some(json!({"name": "Lala"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "database_error");
    assert_eq!(calls.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn commit_failure_replaces_success_with_500() {
    let (app, calls) = flaky_app(FlakyStore {
        fail_commit: true,
        ..Default::default()
    });

    let (status, body) = send(&app, "POST", "/api/pets", Some(json!({"name": "Lala"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": {"code": "database_error", "message": "database error"}})
    );
    assert_eq!(calls.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
    assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rollback_failure_keeps_handler_error() {
    let (app, calls) = flaky_app(FlakyStore {
        fail_rollback: true,
        ..Default::default()
    });

    let (status, body) = send(&app, "GET", "/api/pets/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(calls.commits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ready_is_503_when_store_does_not_answer() {
    let (app, _) = flaky_app(FlakyStore {
        fail_ping: true,
        ..Default::default()
    });

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"status": "degraded", "database": "unavailable"}));
}
