//! Transaction per request: open a scope before the handler runs, commit or roll back after.
//!
//! The middleware parks the open scope in request extensions; handlers take it with the
//! [`Tx`] extractor. Once the handler's response is built, the scope comes back to the
//! middleware, which commits unless the response carries [`HandlerFailed`] or a 5xx status.

use crate::error::{AppError, HandlerFailed};
use crate::repository::PetTransaction;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Option<Box<dyn PetTransaction>>;

/// Request-extension handle to the open scope.
#[derive(Clone)]
pub struct TxSlot(Arc<Mutex<Slot>>);

impl TxSlot {
    fn new(tx: Box<dyn PetTransaction>) -> Self {
        TxSlot(Arc::new(Mutex::new(Some(tx))))
    }

    async fn take(&self) -> Slot {
        self.0.lock().await.take()
    }
}

/// Middleware for routes whose handlers use [`Tx`].
pub async fn transaction_per_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let tx = match state.store.begin().await {
        Ok(tx) => tx,
        Err(e) => return e.into_response(),
    };
    let slot = TxSlot::new(tx);
    req.extensions_mut().insert(slot.clone());

    let response = next.run(req).await;

    let Some(tx) = slot.take().await else {
        tracing::warn!("transaction scope missing after handler");
        return response;
    };
    let failed = response.extensions().get::<HandlerFailed>().is_some()
        || response.status().is_server_error();
    if failed {
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "rollback failed");
        } else {
            tracing::debug!(status = %response.status(), "transaction rolled back");
        }
        response
    } else {
        match tx.commit().await {
            Ok(()) => {
                tracing::debug!(status = %response.status(), "transaction committed");
                response
            }
            Err(e) => e.into_response(),
        }
    }
}

/// The request's transaction scope. Holds the scope for as long as the extractor lives.
pub struct Tx(OwnedMutexGuard<Slot>);

impl Tx {
    pub fn repo(&mut self) -> Result<&mut (dyn PetTransaction + 'static), AppError> {
        self.0
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("transaction scope already finished".into()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Tx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let slot = parts
            .extensions
            .get::<TxSlot>()
            .cloned()
            .ok_or_else(|| AppError::Internal("route is not wrapped in a transaction".into()))?;
        Ok(Tx(slot.0.lock_owned().await))
    }
}
