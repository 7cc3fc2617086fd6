//! Pet CRUD handlers. Each runs inside the request's transaction scope.

use crate::error::AppError;
use crate::pet::{NewPet, Pet, PetBody};
use crate::repository::PetRepository;
use crate::state::AppState;
use crate::transaction::Tx;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::collections::HashMap;

pub const DEFAULT_START: u32 = 0;
pub const DEFAULT_MAX: u32 = 20;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid id: {}", id_str)))
}

fn parse_param(params: &HashMap<String, String>, name: &str, default: u32) -> Result<u32, AppError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid {}: {}", name, v))),
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// GET /api/pets?start=&max= — pets ordered by id.
pub async fn list(
    State(state): State<AppState>,
    mut tx: Tx,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Pet>>, AppError> {
    let start = parse_param(&params, "start", DEFAULT_START)?;
    let max = parse_param(&params, "max", DEFAULT_MAX)?.min(state.max_page_size);
    let pets = tx.repo()?.list(start, max).await?;
    Ok(Json(pets))
}

/// GET /api/pets/:id
pub async fn read(mut tx: Tx, Path(id_str): Path<String>) -> Result<Json<Pet>, AppError> {
    let id = parse_id(&id_str)?;
    let pet = tx
        .repo()?
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pet {}", id)))?;
    Ok(Json(pet))
}

/// POST /api/pets — any id in the body is ignored; the store assigns one.
pub async fn create(
    mut tx: Tx,
    payload: Result<Json<NewPet>, JsonRejection>,
) -> Result<Json<Pet>, AppError> {
    let new_pet = body(payload)?;
    let id = tx.repo()?.insert(&new_pet).await?;
    Ok(Json(new_pet.with_id(id)))
}

/// PUT /api/pets — the body addresses the pet by id.
pub async fn update(
    mut tx: Tx,
    payload: Result<Json<PetBody>, JsonRejection>,
) -> Result<Json<Pet>, AppError> {
    let PetBody { id, name } = body(payload)?;
    let id = id.ok_or_else(|| AppError::Validation("body must include 'id'".into()))?;
    save(&mut tx, Pet { id, name }).await
}

/// PUT /api/pets/:id — the path addresses the pet; a body id, if present, must agree.
pub async fn update_by_id(
    mut tx: Tx,
    Path(id_str): Path<String>,
    payload: Result<Json<PetBody>, JsonRejection>,
) -> Result<Json<Pet>, AppError> {
    let id = parse_id(&id_str)?;
    let PetBody { id: body_id, name } = body(payload)?;
    if matches!(body_id, Some(b) if b != id) {
        return Err(AppError::Validation(format!(
            "body id does not match path id {}",
            id
        )));
    }
    save(&mut tx, Pet { id, name }).await
}

async fn save(tx: &mut Tx, pet: Pet) -> Result<Json<Pet>, AppError> {
    if !tx.repo()?.update(&pet).await? {
        return Err(AppError::NotFound(format!("pet {}", pet.id)));
    }
    Ok(Json(pet))
}

/// DELETE /api/pets/:id — 204 on success.
pub async fn delete(mut tx: Tx, Path(id_str): Path<String>) -> Result<StatusCode, AppError> {
    let id = parse_id(&id_str)?;
    if !tx.repo()?.delete(id).await? {
        return Err(AppError::NotFound(format!("pet {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
