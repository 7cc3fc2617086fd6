//! Pet repository: the five pet statements, one implementation per store engine.
//!
//! A [`PetStore`] opens [`PetTransaction`] scopes; every repository call runs inside one.
//! Dropping a scope without calling `commit` rolls it back.

mod postgres;
mod sqlite;

pub use postgres::{PgPetStore, PgPetTransaction};
pub use sqlite::{SqlitePetStore, SqlitePetTransaction};

use crate::error::AppError;
use crate::pet::{NewPet, Pet};
use async_trait::async_trait;

/// CRUD statements for the `pets` table.
#[async_trait]
pub trait PetRepository: Send {
    /// Pets ordered by id, skipping `start` rows and returning at most `max`.
    async fn list(&mut self, start: u32, max: u32) -> Result<Vec<Pet>, AppError>;

    async fn find_by_id(&mut self, id: i64) -> Result<Option<Pet>, AppError>;

    /// Insert a row and return the id the store assigned to it.
    async fn insert(&mut self, pet: &NewPet) -> Result<i64, AppError>;

    /// Replace the name of `pet.id`. `false` when no such row exists.
    async fn update(&mut self, pet: &Pet) -> Result<bool, AppError>;

    /// `false` when no such row exists.
    async fn delete(&mut self, id: i64) -> Result<bool, AppError>;
}

/// An open transaction that also serves as the repository for its statements.
#[async_trait]
pub trait PetTransaction: PetRepository {
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Connection pool for one store engine.
#[async_trait]
pub trait PetStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn PetTransaction>, AppError>;

    /// Round trip to the store, used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) const SELECT_PETS: &str = "SELECT id, name FROM pets";
