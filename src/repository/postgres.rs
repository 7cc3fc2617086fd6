//! PostgreSQL store.

use super::{PetRepository, PetStore, PetTransaction, SELECT_PETS};
use crate::error::AppError;
use crate::pet::{NewPet, Pet};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct PgPetStore {
    pool: PgPool,
}

impl PgPetStore {
    pub fn new(pool: PgPool) -> Self {
        PgPetStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PetStore for PgPetStore {
    async fn begin(&self) -> Result<Box<dyn PetTransaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgPetTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub struct PgPetTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PetRepository for PgPetTransaction {
    async fn list(&mut self, start: u32, max: u32) -> Result<Vec<Pet>, AppError> {
        let sql = format!("{} ORDER BY id LIMIT $1 OFFSET $2", SELECT_PETS);
        tracing::debug!(sql = %sql, start, max, "query");
        let rows: Vec<(i64, String)> = sqlx::query_as(&sql)
            .bind(i64::from(max))
            .bind(i64::from(start))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Pet::from).collect())
    }

    async fn find_by_id(&mut self, id: i64) -> Result<Option<Pet>, AppError> {
        let sql = format!("{} WHERE id = $1", SELECT_PETS);
        tracing::debug!(sql = %sql, id, "query");
        let row: Option<(i64, String)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Pet::from))
    }

    async fn insert(&mut self, pet: &NewPet) -> Result<i64, AppError> {
        let sql = "INSERT INTO pets (name) VALUES ($1) RETURNING id";
        tracing::debug!(sql = %sql, name = %pet.name, "query");
        let (id,): (i64,) = sqlx::query_as(sql)
            .bind(&pet.name)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, pet: &Pet) -> Result<bool, AppError> {
        let sql = "UPDATE pets SET name = $1 WHERE id = $2";
        tracing::debug!(sql = %sql, id = pet.id, name = %pet.name, "query");
        let result = sqlx::query(sql)
            .bind(&pet.name)
            .bind(pet.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&mut self, id: i64) -> Result<bool, AppError> {
        let sql = "DELETE FROM pets WHERE id = $1";
        tracing::debug!(sql = %sql, id, "query");
        let result = sqlx::query(sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PetTransaction for PgPetTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgPetTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let PgPetTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
