//! SQLite store, used for embedded and in-memory deployments and by the test suite.

use super::{PetRepository, PetStore, PetTransaction, SELECT_PETS};
use crate::error::AppError;
use crate::pet::{NewPet, Pet};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

#[derive(Clone)]
pub struct SqlitePetStore {
    pool: SqlitePool,
}

impl SqlitePetStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePetStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PetStore for SqlitePetStore {
    async fn begin(&self) -> Result<Box<dyn PetTransaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqlitePetTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub struct SqlitePetTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl PetRepository for SqlitePetTransaction {
    async fn list(&mut self, start: u32, max: u32) -> Result<Vec<Pet>, AppError> {
        let sql = format!("{} ORDER BY id LIMIT ? OFFSET ?", SELECT_PETS);
        tracing::debug!(sql = %sql, start, max, "query");
        let rows: Vec<(i64, String)> = sqlx::query_as(&sql)
            .bind(i64::from(max))
            .bind(i64::from(start))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Pet::from).collect())
    }

    async fn find_by_id(&mut self, id: i64) -> Result<Option<Pet>, AppError> {
        let sql = format!("{} WHERE id = ?", SELECT_PETS);
        tracing::debug!(sql = %sql, id, "query");
        let row: Option<(i64, String)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Pet::from))
    }

    async fn insert(&mut self, pet: &NewPet) -> Result<i64, AppError> {
        let sql = "INSERT INTO pets (name) VALUES (?)";
        tracing::debug!(sql = %sql, name = %pet.name, "query");
        let result = sqlx::query(sql)
            .bind(&pet.name)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&mut self, pet: &Pet) -> Result<bool, AppError> {
        let sql = "UPDATE pets SET name = ? WHERE id = ?";
        tracing::debug!(sql = %sql, id = pet.id, name = %pet.name, "query");
        let result = sqlx::query(sql)
            .bind(&pet.name)
            .bind(pet.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&mut self, id: i64) -> Result<bool, AppError> {
        let sql = "DELETE FROM pets WHERE id = ?";
        tracing::debug!(sql = %sql, id, "query");
        let result = sqlx::query(sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PetTransaction for SqlitePetTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let SqlitePetTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let SqlitePetTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
