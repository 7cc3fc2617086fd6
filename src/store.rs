//! Pool construction and `pets` table DDL for each store engine.

use crate::config::DatabaseConfig;
use crate::error::{AppError, ConfigError};
use crate::repository::{PetStore, PgPetStore, SqlitePetStore};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, PgPool, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const PG_PETS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS pets (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL
    )
"#;

const SQLITE_PETS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS pets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL
    )
"#;

/// Connect to the store named by `config.url` and make sure the `pets` table exists.
/// `sqlite:` URLs select SQLite; everything else is treated as PostgreSQL.
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn PetStore>, AppError> {
    if config.is_sqlite() {
        let pool = connect_sqlite(&config.url, config.max_connections).await?;
        ensure_sqlite_pets_table(&pool).await?;
        tracing::info!("using sqlite store");
        Ok(Arc::new(SqlitePetStore::new(pool)))
    } else {
        ensure_database_exists(&config.url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        ensure_pg_pets_table(&pool).await?;
        tracing::info!("using postgres store");
        Ok(Arc::new(PgPetStore::new(pool)))
    }
}

/// Open a SQLite pool. An in-memory database lives inside a single connection,
/// so the pool is pinned to exactly one connection that never expires.
pub async fn connect_sqlite(url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = if url.contains(":memory:") || url.contains("mode=memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?
    };
    Ok(pool)
}

/// Fresh in-memory store with the `pets` table in place.
pub async fn in_memory_store() -> Result<SqlitePetStore, AppError> {
    let pool = connect_sqlite("sqlite::memory:", 1).await?;
    ensure_sqlite_pets_table(&pool).await?;
    Ok(SqlitePetStore::new(pool))
}

pub async fn ensure_pg_pets_table(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(PG_PETS_DDL).execute(pool).await?;
    Ok(())
}

pub async fn ensure_sqlite_pets_table(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(SQLITE_PETS_DDL).execute(pool).await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
/// URLs without a database path are left to the server's default database.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let Some(target) = admin_target(database_url)? else {
        return Ok(());
    };
    if target.db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&target.admin_url).map_err(|_| invalid_url(database_url))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&target.db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %target.db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&target.db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Maintenance-database URL plus the database name taken from a PostgreSQL URL.
#[derive(Debug, PartialEq, Eq)]
struct AdminTarget {
    admin_url: String,
    db_name: String,
}

fn invalid_url(url: &str) -> ConfigError {
    ConfigError::Invalid {
        key: "DATABASE_URL",
        value: url.to_string(),
    }
}

/// `None` when the URL names no database. The query string (socket host, sslmode, ...)
/// is carried over to the admin URL.
fn admin_target(url: &str) -> Result<Option<AdminTarget>, ConfigError> {
    let (main, query) = match url.split_once('?') {
        Some((main, query)) => (main, Some(query)),
        None => (url, None),
    };
    let scheme_end = main.find("://").map(|i| i + 3).ok_or_else(|| invalid_url(url))?;
    let Some(slash) = main[scheme_end..].find('/') else {
        return Ok(None);
    };
    let path_start = scheme_end + slash + 1;
    let db_name = main[path_start..].trim();
    if db_name.is_empty() {
        return Ok(None);
    }
    let mut admin_url = format!("{}postgres", &main[..path_start]);
    if let Some(query) = query {
        admin_url.push('?');
        admin_url.push_str(query);
    }
    Ok(Some(AdminTarget {
        admin_url,
        db_name: db_name.to_string(),
    }))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
