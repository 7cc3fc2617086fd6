//! Pets API: transactional CRUD REST service for a single `pets` table.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pet;
pub mod repository;
pub mod routes;
pub mod state;
pub mod store;
pub mod transaction;

pub use config::{DatabaseConfig, ServerConfig};
pub use error::{AppError, ConfigError};
pub use pet::{NewPet, Pet};
pub use repository::{PetRepository, PetStore, PetTransaction, PgPetStore, SqlitePetStore};
pub use routes::{app, common_routes, pet_routes};
pub use state::AppState;
pub use store::{connect_store, ensure_database_exists, in_memory_store};
pub use transaction::{transaction_per_request, Tx};
