//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL through `diesel-async` and `bb8` pooling.
//!
//! - Repository implementations only translate between Diesel rows and
//!   domain types; ledger arithmetic stays in the domain.
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) never
//!   leave this module.
//! - Every database failure is mapped to the owning port's error type.
//!
//! # Example
//!
//! ```ignore
//! use pantry_backend::outbound::persistence::{DbPool, DieselCreditRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/pantry")).await?;
//! let credits = DieselCreditRepository::new(pool);
//! ```

mod diesel_credit_repository;
pub(crate) mod diesel_helpers;
mod diesel_pantry_repository;
mod diesel_recipe_repository;
mod diesel_shopping_list_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_credit_repository::DieselCreditRepository;
pub use diesel_pantry_repository::DieselPantryRepository;
pub use diesel_recipe_repository::DieselRecipeRepository;
pub use diesel_shopping_list_repository::DieselShoppingListRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
