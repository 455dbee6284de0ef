//! In-process adapters.
//!
//! Used when no database is configured in debug builds and by the
//! integration suite. They apply the same domain rules as the PostgreSQL
//! adapters, including the ledger plan and soft-deleted memberships.

mod artifacts;
mod credits;
mod pantries;
mod scripted_llm;

pub use artifacts::{InMemoryRecipeRepository, InMemoryShoppingListRepository};
pub use credits::InMemoryCreditRepository;
pub use pantries::InMemoryPantryRepository;
pub use scripted_llm::ScriptedLlmProvider;
