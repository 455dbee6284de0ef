//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, language model providers) expose typed errors
//! generated by [`define_port_error!`]. Driving ports (ledger, pantry access,
//! recipe book, metered AI) speak [`crate::domain::Error`] so inbound adapters
//! map one error type.

mod macros;
pub(crate) use macros::define_port_error;

mod credit_ledger;
mod credit_repository;
mod llm_provider;
mod metered_ai;
mod pantry_access;
mod pantry_repository;
mod recipe_book;
mod recipe_repository;
mod shopping_list_repository;

#[cfg(test)]
pub use credit_ledger::MockCreditLedger;
pub use credit_ledger::CreditLedger;
#[cfg(test)]
pub use credit_repository::MockCreditRepository;
pub use credit_repository::{CreditRepository, CreditRepositoryError, WalletCreation};
#[cfg(test)]
pub use llm_provider::MockLlmProvider;
pub use llm_provider::{LlmProvider, LlmProviderError};
#[cfg(test)]
pub use metered_ai::MockMeteredAi;
pub use metered_ai::{CallContext, ChatCommand, ChatReply, MeteredAi};
#[cfg(test)]
pub use pantry_access::MockPantryAccess;
pub use pantry_access::PantryAccess;
#[cfg(test)]
pub use pantry_repository::MockPantryRepository;
pub use pantry_repository::{PantryRepository, PantryRepositoryError};
#[cfg(test)]
pub use recipe_book::MockRecipeBook;
pub use recipe_book::RecipeBook;
#[cfg(test)]
pub use recipe_repository::MockRecipeRepository;
pub use recipe_repository::{RecipeRepository, RecipeRepositoryError};
#[cfg(test)]
pub use shopping_list_repository::MockShoppingListRepository;
pub use shopping_list_repository::{ShoppingListRepository, ShoppingListRepositoryError};

#[cfg(test)]
mod tests;
