//! Port for shopping list persistence.

use async_trait::async_trait;

use crate::domain::ShoppingList;

use super::define_port_error;

define_port_error! {
    /// Errors raised by shopping list repository adapters.
    pub enum ShoppingListRepositoryError {
        /// Connection could not be established.
        Connection { message: String } => "shopping list repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "shopping list repository query failed: {message}",
    }
}

/// Port for storing generated shopping lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShoppingListRepository: Send + Sync {
    /// Insert the list and its items in one transaction.
    async fn save(&self, list: &ShoppingList) -> Result<(), ShoppingListRepositoryError>;
}
