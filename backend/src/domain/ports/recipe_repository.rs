//! Port for recipe persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Recipe, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by recipe repository adapters.
    pub enum RecipeRepositoryError {
        /// Connection could not be established.
        Connection { message: String } => "recipe repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "recipe repository query failed: {message}",
    }
}

/// Port for storing recipes owned by users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert every recipe in one transaction; either all rows land or none.
    async fn save_all(&self, recipes: &[Recipe]) -> Result<(), RecipeRepositoryError>;

    /// Recipes owned by `user_id`, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Recipe>, RecipeRepositoryError>;

    /// One recipe, only when `user_id` owns it.
    async fn find_for_user(
        &self,
        user_id: &UserId,
        recipe_id: &Uuid,
    ) -> Result<Option<Recipe>, RecipeRepositoryError>;
}
