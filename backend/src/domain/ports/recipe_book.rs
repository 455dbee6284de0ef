//! Driving port for the caller's saved recipes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Error, GeneratedRecipe, Recipe, UserId};

/// Recipe use-cases that do not touch the ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipeBook: Send + Sync {
    /// Persist client-supplied recipes atomically under the caller's
    /// ownership.
    async fn save_recipes(
        &self,
        user_id: &UserId,
        recipes: Vec<GeneratedRecipe>,
    ) -> Result<Vec<Recipe>, Error>;

    /// The caller's recipes, newest first.
    async fn list_recipes(&self, user_id: &UserId) -> Result<Vec<Recipe>, Error>;

    /// One recipe; `NOT_FOUND` unless the caller owns it.
    async fn get_recipe(&self, user_id: &UserId, recipe_id: &Uuid) -> Result<Recipe, Error>;
}
