//! Saved-recipe service implementing [`RecipeBook`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ports::{RecipeBook, RecipeRepository, RecipeRepositoryError};
use crate::domain::{Error, GeneratedRecipe, Recipe, UserId};

/// Map recipe repository failures onto domain errors.
pub(crate) fn map_recipe_repository_error(error: RecipeRepositoryError) -> Error {
    debug!(kind = error.kind(), %error, "recipe repository call failed");
    match error {
        RecipeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("recipe store unavailable: {message}"))
        }
        RecipeRepositoryError::Query { message } => {
            Error::internal(format!("recipe store error: {message}"))
        }
    }
}

/// Ownership-scoped recipe storage.
#[derive(Clone)]
pub struct RecipeService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> RecipeService<R> {
    /// Create a new service over the given repository.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

#[async_trait]
impl<R> RecipeBook for RecipeService<R>
where
    R: RecipeRepository,
{
    async fn save_recipes(
        &self,
        user_id: &UserId,
        recipes: Vec<GeneratedRecipe>,
    ) -> Result<Vec<Recipe>, Error> {
        if recipes.is_empty() {
            return Err(Error::invalid_request("at least one recipe is required"));
        }
        let now = self.clock.utc();
        let recipes = recipes
            .into_iter()
            .enumerate()
            .map(|(index, recipe)| {
                recipe.into_saved_recipe(*user_id, now).map_err(|err| {
                    let details = json!({ "field": "title", "index": index });
                    err.with_details(details)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.repo
            .save_all(&recipes)
            .await
            .map_err(map_recipe_repository_error)?;
        info!(user_id = %user_id, count = recipes.len(), "saved recipes");
        Ok(recipes)
    }

    async fn list_recipes(&self, user_id: &UserId) -> Result<Vec<Recipe>, Error> {
        self.repo
            .list_for_user(user_id)
            .await
            .map_err(map_recipe_repository_error)
    }

    async fn get_recipe(&self, user_id: &UserId, recipe_id: &Uuid) -> Result<Recipe, Error> {
        self.repo
            .find_for_user(user_id, recipe_id)
            .await
            .map_err(map_recipe_repository_error)?
            .ok_or_else(|| {
                Error::not_found("recipe not found").with_details(json!({ "recipe_id": recipe_id }))
            })
    }
}
