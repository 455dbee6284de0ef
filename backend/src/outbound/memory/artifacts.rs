//! In-process stores for generated recipes and shopping lists.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{
    RecipeRepository, RecipeRepositoryError, ShoppingListRepository, ShoppingListRepositoryError,
};
use crate::domain::{Recipe, ShoppingList, UserId};

/// Recipe repository backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryRecipeRepository {
    recipes: RwLock<Vec<Recipe>>,
}

#[async_trait]
impl RecipeRepository for InMemoryRecipeRepository {
    async fn save_all(&self, recipes: &[Recipe]) -> Result<(), RecipeRepositoryError> {
        let mut stored = self.recipes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(duplicate) = recipes
            .iter()
            .find(|recipe| stored.iter().any(|existing| existing.id == recipe.id))
        {
            return Err(RecipeRepositoryError::query(format!(
                "recipe {} already exists",
                duplicate.id
            )));
        }
        stored.extend_from_slice(recipes);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Recipe>, RecipeRepositoryError> {
        let stored = self.recipes.read().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<Recipe> = stored
            .iter()
            .rev()
            .filter(|recipe| recipe.user_id == *user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        recipe_id: &Uuid,
    ) -> Result<Option<Recipe>, RecipeRepositoryError> {
        let stored = self.recipes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(stored
            .iter()
            .find(|recipe| recipe.id == *recipe_id && recipe.user_id == *user_id)
            .cloned())
    }
}

/// Shopping list repository backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryShoppingListRepository {
    lists: RwLock<Vec<ShoppingList>>,
}

impl InMemoryShoppingListRepository {
    /// Lists saved for `user_id`, oldest first.
    pub fn lists_for(&self, user_id: &UserId) -> Vec<ShoppingList> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        lists
            .iter()
            .filter(|list| list.user_id == *user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ShoppingListRepository for InMemoryShoppingListRepository {
    async fn save(&self, list: &ShoppingList) -> Result<(), ShoppingListRepositoryError> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        lists.push(list.clone());
        Ok(())
    }
}
