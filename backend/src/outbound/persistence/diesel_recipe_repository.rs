//! PostgreSQL-backed `RecipeRepository` implementation using Diesel ORM.
//!
//! Nested recipe parts (ingredients, steps, tips, nutrition) live in JSONB
//! columns; enums are stored by their lowercase label.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::ports::{RecipeRepository, RecipeRepositoryError};
use crate::domain::{Difficulty, MealType, Recipe, UserId};

use super::diesel_helpers::{collect_rows, map_basic_diesel_error, map_basic_pool_error};
use super::models::RecipeRow;
use super::pool::{DbPool, PoolError};
use super::schema::recipes;

/// Diesel-backed implementation of the `RecipeRepository` port.
#[derive(Clone)]
pub struct DieselRecipeRepository {
    pool: DbPool,
}

impl DieselRecipeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RecipeRepositoryError {
    map_basic_pool_error(error, RecipeRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> RecipeRepositoryError {
    map_basic_diesel_error(
        error,
        RecipeRepositoryError::query,
        RecipeRepositoryError::connection,
    )
}

fn to_json<T: Serialize>(field: &str, value: &T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|error| format!("failed to encode {field}: {error}"))
}

fn from_json<T: DeserializeOwned>(field: &str, value: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|error| format!("failed to decode {field}: {error}"))
}

fn recipe_to_row(recipe: &Recipe) -> Result<RecipeRow, String> {
    Ok(RecipeRow {
        id: recipe.id,
        user_id: *recipe.user_id.as_uuid(),
        title: recipe.title.clone(),
        description: recipe.description.clone(),
        ingredients: to_json("ingredients", &recipe.ingredients)?,
        instructions: to_json("instructions", &recipe.instructions)?,
        cooking_time: recipe.cooking_time,
        preparation_time: recipe.preparation_time,
        total_time: recipe.total_time,
        serving_size: recipe.serving_size,
        difficulty: recipe.difficulty.map(|d| d.as_str().to_owned()),
        meal_type: recipe.meal_type.map(|m| m.as_str().to_owned()),
        cuisine: recipe.cuisine.clone(),
        dietary_restrictions: to_json("dietary_restrictions", &recipe.dietary_restrictions)?,
        nutrition: recipe
            .nutrition
            .as_ref()
            .map(|nutrition| to_json("nutrition", nutrition))
            .transpose()?,
        tips: to_json("tips", &recipe.tips)?,
        generated_at: recipe.generated_at,
        created_at: recipe.created_at,
        updated_at: recipe.updated_at,
    })
}

fn row_to_recipe(row: RecipeRow) -> Result<Recipe, String> {
    // Unknown labels degrade to `None` rather than hiding the recipe.
    let difficulty = row.difficulty.as_deref().and_then(Difficulty::parse);
    let meal_type = row.meal_type.as_deref().and_then(MealType::parse);
    Ok(Recipe {
        id: row.id,
        user_id: UserId::from(row.user_id),
        title: row.title,
        description: row.description,
        ingredients: from_json("ingredients", row.ingredients)?,
        instructions: from_json("instructions", row.instructions)?,
        cooking_time: row.cooking_time,
        preparation_time: row.preparation_time,
        total_time: row.total_time,
        serving_size: row.serving_size,
        difficulty,
        meal_type,
        cuisine: row.cuisine,
        dietary_restrictions: from_json("dietary_restrictions", row.dietary_restrictions)?,
        nutrition: row
            .nutrition
            .map(|value| from_json("nutrition", value))
            .transpose()?,
        tips: from_json("tips", row.tips)?,
        generated_at: row.generated_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl RecipeRepository for DieselRecipeRepository {
    async fn save_all(&self, recipes: &[Recipe]) -> Result<(), RecipeRepositoryError> {
        if recipes.is_empty() {
            return Ok(());
        }
        let rows = collect_rows(
            recipes.iter().map(recipe_to_row),
            RecipeRepositoryError::query,
        )?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::insert_into(recipes::table)
                    .values(&rows)
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Recipe>, RecipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RecipeRow> = recipes::table
            .filter(recipes::user_id.eq(user_id.as_uuid()))
            .select(RecipeRow::as_select())
            .order_by((recipes::created_at.desc(), recipes::id.desc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows.into_iter().map(row_to_recipe), RecipeRepositoryError::query)
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        recipe_id: &Uuid,
    ) -> Result<Option<Recipe>, RecipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<RecipeRow> = recipes::table
            .filter(recipes::id.eq(recipe_id))
            .filter(recipes::user_id.eq(user_id.as_uuid()))
            .select(RecipeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_recipe)
            .transpose()
            .map_err(RecipeRepositoryError::query)
    }
}
