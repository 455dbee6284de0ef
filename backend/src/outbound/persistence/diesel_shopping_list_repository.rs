//! PostgreSQL-backed `ShoppingListRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};

use crate::domain::ShoppingList;
use crate::domain::ports::{ShoppingListRepository, ShoppingListRepositoryError};

use super::diesel_helpers::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewShoppingListItemRow, NewShoppingListRow};
use super::pool::{DbPool, PoolError};
use super::schema::{shopping_list_items, shopping_lists};

/// Diesel-backed implementation of the `ShoppingListRepository` port.
#[derive(Clone)]
pub struct DieselShoppingListRepository {
    pool: DbPool,
}

impl DieselShoppingListRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ShoppingListRepositoryError {
    map_basic_pool_error(error, ShoppingListRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ShoppingListRepositoryError {
    map_basic_diesel_error(
        error,
        ShoppingListRepositoryError::query,
        ShoppingListRepositoryError::connection,
    )
}

fn list_row(list: &ShoppingList) -> NewShoppingListRow<'_> {
    NewShoppingListRow {
        id: list.id,
        user_id: *list.user_id.as_uuid(),
        pantry_id: list.pantry_id.map(|id| *id.as_uuid()),
        name: &list.name,
        reasoning: list.reasoning.as_deref(),
        estimated_total: list.estimated_total,
        generated_by_ai: list.generated_by_ai,
        created_at: list.created_at,
        updated_at: list.updated_at,
    }
}

fn item_rows(list: &ShoppingList) -> Vec<NewShoppingListItemRow<'_>> {
    list.items
        .iter()
        .zip(0_i32..)
        .map(|(item, position)| NewShoppingListItemRow {
            id: item.id,
            list_id: list.id,
            position,
            name: &item.name,
            quantity: item.quantity,
            unit: &item.unit,
            estimated_price: item.estimated_price,
            category: &item.category,
            priority: item.priority,
            reason: &item.reason,
            purchased: item.purchased,
        })
        .collect()
}

#[async_trait]
impl ShoppingListRepository for DieselShoppingListRepository {
    async fn save(&self, list: &ShoppingList) -> Result<(), ShoppingListRepositoryError> {
        let header = list_row(list);
        let lines = item_rows(list);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::insert_into(shopping_lists::table)
                    .values(&header)
                    .execute(conn)
                    .await?;
                if !lines.is_empty() {
                    diesel::insert_into(shopping_list_items::table)
                        .values(&lines)
                        .execute(conn)
                        .await?;
                }
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
