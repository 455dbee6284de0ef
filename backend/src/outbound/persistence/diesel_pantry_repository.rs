//! PostgreSQL-backed `PantryRepository` implementation using Diesel ORM.
//!
//! Every read filters `deleted_at IS NULL`. Membership uniqueness among live
//! rows is enforced by the `pantry_memberships_live_key` partial index, so a
//! concurrent double add surfaces as a unique violation and is re-read.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{PantryRepository, PantryRepositoryError};
use crate::domain::{
    Ingredient, MembershipChange, MembershipRole, Pantry, PantryId, PantryMembership, UserId,
};

use super::diesel_helpers::{
    collect_rows, is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{ItemRow, MembershipRow, NewMembershipRow, NewPantryRow, PantryRow};
use super::pool::{DbPool, PoolError};
use super::schema::{items, pantries, pantry_memberships};

/// Diesel-backed implementation of the `PantryRepository` port.
#[derive(Clone)]
pub struct DieselPantryRepository {
    pool: DbPool,
}

impl DieselPantryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PantryRepositoryError {
    map_basic_pool_error(error, PantryRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> PantryRepositoryError {
    map_basic_diesel_error(
        error,
        PantryRepositoryError::query,
        PantryRepositoryError::connection,
    )
}

fn row_to_pantry(row: PantryRow) -> Pantry {
    Pantry {
        id: PantryId::from(row.id),
        owner_id: UserId::from(row.owner_id),
        name: row.name,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_membership(row: MembershipRow) -> Result<PantryMembership, String> {
    let role = MembershipRole::parse(&row.role)
        .ok_or_else(|| format!("unknown membership role `{}` on {}", row.role, row.id))?;
    Ok(PantryMembership {
        id: row.id,
        pantry_id: PantryId::from(row.pantry_id),
        user_id: UserId::from(row.user_id),
        role,
    })
}

fn row_to_ingredient(row: ItemRow) -> Ingredient {
    Ingredient {
        id: row.id,
        name: row.name,
        quantity: row.quantity,
        unit: row.unit,
        price_per_unit: row.price_per_unit,
        expires_at: row.expires_at,
    }
    .normalised()
}

async fn live_membership(
    conn: &mut AsyncPgConnection,
    pantry_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MembershipRow>, diesel::result::Error> {
    pantry_memberships::table
        .filter(pantry_memberships::pantry_id.eq(pantry_id))
        .filter(pantry_memberships::user_id.eq(user_id))
        .filter(pantry_memberships::deleted_at.is_null())
        .select(MembershipRow::as_select())
        .first(conn)
        .await
        .optional()
}

async fn pantry_is_live(
    conn: &mut AsyncPgConnection,
    pantry_id: Uuid,
) -> Result<bool, diesel::result::Error> {
    diesel::select(diesel::dsl::exists(
        pantries::table
            .filter(pantries::id.eq(pantry_id))
            .filter(pantries::deleted_at.is_null()),
    ))
    .get_result(conn)
    .await
}

fn membership_or_query_error(row: MembershipRow) -> Result<PantryMembership, PantryRepositoryError> {
    row_to_membership(row).map_err(PantryRepositoryError::query)
}

#[async_trait]
impl PantryRepository for DieselPantryRepository {
    async fn find_pantry(&self, pantry_id: &PantryId) -> Result<Option<Pantry>, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PantryRow> = pantries::table
            .filter(pantries::id.eq(pantry_id.as_uuid()))
            .filter(pantries::deleted_at.is_null())
            .select(PantryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_pantry))
    }

    async fn membership_role(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRole>, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let role: Option<String> = pantry_memberships::table
            .inner_join(pantries::table)
            .filter(pantry_memberships::pantry_id.eq(pantry_id.as_uuid()))
            .filter(pantry_memberships::user_id.eq(user_id.as_uuid()))
            .filter(pantry_memberships::deleted_at.is_null())
            .filter(pantries::deleted_at.is_null())
            .select(pantry_memberships::role)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        role.map(|raw| {
            MembershipRole::parse(&raw)
                .ok_or_else(|| PantryRepositoryError::query(format!("unknown membership role `{raw}`")))
        })
        .transpose()
    }

    async fn list_ingredients(
        &self,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ItemRow> = items::table
            .filter(items::pantry_id.eq(pantry_id.as_uuid()))
            .filter(items::deleted_at.is_null())
            .filter(items::quantity.gt(0.0))
            .select(ItemRow::as_select())
            .order_by((items::name.asc(), items::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_ingredient).collect())
    }

    async fn create_pantry(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<Pantry, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owner_id = *owner_id.as_uuid();
        let row = conn
            .transaction(|conn| {
                async move {
                    let pantry = NewPantryRow {
                        id: Uuid::new_v4(),
                        owner_id,
                        name,
                    };
                    let row = diesel::insert_into(pantries::table)
                        .values(&pantry)
                        .returning(PantryRow::as_returning())
                        .get_result(conn)
                        .await?;
                    diesel::insert_into(pantry_memberships::table)
                        .values(&NewMembershipRow {
                            id: Uuid::new_v4(),
                            pantry_id: row.id,
                            user_id: owner_id,
                            role: MembershipRole::Owner.as_str(),
                        })
                        .execute(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_pantry(row))
    }

    async fn add_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<MembershipChange, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (pantry, user) = (*pantry_id.as_uuid(), *user_id.as_uuid());
        if !pantry_is_live(&mut conn, pantry)
            .await
            .map_err(map_diesel_error)?
        {
            return Err(PantryRepositoryError::pantry_not_found(*pantry_id));
        }
        if let Some(row) = live_membership(&mut conn, pantry, user)
            .await
            .map_err(map_diesel_error)?
        {
            return Ok(MembershipChange::Unchanged(membership_or_query_error(row)?));
        }

        let inserted = diesel::insert_into(pantry_memberships::table)
            .values(&NewMembershipRow {
                id: Uuid::new_v4(),
                pantry_id: pantry,
                user_id: user,
                role: MembershipRole::Member.as_str(),
            })
            .returning(MembershipRow::as_returning())
            .get_result(&mut conn)
            .await;
        match inserted {
            Ok(row) => Ok(MembershipChange::Added(membership_or_query_error(row)?)),
            Err(error) if is_unique_violation(&error) => {
                let row = live_membership(&mut conn, pantry, user)
                    .await
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| PantryRepositoryError::query("membership vanished after conflict"))?;
                Ok(MembershipChange::Unchanged(membership_or_query_error(row)?))
            }
            Err(error) => Err(map_diesel_error(error)),
        }
    }

    async fn remove_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<PantryMembership>, PantryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MembershipRow> = diesel::update(
            pantry_memberships::table
                .filter(pantry_memberships::pantry_id.eq(pantry_id.as_uuid()))
                .filter(pantry_memberships::user_id.eq(user_id.as_uuid()))
                .filter(pantry_memberships::deleted_at.is_null()),
        )
        .set(pantry_memberships::deleted_at.eq(diesel::dsl::now))
        .returning(MembershipRow::as_returning())
        .get_results(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        let mut removed = collect_rows(
            rows.into_iter().map(row_to_membership),
            PantryRepositoryError::query,
        )?;
        Ok(removed.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn item_rows_are_trimmed() {
        let ingredient = row_to_ingredient(ItemRow {
            id: Uuid::new_v4(),
            name: "  Rice ".to_owned(),
            quantity: 2.0,
            unit: " kg ".to_owned(),
            price_per_unit: 1.5,
            expires_at: None,
        });
        assert_eq!((ingredient.name.as_str(), ingredient.unit.as_str()), ("Rice", "kg"));
    }

    #[rstest]
    fn unknown_roles_are_query_errors() {
        let row = MembershipRow {
            id: Uuid::new_v4(),
            pantry_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: "guest".to_owned(),
        };
        let error = membership_or_query_error(row).expect_err("unknown role");
        assert!(matches!(error, PantryRepositoryError::Query { .. }));
    }

    #[rstest]
    fn pool_errors_map_to_connection() {
        let error = map_pool_error(PoolError::checkout("refused"));
        assert!(matches!(error, PantryRepositoryError::Connection { .. }));
        assert!(error.to_string().contains("refused"));
    }
}
