//! Driving port for pantry authorisation and the ingredient reader.

use async_trait::async_trait;

use crate::domain::{Error, Ingredient, MembershipChange, Pantry, PantryId, PantryMembership, UserId};

/// Pantry use-cases gated by membership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PantryAccess: Send + Sync {
    /// Whether `user_id` holds a live membership row of any role.
    async fn is_member(&self, pantry_id: &PantryId, user_id: &UserId) -> Result<bool, Error>;

    /// Whether `user_id` holds the live `owner` row.
    async fn is_owner(&self, pantry_id: &PantryId, user_id: &UserId) -> Result<bool, Error>;

    /// Non-zero-quantity items of a pantry the actor belongs to.
    ///
    /// Fails with `NOT_FOUND` for an unknown pantry and `FORBIDDEN` for a
    /// non-member.
    async fn list_ingredients(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, Error>;

    /// Create a pantry owned by `owner_id`.
    async fn create_pantry(&self, owner_id: &UserId, name: &str) -> Result<Pantry, Error>;

    /// Add `user_id` as a member. Owner only; idempotent.
    async fn add_member(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<MembershipChange, Error>;

    /// Remove `user_id` from the pantry. Owner only; the owner cannot remove
    /// themself.
    async fn remove_member(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<PantryMembership, Error>;
}
