//! Port for pantry, membership, and item persistence.
//!
//! Every read filters soft-deleted rows. Membership uniqueness holds only
//! among live rows, so a removed member can be re-added.

use async_trait::async_trait;

use crate::domain::{
    Ingredient, MembershipChange, MembershipRole, Pantry, PantryId, PantryMembership, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by pantry repository adapters.
    pub enum PantryRepositoryError {
        /// Connection could not be established.
        Connection { message: String } => "pantry repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "pantry repository query failed: {message}",
        /// The pantry does not exist or is soft-deleted.
        PantryNotFound { pantry_id: PantryId } => "pantry {pantry_id} not found",
    }
}

/// Port for pantry storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PantryRepository: Send + Sync {
    /// Fetch a live pantry.
    async fn find_pantry(&self, pantry_id: &PantryId) -> Result<Option<Pantry>, PantryRepositoryError>;

    /// Role of `user_id` in the pantry, if they hold a live membership row.
    async fn membership_role(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRole>, PantryRepositoryError>;

    /// Live items with `quantity > 0`, ordered by name.
    async fn list_ingredients(
        &self,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, PantryRepositoryError>;

    /// Insert a pantry and its owner membership in one transaction.
    async fn create_pantry(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<Pantry, PantryRepositoryError>;

    /// Insert a `member` row unless a live row already exists.
    async fn add_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<MembershipChange, PantryRepositoryError>;

    /// Soft-delete the user's live membership row. Returns `None` when the
    /// user held no live row.
    async fn remove_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<PantryMembership>, PantryRepositoryError>;
}
