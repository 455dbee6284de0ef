//! In-process pantry store.
//!
//! Memberships are soft-deleted like their PostgreSQL counterparts so the
//! "one live row per user" rule is observable in tests.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use uuid::Uuid;

use crate::domain::ports::{PantryRepository, PantryRepositoryError};
use crate::domain::{
    Ingredient, MembershipChange, MembershipRole, Pantry, PantryId, PantryMembership, UserId,
};

#[derive(Debug, Clone)]
struct MembershipRecord {
    membership: PantryMembership,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct PantryState {
    pantries: HashMap<PantryId, Pantry>,
    memberships: Vec<MembershipRecord>,
    items: HashMap<PantryId, Vec<Ingredient>>,
}

impl PantryState {
    fn live(&self, pantry_id: &PantryId, user_id: &UserId) -> Option<&PantryMembership> {
        self.memberships
            .iter()
            .filter(|record| record.deleted_at.is_none())
            .map(|record| &record.membership)
            .find(|m| m.pantry_id == *pantry_id && m.user_id == *user_id)
    }
}

/// Pantry repository holding pantries, memberships, and stock in memory.
pub struct InMemoryPantryRepository {
    state: RwLock<PantryState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryPantryRepository {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryPantryRepository {
    /// Empty store stamped by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(PantryState::default()),
            clock,
        }
    }

    /// Stock `pantry_id` with `item`. Items have no port of their own; this
    /// seeds development data and tests.
    pub fn stock(&self, pantry_id: &PantryId, item: Ingredient) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.items.entry(*pantry_id).or_default().push(item);
    }
}

#[async_trait]
impl PantryRepository for InMemoryPantryRepository {
    async fn find_pantry(&self, pantry_id: &PantryId) -> Result<Option<Pantry>, PantryRepositoryError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.pantries.get(pantry_id).cloned())
    }

    async fn membership_role(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRole>, PantryRepositoryError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.pantries.contains_key(pantry_id) {
            return Ok(None);
        }
        Ok(state.live(pantry_id, user_id).map(|m| m.role))
    }

    async fn list_ingredients(
        &self,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, PantryRepositoryError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut stocked: Vec<Ingredient> = state
            .items
            .get(pantry_id)
            .into_iter()
            .flatten()
            .filter(|item| item.quantity > 0.0)
            .cloned()
            .map(Ingredient::normalised)
            .collect();
        stocked.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stocked)
    }

    async fn create_pantry(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<Pantry, PantryRepositoryError> {
        let now = self.clock.utc();
        let pantry = Pantry {
            id: PantryId::random(),
            owner_id: *owner_id,
            name: name.to_owned(),
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.pantries.insert(pantry.id, pantry.clone());
        state.memberships.push(MembershipRecord {
            membership: PantryMembership {
                id: Uuid::new_v4(),
                pantry_id: pantry.id,
                user_id: *owner_id,
                role: MembershipRole::Owner,
            },
            deleted_at: None,
        });
        Ok(pantry)
    }

    async fn add_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<MembershipChange, PantryRepositoryError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.pantries.contains_key(pantry_id) {
            return Err(PantryRepositoryError::pantry_not_found(*pantry_id));
        }
        if let Some(existing) = state.live(pantry_id, user_id) {
            return Ok(MembershipChange::Unchanged(existing.clone()));
        }
        let membership = PantryMembership {
            id: Uuid::new_v4(),
            pantry_id: *pantry_id,
            user_id: *user_id,
            role: MembershipRole::Member,
        };
        state.memberships.push(MembershipRecord {
            membership: membership.clone(),
            deleted_at: None,
        });
        Ok(MembershipChange::Added(membership))
    }

    async fn remove_member(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<PantryMembership>, PantryRepositoryError> {
        let now = self.clock.utc();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed = state.memberships.iter_mut().find(|record| {
            record.deleted_at.is_none()
                && record.membership.pantry_id == *pantry_id
                && record.membership.user_id == *user_id
        });
        Ok(removed.map(|record| {
            record.deleted_at = Some(now);
            record.membership.clone()
        }))
    }
}
