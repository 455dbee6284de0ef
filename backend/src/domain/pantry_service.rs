//! Pantry authorisation service implementing [`PantryAccess`].
//!
//! Reads require membership, membership mutations require ownership. Both
//! checks run against live rows only.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{PantryAccess, PantryRepository, PantryRepositoryError};
use crate::domain::{
    Error, Ingredient, MembershipChange, MembershipRole, PANTRY_NAME_MAX, Pantry, PantryId,
    PantryMembership, UserId,
};

/// Membership rules over a [`PantryRepository`].
#[derive(Clone)]
pub struct PantryService<R> {
    repo: Arc<R>,
}

impl<R> PantryService<R> {
    /// Create a new service over the given repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> PantryService<R>
where
    R: PantryRepository,
{
    fn map_repository_error(error: PantryRepositoryError) -> Error {
        debug!(kind = error.kind(), %error, "pantry repository call failed");
        match error {
            PantryRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("pantry store unavailable: {message}"))
            }
            PantryRepositoryError::Query { message } => {
                Error::internal(format!("pantry store error: {message}"))
            }
            PantryRepositoryError::PantryNotFound { pantry_id } => Self::not_found(pantry_id),
        }
    }

    fn not_found(pantry_id: PantryId) -> Error {
        Error::not_found("pantry not found").with_details(json!({ "pantry_id": pantry_id }))
    }

    async fn role_of(
        &self,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRole>, Error> {
        self.repo
            .membership_role(pantry_id, user_id)
            .await
            .map_err(Self::map_repository_error)
    }

    /// Resolve the actor's role, distinguishing unknown pantries from
    /// non-members.
    async fn require_role(
        &self,
        pantry_id: &PantryId,
        actor: &UserId,
        needed: MembershipRole,
    ) -> Result<(), Error> {
        let role = self.role_of(pantry_id, actor).await?;
        let allowed = match (needed, role) {
            (_, None) => false,
            (MembershipRole::Member, Some(_)) => true,
            (MembershipRole::Owner, Some(role)) => role == MembershipRole::Owner,
        };
        if allowed {
            return Ok(());
        }
        let exists = self
            .repo
            .find_pantry(pantry_id)
            .await
            .map_err(Self::map_repository_error)?
            .is_some();
        if !exists {
            return Err(Self::not_found(*pantry_id));
        }
        let message = match needed {
            MembershipRole::Owner => "only the pantry owner may manage members",
            MembershipRole::Member => "not a member of this pantry",
        };
        Err(Error::forbidden(message).with_details(json!({ "pantry_id": pantry_id })))
    }
}

#[async_trait]
impl<R> PantryAccess for PantryService<R>
where
    R: PantryRepository,
{
    async fn is_member(&self, pantry_id: &PantryId, user_id: &UserId) -> Result<bool, Error> {
        Ok(self.role_of(pantry_id, user_id).await?.is_some())
    }

    async fn is_owner(&self, pantry_id: &PantryId, user_id: &UserId) -> Result<bool, Error> {
        Ok(self.role_of(pantry_id, user_id).await? == Some(MembershipRole::Owner))
    }

    async fn list_ingredients(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, Error> {
        self.require_role(pantry_id, actor, MembershipRole::Member)
            .await?;
        let mut ingredients: Vec<Ingredient> = self
            .repo
            .list_ingredients(pantry_id)
            .await
            .map_err(Self::map_repository_error)?
            .into_iter()
            .map(Ingredient::normalised)
            .filter(|item| item.quantity > 0.0 && !item.name.is_empty())
            .collect();
        ingredients.sort_by_key(Ingredient::match_key);
        Ok(ingredients)
    }

    async fn create_pantry(&self, owner_id: &UserId, name: &str) -> Result<Pantry, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_request("pantry name must not be empty")
                .with_details(json!({ "field": "name" })));
        }
        if name.chars().count() > PANTRY_NAME_MAX {
            return Err(Error::invalid_request(format!(
                "pantry name must be at most {PANTRY_NAME_MAX} characters"
            ))
            .with_details(json!({ "field": "name" })));
        }
        let pantry = self
            .repo
            .create_pantry(owner_id, name)
            .await
            .map_err(Self::map_repository_error)?;
        info!(pantry_id = %pantry.id, owner_id = %owner_id, "created pantry");
        Ok(pantry)
    }

    async fn add_member(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<MembershipChange, Error> {
        self.require_role(pantry_id, actor, MembershipRole::Owner)
            .await?;
        let change = self
            .repo
            .add_member(pantry_id, user_id)
            .await
            .map_err(Self::map_repository_error)?;
        if matches!(change, MembershipChange::Added(_)) {
            info!(pantry_id = %pantry_id, user_id = %user_id, actor = %actor, "added pantry member");
        }
        Ok(change)
    }

    async fn remove_member(
        &self,
        actor: &UserId,
        pantry_id: &PantryId,
        user_id: &UserId,
    ) -> Result<PantryMembership, Error> {
        self.require_role(pantry_id, actor, MembershipRole::Owner)
            .await?;
        // The actor is the owner here, so this also covers owner self-removal.
        if self.role_of(pantry_id, user_id).await? == Some(MembershipRole::Owner) {
            return Err(Error::invalid_request(
                "the pantry owner cannot be removed; transfer ownership first",
            ));
        }
        let removed = self
            .repo
            .remove_member(pantry_id, user_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| {
                Error::not_found("membership not found")
                    .with_details(json!({ "pantry_id": pantry_id, "user_id": user_id }))
            })?;
        info!(pantry_id = %pantry_id, user_id = %user_id, actor = %actor, "removed pantry member");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockPantryRepository;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn pantry(owner_id: UserId) -> Pantry {
        Pantry {
            id: PantryId::random(),
            owner_id,
            name: "Home".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(name: &str, quantity: f64) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            quantity,
            unit: " kg".to_owned(),
            price_per_unit: 1.0,
            expires_at: None,
        }
    }

    fn service(repo: MockPantryRepository) -> PantryService<MockPantryRepository> {
        PantryService::new(Arc::new(repo))
    }

    #[rstest]
    #[case(Some(MembershipRole::Owner), true, true)]
    #[case(Some(MembershipRole::Member), true, false)]
    #[case(None, false, false)]
    #[tokio::test]
    async fn membership_predicates(
        #[case] role: Option<MembershipRole>,
        #[case] member: bool,
        #[case] owner: bool,
    ) {
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role()
            .times(2)
            .returning(move |_, _| Ok(role));
        let service = service(repo);
        let pantry_id = PantryId::random();
        let user_id = UserId::random();

        assert_eq!(service.is_member(&pantry_id, &user_id).await.expect("member"), member);
        assert_eq!(service.is_owner(&pantry_id, &user_id).await.expect("owner"), owner);
    }

    #[tokio::test]
    async fn list_ingredients_normalises_for_members() {
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role()
            .return_once(|_, _| Ok(Some(MembershipRole::Member)));
        repo.expect_list_ingredients().return_once(|_| {
            Ok(vec![
                item(" tomato ", 2.0),
                item("Basil", 1.0),
                item("empty jar", 0.0),
            ])
        });

        let ingredients = service(repo)
            .list_ingredients(&UserId::random(), &PantryId::random())
            .await
            .expect("ingredients");
        let names: Vec<&str> = ingredients.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Basil", "tomato"]);
        assert!(ingredients.iter().all(|item| item.unit == "kg"));
    }

    #[tokio::test]
    async fn list_ingredients_forbids_non_members() {
        let owner = UserId::random();
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role().return_once(|_, _| Ok(None));
        repo.expect_find_pantry()
            .return_once(move |_| Ok(Some(pantry(owner))));
        repo.expect_list_ingredients().never();

        let error = service(repo)
            .list_ingredients(&UserId::random(), &PantryId::random())
            .await
            .expect_err("forbidden");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn list_ingredients_reports_unknown_pantry() {
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role().return_once(|_, _| Ok(None));
        repo.expect_find_pantry().return_once(|_| Ok(None));

        let error = service(repo)
            .list_ingredients(&UserId::random(), &PantryId::random())
            .await
            .expect_err("not found");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn members_cannot_add_members() {
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role()
            .return_once(|_, _| Ok(Some(MembershipRole::Member)));
        repo.expect_find_pantry()
            .return_once(|_| Ok(Some(pantry(UserId::random()))));
        repo.expect_add_member().never();

        let error = service(repo)
            .add_member(&UserId::random(), &PantryId::random(), &UserId::random())
            .await
            .expect_err("forbidden");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn owner_cannot_remove_themself() {
        let owner = UserId::random();
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role()
            .times(2)
            .returning(|_, _| Ok(Some(MembershipRole::Owner)));
        repo.expect_remove_member().never();

        let error = service(repo)
            .remove_member(&owner, &PantryId::random(), &owner)
            .await
            .expect_err("owner removal rejected");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn owner_removes_member() {
        let owner = UserId::random();
        let member = UserId::random();
        let pantry_id = PantryId::random();
        let mut repo = MockPantryRepository::new();
        repo.expect_membership_role().returning(move |_, user| {
            Ok(Some(if *user == owner {
                MembershipRole::Owner
            } else {
                MembershipRole::Member
            }))
        });
        repo.expect_remove_member().return_once(move |pantry, user| {
            Ok(Some(PantryMembership {
                id: Uuid::new_v4(),
                pantry_id: *pantry,
                user_id: *user,
                role: MembershipRole::Member,
            }))
        });

        let removed = service(repo)
            .remove_member(&owner, &pantry_id, &member)
            .await
            .expect("removed");
        assert_eq!(removed.user_id, member);
    }

    #[rstest]
    #[case("   ")]
    #[case("")]
    #[tokio::test]
    async fn create_pantry_rejects_blank_names(#[case] name: &str) {
        let mut repo = MockPantryRepository::new();
        repo.expect_create_pantry().never();

        let error = service(repo)
            .create_pantry(&UserId::random(), name)
            .await
            .expect_err("blank name");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }
}
