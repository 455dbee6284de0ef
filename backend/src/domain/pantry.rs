//! Shared pantries, their membership, and the ingredients they hold.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Pantry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct PantryId(Uuid);

impl PantryId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PantryId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for PantryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Maximum pantry name length in characters.
pub const PANTRY_NAME_MAX: usize = 100;

/// A shared pantry with exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pantry {
    /// Pantry identifier.
    pub id: PantryId,
    /// Owning user; always has a live `owner` membership row.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Role carried by a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// The pantry owner.
    Owner,
    /// Any other member.
    Member,
}

impl MembershipRole {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    /// Parse the stored representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "owner" => Some(Self::Owner),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// Live link between a user and a pantry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PantryMembership {
    /// Membership identifier.
    pub id: Uuid,
    /// Pantry the user belongs to.
    pub pantry_id: PantryId,
    /// Member.
    pub user_id: UserId,
    /// Role within the pantry.
    pub role: MembershipRole,
}

/// Outcome of adding a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    /// A new live row was inserted.
    Added(PantryMembership),
    /// The user already had a live row; nothing changed.
    Unchanged(PantryMembership),
}

impl MembershipChange {
    /// The live membership after the call.
    #[must_use]
    pub fn membership(&self) -> &PantryMembership {
        match self {
            Self::Added(membership) | Self::Unchanged(membership) => membership,
        }
    }
}

/// A pantry item with non-zero quantity, as exposed to the AI pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    /// Item identifier.
    pub id: Uuid,
    /// Trimmed item name.
    pub name: String,
    /// Quantity on hand, strictly positive.
    pub quantity: f64,
    /// Trimmed unit label; may be empty.
    pub unit: String,
    /// Price of one unit.
    pub price_per_unit: f64,
    /// Optional expiry time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Ingredient {
    /// Computed stock value; never stored.
    #[must_use]
    pub fn total_price(&self) -> f64 {
        self.quantity * self.price_per_unit
    }

    /// Trim textual fields in place.
    #[must_use]
    pub fn normalised(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self.unit = self.unit.trim().to_owned();
        self
    }

    /// Key used for case-insensitive availability checks.
    #[must_use]
    pub fn match_key(&self) -> String {
        normalise_name(&self.name)
    }

    /// `"2 kg rice"`-style rendering for prompts.
    #[must_use]
    pub fn describe(&self) -> String {
        let quantity = format_quantity(self.quantity);
        if self.unit.is_empty() {
            format!("{quantity} {}", self.name)
        } else {
            format!("{quantity} {} {}", self.unit, self.name)
        }
    }
}

/// Case- and whitespace-insensitive ingredient key.
#[must_use]
pub fn normalise_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        let rendered = format!("{quantity:.2}");
        rendered.trim_end_matches('0').to_owned()
    }
}
