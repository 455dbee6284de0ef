//! AI-generated shopping lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::lenient;
use super::recipes::{check_range, field_error, trimmed};
use super::{Error, PantryId, UserId};

/// Priority assigned when the model's value is missing or out of range.
pub const DEFAULT_PRIORITY: i32 = 2;
/// Name given to generated lists when the caller supplies none.
pub const DEFAULT_LIST_NAME: &str = "AI shopping list";
/// Planning horizon used when the caller supplies none.
pub const DEFAULT_DAYS: i32 = 7;
/// Household size used when the caller supplies none.
pub const DEFAULT_PEOPLE: i32 = 2;

fn priority<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient::integer(deserializer)?;
    Ok(if (1..=3).contains(&value) {
        value
    } else {
        DEFAULT_PRIORITY
    })
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// One suggested purchase, as the model returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedShoppingItem {
    /// Product name.
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// Quantity to buy.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: f64,
    /// Unit label.
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit: String,
    /// Estimated price for the whole quantity.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub estimated_price: f64,
    /// Store section.
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: String,
    /// 1 (must buy) to 3 (nice to have); anything else becomes 2.
    #[serde(default = "default_priority", deserialize_with = "priority")]
    pub priority: i32,
    /// Why the item was suggested.
    #[serde(default, deserialize_with = "lenient::text")]
    pub reason: String,
}

/// Shopping list as the model returns it, after repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedShoppingList {
    /// Suggested purchases.
    pub items: Vec<GeneratedShoppingItem>,
    /// Overall rationale.
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub reasoning: Option<String>,
    /// Estimated total cost.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub estimated_total: f64,
}

/// Persisted shopping list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShoppingListItem {
    /// Item identifier.
    pub id: Uuid,
    /// Parent list.
    pub list_id: Uuid,
    /// Product name.
    pub name: String,
    /// Quantity to buy.
    pub quantity: f64,
    /// Unit label.
    pub unit: String,
    /// Estimated price.
    pub estimated_price: f64,
    /// Store section.
    pub category: String,
    /// 1 to 3.
    pub priority: i32,
    /// Why the item was suggested.
    pub reason: String,
    /// Whether the user ticked it off.
    pub purchased: bool,
}

/// Persisted shopping list owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShoppingList {
    /// List identifier.
    pub id: Uuid,
    /// Owner.
    pub user_id: UserId,
    /// Pantry the list was planned against.
    pub pantry_id: Option<PantryId>,
    /// Display name.
    pub name: String,
    /// Model rationale.
    pub reasoning: Option<String>,
    /// Estimated total cost.
    pub estimated_total: f64,
    /// Whether a model produced it.
    pub generated_by_ai: bool,
    /// Items in model order.
    pub items: Vec<ShoppingListItem>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl GeneratedShoppingList {
    /// Assign server identity. Items with blank names are dropped; the total
    /// falls back to the sum of item prices when the model omitted it.
    #[must_use]
    pub fn into_list(
        self,
        user_id: UserId,
        pantry_id: PantryId,
        name: String,
        now: DateTime<Utc>,
    ) -> ShoppingList {
        let list_id = Uuid::new_v4();
        let items: Vec<ShoppingListItem> = self
            .items
            .into_iter()
            .filter(|item| !item.name.trim().is_empty())
            .map(|item| ShoppingListItem {
                id: Uuid::new_v4(),
                list_id,
                name: item.name.trim().to_owned(),
                quantity: item.quantity,
                unit: item.unit.trim().to_owned(),
                estimated_price: item.estimated_price,
                category: item.category.trim().to_owned(),
                priority: item.priority,
                reason: item.reason.trim().to_owned(),
                purchased: false,
            })
            .collect();
        let estimated_total = if self.estimated_total > 0.0 {
            self.estimated_total
        } else {
            items.iter().map(|item| item.estimated_price).sum()
        };
        ShoppingList {
            id: list_id,
            user_id,
            pantry_id: Some(pantry_id),
            name,
            reasoning: self.reasoning,
            estimated_total,
            generated_by_ai: true,
            items,
            created_at: now,
            updated_at: now,
        }
    }
}

/// AI shopping-list request as received from clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AiShoppingListRequest {
    /// Pantry to plan against.
    pub pantry_id: Option<PantryId>,
    /// List name.
    #[serde(default)]
    pub name: Option<String>,
    /// Days to plan for, 1 to 30.
    #[serde(default)]
    pub days: Option<i32>,
    /// People to feed, 1 to 20.
    #[serde(default)]
    pub people: Option<i32>,
    /// Budget ceiling; must be positive when present.
    #[serde(default)]
    pub budget: Option<f64>,
    /// Free-text preferences.
    #[serde(default)]
    pub preferences: Option<String>,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Validated shopping-list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingBrief {
    /// Pantry to plan against.
    pub pantry_id: PantryId,
    /// List name.
    pub name: String,
    /// Days to plan for.
    pub days: i32,
    /// People to feed.
    pub people: i32,
    /// Budget ceiling.
    pub budget: Option<f64>,
    /// Trimmed preferences.
    pub preferences: Option<String>,
    /// Provider override.
    pub provider: Option<String>,
}

impl AiShoppingListRequest {
    /// Apply defaults and check ranges.
    pub fn validate(&self) -> Result<ShoppingBrief, Error> {
        let pantry_id = self
            .pantry_id
            .ok_or_else(|| field_error("pantry_id", "pantry_id is required"))?;
        check_range("days", self.days, &(1..=30))?;
        check_range("people", self.people, &(1..=20))?;
        if self
            .budget
            .is_some_and(|budget| !(budget.is_finite() && budget > 0.0))
        {
            return Err(field_error("budget", "budget must be positive"));
        }
        Ok(ShoppingBrief {
            pantry_id,
            name: trimmed(self.name.as_ref()).unwrap_or_else(|| DEFAULT_LIST_NAME.to_owned()),
            days: self.days.unwrap_or(DEFAULT_DAYS),
            people: self.people.unwrap_or(DEFAULT_PEOPLE),
            budget: self.budget,
            preferences: trimmed(self.preferences.as_ref()),
            provider: trimmed(self.provider.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(1), 1)]
    #[case(json!(3), 3)]
    #[case(json!(0), 2)]
    #[case(json!(7), 2)]
    #[case(json!("high"), 2)]
    #[case(json!(null), 2)]
    fn priority_outside_range_coerces_to_two(#[case] raw: serde_json::Value, #[case] expected: i32) {
        let item: GeneratedShoppingItem =
            serde_json::from_value(json!({ "name": "milk", "priority": raw })).expect("decode");
        assert_eq!(item.priority, expected);
    }

    #[rstest]
    fn missing_priority_defaults_to_two() {
        let item: GeneratedShoppingItem =
            serde_json::from_value(json!({ "name": "milk" })).expect("decode");
        assert_eq!(item.priority, DEFAULT_PRIORITY);
    }

    #[rstest]
    fn into_list_drops_blank_items_and_sums_missing_total() {
        let generated: GeneratedShoppingList = serde_json::from_value(json!({
            "items": [
                {"name": "milk", "quantity": 2, "unit": "l", "estimated_price": 2.5, "priority": 1},
                {"name": "  ", "quantity": 1},
                {"name": "eggs", "quantity": 12, "estimated_price": "3.5"}
            ]
        }))
        .expect("decode");
        let list = generated.into_list(
            UserId::random(),
            PantryId::random(),
            DEFAULT_LIST_NAME.to_owned(),
            Utc::now(),
        );
        assert_eq!(list.items.len(), 2);
        assert!(list.items.iter().all(|item| item.list_id == list.id));
        assert!((list.estimated_total - 6.0).abs() < f64::EPSILON);
        assert!(list.generated_by_ai);
    }

    #[rstest]
    fn validate_applies_defaults() {
        let brief = AiShoppingListRequest {
            pantry_id: Some(PantryId::random()),
            ..AiShoppingListRequest::default()
        }
        .validate()
        .expect("valid");
        assert_eq!(brief.name, DEFAULT_LIST_NAME);
        assert_eq!((brief.days, brief.people), (DEFAULT_DAYS, DEFAULT_PEOPLE));
    }

    #[rstest]
    #[case(AiShoppingListRequest { days: Some(0), ..AiShoppingListRequest::default() }, "days")]
    #[case(AiShoppingListRequest { people: Some(21), ..AiShoppingListRequest::default() }, "people")]
    #[case(AiShoppingListRequest { budget: Some(0.0), ..AiShoppingListRequest::default() }, "budget")]
    fn validate_rejects_out_of_range(#[case] mut request: AiShoppingListRequest, #[case] field: &str) {
        request.pantry_id = Some(PantryId::random());
        let error = request.validate().expect_err("invalid");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.details().and_then(|d| d["field"].as_str()), Some(field));
    }
}
