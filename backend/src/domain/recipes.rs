//! Recipe artifacts, the model's recipe shape, and generation requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::lenient;
use super::{Error, Ingredient, PantryId, UserId, normalise_name};

macro_rules! case_insensitive_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }

            /// Parse ignoring case and surrounding whitespace.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).ok_or_else(|| {
                    let expected: Vec<&str> = Self::ALL.iter().map(|value| value.as_str()).collect();
                    serde::de::Error::custom(format!(
                        "unknown {} `{raw}`, expected one of {}",
                        stringify!($name),
                        expected.join(", ")
                    ))
                })
            }
        }
    };
}

case_insensitive_enum! {
    /// Effort needed to cook a recipe.
    pub enum Difficulty {
        /// Beginner friendly.
        Easy => "easy",
        /// Some technique needed.
        Medium => "medium",
        /// Demanding.
        Hard => "hard",
    }
}

case_insensitive_enum! {
    /// Meal a recipe is intended for.
    pub enum MealType {
        /// Morning meal.
        Breakfast => "breakfast",
        /// Midday meal.
        Lunch => "lunch",
        /// Evening meal.
        Dinner => "dinner",
        /// Small bite.
        Snack => "snack",
        /// Sweet course.
        Dessert => "dessert",
    }
}

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredient {
    /// Ingredient name.
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// Quantity; `null` for "to taste".
    #[serde(default, deserialize_with = "lenient::optional_decimal")]
    pub amount: Option<f64>,
    /// Unit label.
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit: String,
    /// Whether the caller's pantry holds this ingredient.
    #[serde(default)]
    pub available: bool,
    /// Suggested substitute.
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

/// One preparation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Instruction {
    /// 1-based step number.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub step: i32,
    /// What to do.
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Minutes the step takes.
    #[serde(default, deserialize_with = "lenient::optional_minutes", skip_serializing_if = "Option::is_none")]
    pub time: Option<i32>,
    /// Oven or pan temperature, free text.
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

/// Approximate nutrition per serving, as reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NutritionInfo {
    /// Kilocalories.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub calories: f64,
    /// Grams of protein.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub protein: f64,
    /// Grams of carbohydrates.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub carbohydrates: f64,
    /// Grams of fat.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub fat: f64,
}

/// Recipe as the model returns it, after repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedRecipe {
    /// Recipe title.
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    /// Short description.
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    /// Ingredient lines.
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    /// Preparation steps.
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    /// Cooking minutes.
    #[serde(default, deserialize_with = "lenient::optional_minutes")]
    pub cooking_time: Option<i32>,
    /// Preparation minutes.
    #[serde(default, deserialize_with = "lenient::optional_minutes")]
    pub preparation_time: Option<i32>,
    /// Total minutes.
    #[serde(default, deserialize_with = "lenient::optional_minutes")]
    pub total_time: Option<i32>,
    /// Number of servings.
    #[serde(default, deserialize_with = "lenient::optional_minutes")]
    pub serving_size: Option<i32>,
    /// Difficulty, case-insensitive.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Meal type, case-insensitive.
    #[serde(default)]
    pub meal_type: Option<MealType>,
    /// Cuisine label.
    #[serde(default, deserialize_with = "lenient::text")]
    pub cuisine: String,
    /// Diets the recipe satisfies.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub dietary_restrictions: Vec<String>,
    /// Cooking tips.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub tips: Vec<String>,
    /// Nutrition estimate.
    #[serde(default)]
    pub nutrition_info: Option<NutritionInfo>,
}

/// Persisted recipe owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recipe {
    /// Recipe identifier.
    pub id: Uuid,
    /// Owner; the only user who can read it.
    pub user_id: UserId,
    /// Recipe title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Ingredient lines.
    pub ingredients: Vec<RecipeIngredient>,
    /// Preparation steps.
    pub instructions: Vec<Instruction>,
    /// Cooking minutes.
    pub cooking_time: Option<i32>,
    /// Preparation minutes.
    pub preparation_time: Option<i32>,
    /// Total minutes.
    pub total_time: Option<i32>,
    /// Number of servings.
    pub serving_size: Option<i32>,
    /// Difficulty.
    pub difficulty: Option<Difficulty>,
    /// Meal type.
    pub meal_type: Option<MealType>,
    /// Cuisine label.
    pub cuisine: String,
    /// Diets the recipe satisfies.
    pub dietary_restrictions: Vec<String>,
    /// Nutrition estimate.
    pub nutrition: Option<NutritionInfo>,
    /// Cooking tips.
    pub tips: Vec<String>,
    /// When the model produced it; `None` for hand-saved recipes.
    pub generated_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl GeneratedRecipe {
    /// Recompute `available` for every ingredient against the pantry using a
    /// case-insensitive name match.
    pub fn mark_availability(&mut self, pantry: &[Ingredient]) {
        let stocked: std::collections::HashSet<String> =
            pantry.iter().map(Ingredient::match_key).collect();
        for ingredient in &mut self.ingredients {
            ingredient.available = stocked.contains(&normalise_name(&ingredient.name));
        }
    }

    /// Validate a client-supplied recipe and take ownership of it.
    pub fn into_saved_recipe(self, user_id: UserId, now: DateTime<Utc>) -> Result<Recipe, Error> {
        if self.title.trim().is_empty() {
            return Err(field_error("title", "recipe title must not be empty"));
        }
        let mut recipe = self.into_recipe(user_id, now);
        recipe.generated_at = None;
        Ok(recipe)
    }

    /// Assign server identity and ownership.
    #[must_use]
    pub fn into_recipe(self, user_id: UserId, now: DateTime<Utc>) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id,
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            ingredients: self.ingredients,
            instructions: self.instructions,
            cooking_time: self.cooking_time,
            preparation_time: self.preparation_time,
            total_time: self.total_time,
            serving_size: self.serving_size,
            difficulty: self.difficulty,
            meal_type: self.meal_type,
            cuisine: self.cuisine.trim().to_owned(),
            dietary_restrictions: self.dietary_restrictions,
            nutrition: self.nutrition_info,
            tips: self.tips,
            generated_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Allowed servings range.
pub const SERVINGS_RANGE: std::ops::RangeInclusive<i32> = 1..=20;
/// Allowed maximum cooking time in minutes.
pub const COOKING_TIME_RANGE: std::ops::RangeInclusive<i32> = 1..=600;

/// Recipe generation request as received from clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecipeRequest {
    /// Pantry whose ingredients seed the prompt.
    pub pantry_id: Option<PantryId>,
    /// breakfast, lunch, dinner, snack, or dessert.
    #[serde(default)]
    pub meal_type: Option<String>,
    /// Preferred cuisine.
    #[serde(default)]
    pub cuisine: Option<String>,
    /// Diets to honour.
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    /// easy, medium, or hard.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Servings, 1 to 20.
    #[serde(default)]
    pub servings: Option<i32>,
    /// Upper bound on total minutes, 1 to 600.
    #[serde(default)]
    pub max_cooking_time: Option<i32>,
    /// Free-text notes.
    #[serde(default)]
    pub additional_notes: Option<String>,
    /// Restrict the model to pantry ingredients.
    #[serde(default)]
    pub use_only_pantry_items: bool,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Validated recipe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeBrief {
    /// Pantry whose ingredients seed the prompt.
    pub pantry_id: PantryId,
    /// Requested meal type.
    pub meal_type: Option<MealType>,
    /// Trimmed cuisine.
    pub cuisine: Option<String>,
    /// Trimmed, non-empty diets.
    pub dietary_restrictions: Vec<String>,
    /// Requested difficulty.
    pub difficulty: Option<Difficulty>,
    /// Servings within range.
    pub servings: Option<i32>,
    /// Maximum minutes within range.
    pub max_cooking_time: Option<i32>,
    /// Trimmed notes.
    pub additional_notes: Option<String>,
    /// Restrict the model to pantry ingredients.
    pub use_only_pantry_items: bool,
    /// Provider override.
    pub provider: Option<String>,
}

pub(crate) fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

pub(crate) fn field_error(field: &str, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({ "field": field }))
}

impl RecipeRequest {
    /// Check enums and ranges, returning the typed brief.
    pub fn validate(&self) -> Result<RecipeBrief, Error> {
        let pantry_id = self
            .pantry_id
            .ok_or_else(|| field_error("pantry_id", "pantry_id is required"))?;
        let meal_type = parse_choice(
            "meal_type",
            self.meal_type.as_ref(),
            MealType::parse,
            MealType::ALL,
        )?;
        let difficulty = parse_choice(
            "difficulty",
            self.difficulty.as_ref(),
            Difficulty::parse,
            Difficulty::ALL,
        )?;
        check_range("servings", self.servings, &SERVINGS_RANGE)?;
        check_range("max_cooking_time", self.max_cooking_time, &COOKING_TIME_RANGE)?;
        Ok(RecipeBrief {
            pantry_id,
            meal_type,
            cuisine: trimmed(self.cuisine.as_ref()),
            dietary_restrictions: self
                .dietary_restrictions
                .iter()
                .map(|diet| diet.trim())
                .filter(|diet| !diet.is_empty())
                .map(str::to_owned)
                .collect(),
            difficulty,
            servings: self.servings,
            max_cooking_time: self.max_cooking_time,
            additional_notes: trimmed(self.additional_notes.as_ref()),
            use_only_pantry_items: self.use_only_pantry_items,
            provider: trimmed(self.provider.as_ref()),
        })
    }
}

fn parse_choice<T: fmt::Display + Copy>(
    field: &str,
    raw: Option<&String>,
    parse: fn(&str) -> Option<T>,
    all: &[T],
) -> Result<Option<T>, Error> {
    let Some(raw) = raw.map(|text| text.trim()).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };
    parse(raw).map(Some).ok_or_else(|| {
        let allowed: Vec<String> = all.iter().map(ToString::to_string).collect();
        Error::invalid_request(format!("invalid {field} `{raw}`"))
            .with_details(json!({ "field": field, "allowed": allowed }))
    })
}

pub(crate) fn check_range(
    field: &str,
    value: Option<i32>,
    range: &std::ops::RangeInclusive<i32>,
) -> Result<(), Error> {
    match value {
        Some(value) if !range.contains(&value) => Err(Error::invalid_request(format!(
            "{field} must be between {} and {}",
            range.start(),
            range.end()
        ))
        .with_details(json!({ "field": field, "min": range.start(), "max": range.end() }))),
        _ => Ok(()),
    }
}
