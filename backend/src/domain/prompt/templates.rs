//! Embedded prompt templates and the lookup seam the AI pipeline uses.

use std::collections::HashMap;

use super::{PromptVariables, build_messages, render, validate_template};
use crate::domain::Error;
use crate::domain::llm::ChatMessage;

/// Which artifact a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// One recipe as JSON.
    Recipe,
    /// One shopping list as JSON.
    ShoppingList,
}

/// Variables every recipe prompt must receive.
pub const RECIPE_REQUIRED: &[&str] = &["ingredients"];
/// Recipe variables that may be omitted.
pub const RECIPE_OPTIONAL: &[&str] = &[
    "meal_type",
    "cuisine",
    "dietary_restrictions",
    "difficulty",
    "servings",
    "max_cooking_time",
    "pantry_only",
    "additional_notes",
    "variation",
];
/// Variables every shopping-list prompt must receive.
pub const SHOPPING_REQUIRED: &[&str] = &["ingredients", "days", "people"];
/// Shopping-list variables that may be omitted.
pub const SHOPPING_OPTIONAL: &[&str] = &["budget", "preferences"];

const RECIPE_SYSTEM: &str = r#"You are a professional chef who writes practical home recipes.
Always answer with exactly one JSON object and no surrounding prose.
The object must have these fields:
{
  "title": string,
  "description": string,
  "ingredients": [{"name": string, "amount": number or null, "unit": string, "available": boolean, "alternative": string}],
  "instructions": [{"step": integer, "description": string, "time": integer minutes, "temperature": string}],
  "cooking_time": integer minutes,
  "preparation_time": integer minutes,
  "total_time": integer minutes,
  "serving_size": integer,
  "difficulty": "easy" | "medium" | "hard",
  "meal_type": "breakfast" | "lunch" | "dinner" | "snack" | "dessert",
  "cuisine": string,
  "dietary_restrictions": [string],
  "tips": [string],
  "nutrition_info": {"calories": number, "protein": number, "carbohydrates": number, "fat": number}
}
Write amounts as decimal numbers, never as fractions."#;

const RECIPE_USER: &str = "Create a recipe from the ingredients in my pantry.

Available ingredients:
{{ingredients}}

{{#meal_type}}Meal type: {{meal_type}}{{/meal_type}}
{{#cuisine}}Cuisine: {{cuisine}}{{/cuisine}}
{{#dietary_restrictions}}Dietary restrictions: {{dietary_restrictions}}{{/dietary_restrictions}}
{{#difficulty}}Difficulty: {{difficulty}}{{/difficulty}}
{{#servings}}Servings: {{servings}}{{/servings}}
{{#max_cooking_time}}Maximum total time: {{max_cooking_time}} minutes{{/max_cooking_time}}
{{#pantry_only}}Use only the listed ingredients plus water, salt, and pepper.{{/pantry_only}}
{{#additional_notes}}Additional notes: {{additional_notes}}{{/additional_notes}}
{{variation}}

Mark each ingredient as available when it appears in the list above.";

const SHOPPING_SYSTEM: &str = r#"You are a household planner who writes frugal, realistic shopping lists.
Always answer with exactly one JSON object and no surrounding prose.
The object must have these fields:
{
  "items": [{"name": string, "quantity": number, "unit": string, "estimated_price": number, "category": string, "priority": 1 | 2 | 3, "reason": string}],
  "reasoning": string,
  "estimated_total": number
}
Priority 1 means essential and 3 means optional."#;

const SHOPPING_USER: &str = "Plan the groceries for {{people}} people over {{days}} days.

Current pantry stock:
{{ingredients}}

{{#budget}}Keep the total under {{budget}}.{{/budget}}
{{#preferences}}Preferences: {{preferences}}{{/preferences}}

Only list what the pantry is missing or running low on.";

/// A system/user template pair plus its variable contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: String,
    user: String,
    required: Vec<String>,
    optional: Vec<String>,
}

impl PromptTemplate {
    /// Build a template, rejecting it when the user side lacks a required
    /// variable or either side has unbalanced sections.
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        required: &[&str],
        optional: &[&str],
    ) -> Result<Self, Error> {
        let system = system.into();
        let user = user.into();
        validate_template(&system, &[])?;
        validate_template(&user, required)?;
        Ok(Self {
            system,
            user,
            required: required.iter().map(|name| (*name).to_owned()).collect(),
            optional: optional.iter().map(|name| (*name).to_owned()).collect(),
        })
    }

    /// Names the caller must bind.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Render both sides into chat messages.
    pub fn render(&self, variables: &PromptVariables) -> Result<Vec<ChatMessage>, Error> {
        let optional: Vec<&str> = self.optional.iter().map(String::as_str).collect();
        let system = render(&self.system, variables, &optional)?;
        let user = render(&self.user, variables, &optional)?;
        Ok(build_messages(&system, &user))
    }
}

/// Source of prompt templates. A file- or database-backed store can replace
/// the embedded set without touching the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait PromptTemplates: Send + Sync {
    /// Template for `kind`.
    fn template(&self, kind: TemplateKind) -> Result<PromptTemplate, Error>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone)]
pub struct StaticPromptTemplates {
    templates: HashMap<TemplateKind, PromptTemplate>,
}

impl StaticPromptTemplates {
    /// Load and validate the embedded templates.
    pub fn new() -> Result<Self, Error> {
        let templates = HashMap::from([
            (
                TemplateKind::Recipe,
                PromptTemplate::new(RECIPE_SYSTEM, RECIPE_USER, RECIPE_REQUIRED, RECIPE_OPTIONAL)?,
            ),
            (
                TemplateKind::ShoppingList,
                PromptTemplate::new(
                    SHOPPING_SYSTEM,
                    SHOPPING_USER,
                    SHOPPING_REQUIRED,
                    SHOPPING_OPTIONAL,
                )?,
            ),
        ]);
        Ok(Self { templates })
    }
}

impl PromptTemplates for StaticPromptTemplates {
    fn template(&self, kind: TemplateKind) -> Result<PromptTemplate, Error> {
        self.templates
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::internal(format!("no prompt template for {kind:?}")))
    }
}
