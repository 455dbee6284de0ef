//! Recipe generation.

use serde_json::json;
use tracing::info;

use super::{AiPipeline, MAX_RECIPE_COUNT, RECIPE_DEBIT_LABEL};
use crate::domain::llm::ChatRequest;
use crate::domain::llm_response::parse_artifact;
use crate::domain::ports::CallContext;
use crate::domain::prompt::{PromptVariables, TemplateKind};
use crate::domain::{Error, GeneratedRecipe, Ingredient, Recipe, RecipeBrief, RecipeRequest};

/// Bullet list of pantry stock for prompts.
pub(super) fn ingredient_lines(ingredients: &[Ingredient]) -> String {
    ingredients
        .iter()
        .map(|ingredient| format!("- {}", ingredient.describe()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn variation_hint(attempt: usize, count: usize, titles: &[String]) -> Option<String> {
    if attempt == 1 {
        return None;
    }
    Some(format!(
        "This is recipe {attempt} of {count}. Make it clearly different from: {}.",
        titles.join("; ")
    ))
}

fn recipe_variables(
    brief: &RecipeBrief,
    ingredients: &str,
    variation: Option<String>,
) -> PromptVariables {
    PromptVariables::new()
        .with("ingredients", ingredients)
        .with_optional("meal_type", brief.meal_type.map(|meal| meal.as_str()))
        .with_optional("cuisine", brief.cuisine.clone())
        .with("dietary_restrictions", brief.dietary_restrictions.join(", "))
        .with_optional("difficulty", brief.difficulty.map(|level| level.as_str()))
        .with_optional("servings", brief.servings.map(|servings| servings.to_string()))
        .with_optional(
            "max_cooking_time",
            brief.max_cooking_time.map(|minutes| minutes.to_string()),
        )
        .with_optional("pantry_only", brief.use_only_pantry_items.then_some("yes"))
        .with_optional("additional_notes", brief.additional_notes.clone())
        .with_optional("variation", variation)
}

impl AiPipeline {
    pub(super) async fn run_recipe_batch(
        &self,
        context: &CallContext,
        request: &RecipeRequest,
        count: usize,
    ) -> Result<Vec<Recipe>, Error> {
        if !(1..=MAX_RECIPE_COUNT).contains(&count) {
            return Err(Error::invalid_request(format!(
                "recipe count must be between 1 and {MAX_RECIPE_COUNT}"
            ))
            .with_details(json!({ "field": "count", "value": count })));
        }
        let brief = request.validate()?;
        let pantry = self.pantry_ingredients(context, &brief.pantry_id).await?;
        if pantry.is_empty() {
            return Err(Error::invalid_request("pantry has no ingredients")
                .with_details(json!({ "pantry_id": brief.pantry_id })));
        }
        let template = self.templates.template(TemplateKind::Recipe)?;
        let provider = self.provider(brief.provider.as_deref())?;
        let stock = ingredient_lines(&pantry);

        let now = self.clock.utc();
        let user_id = context.user_id();
        let mut titles: Vec<String> = Vec::with_capacity(count);
        let mut recipes = Vec::with_capacity(count);
        for attempt in 1..=count {
            let variation = variation_hint(attempt, count, &titles);
            let messages = template.render(&recipe_variables(&brief, &stock, variation))?;
            let (text, _) = self
                .dispatch(context, provider.as_ref(), &ChatRequest::new(messages))
                .await?;
            let mut generated: GeneratedRecipe = parse_artifact(&text)?;
            generated.mark_availability(&pantry);
            titles.push(generated.title.trim().to_owned());
            let mut recipe = generated.into_recipe(user_id, now);
            recipe.meal_type = recipe.meal_type.or(brief.meal_type);
            recipes.push(recipe);
        }

        self.recipes
            .save_all(&recipes)
            .await
            .map_err(crate::domain::recipe_service::map_recipe_repository_error)?;
        info!(
            user_id = %user_id,
            pantry_id = %brief.pantry_id,
            provider = provider.name(),
            count = recipes.len(),
            "generated recipes"
        );
        self.settle(context, RECIPE_DEBIT_LABEL).await?;
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn first_attempt_has_no_variation() {
        assert_eq!(variation_hint(1, 3, &[]), None);
    }

    #[rstest]
    fn later_attempts_name_previous_titles() {
        let hint = variation_hint(3, 3, &["Soup".to_owned(), "Stew".to_owned()]).expect("hint");
        assert!(hint.contains("recipe 3 of 3"));
        assert!(hint.contains("Soup; Stew"));
    }
}
