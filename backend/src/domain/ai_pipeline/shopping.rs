//! Shopping list generation.

use tracing::{debug, info};

use super::recipes::ingredient_lines;
use super::{AiPipeline, SHOPPING_DEBIT_LABEL};
use crate::domain::llm::ChatRequest;
use crate::domain::llm_response::parse_artifact;
use crate::domain::ports::{CallContext, ShoppingListRepositoryError};
use crate::domain::prompt::{PromptVariables, TemplateKind};
use crate::domain::{AiShoppingListRequest, Error, GeneratedShoppingList, ShoppingList};

const EMPTY_PANTRY_LINE: &str = "- nothing in stock";

fn map_shopping_list_repository_error(error: ShoppingListRepositoryError) -> Error {
    debug!(kind = error.kind(), %error, "shopping list repository call failed");
    match error {
        ShoppingListRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("shopping list store unavailable: {message}"))
        }
        ShoppingListRepositoryError::Query { message } => {
            Error::internal(format!("shopping list store error: {message}"))
        }
    }
}

impl AiPipeline {
    pub(super) async fn run_shopping_list(
        &self,
        context: &CallContext,
        request: &AiShoppingListRequest,
    ) -> Result<ShoppingList, Error> {
        let brief = request.validate()?;
        let pantry = self.pantry_ingredients(context, &brief.pantry_id).await?;
        let template = self.templates.template(TemplateKind::ShoppingList)?;
        let provider = self.provider(brief.provider.as_deref())?;

        let stock = if pantry.is_empty() {
            EMPTY_PANTRY_LINE.to_owned()
        } else {
            ingredient_lines(&pantry)
        };
        let variables = PromptVariables::new()
            .with("ingredients", stock)
            .with("days", brief.days.to_string())
            .with("people", brief.people.to_string())
            .with_optional("budget", brief.budget.map(|budget| format!("{budget:.2}")))
            .with_optional("preferences", brief.preferences.clone());
        let messages = template.render(&variables)?;
        let (text, _) = self
            .dispatch(context, provider.as_ref(), &ChatRequest::new(messages))
            .await?;
        let generated: GeneratedShoppingList = parse_artifact(&text)?;

        let user_id = context.user_id();
        let list = generated.into_list(user_id, brief.pantry_id, brief.name, self.clock.utc());
        self.shopping_lists
            .save(&list)
            .await
            .map_err(map_shopping_list_repository_error)?;
        info!(
            user_id = %user_id,
            list_id = %list.id,
            items = list.items.len(),
            provider = provider.name(),
            "generated shopping list"
        );
        self.settle(context, SHOPPING_DEBIT_LABEL).await?;
        Ok(list)
    }
}
