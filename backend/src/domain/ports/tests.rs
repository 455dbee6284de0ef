use super::*;
use crate::domain::PantryId;
use crate::domain::credits::LedgerRejection;
use rstest::rstest;

#[rstest]
#[case(LedgerRejection::InsufficientCredits, CreditRepositoryError::insufficient_credits())]
#[case(LedgerRejection::InvalidAmount { amount: -3 }, CreditRepositoryError::invalid_amount(-3))]
#[case(LedgerRejection::Overflow, CreditRepositoryError::overflow())]
fn ledger_rejections_map_to_repository_errors(
    #[case] rejection: LedgerRejection,
    #[case] expected: CreditRepositoryError,
) {
    assert_eq!(CreditRepositoryError::from(rejection), expected);
}

#[rstest]
fn port_errors_render_their_context() {
    let pantry_id = PantryId::random();
    let err = PantryRepositoryError::pantry_not_found(pantry_id);
    assert_eq!(err.to_string(), format!("pantry {pantry_id} not found"));
    assert_eq!(err.kind(), "pantry_not_found");

    let err = RecipeRepositoryError::connection("refused");
    assert_eq!(err.to_string(), "recipe repository connection failed: refused");

    let err = ShoppingListRepositoryError::query("deadlock");
    assert_eq!(err.kind(), "query");
}

#[rstest]
fn call_context_exposes_its_token() {
    let token = tokio_util::sync::CancellationToken::new();
    let user_id = crate::domain::UserId::random();
    let context = CallContext::new(user_id, token.clone());
    token.cancel();
    assert!(context.cancellation().is_cancelled());
    assert_eq!(context.user_id(), user_id);
    assert!(!CallContext::detached(user_id).cancellation().is_cancelled());
}
