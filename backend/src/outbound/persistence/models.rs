//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions to and from domain types live
//! beside the repository that needs them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    credit_transactions, items, pantries, pantry_memberships, recipes, shopping_list_items,
    shopping_lists, wallets,
};

// ---------------------------------------------------------------------------
// Credit ledger models
// ---------------------------------------------------------------------------

/// Row struct for reading from the wallets table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for opening a wallet.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wallets)]
pub(crate) struct NewWalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i32,
}

/// Row struct for reading ledger entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = credit_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CreditTransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for appending a ledger entry; `created_at` is left to
/// the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_transactions)]
pub(crate) struct NewCreditTransactionRow<'a> {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub kind: &'a str,
    pub description: &'a str,
}

// ---------------------------------------------------------------------------
// Pantry models
// ---------------------------------------------------------------------------

/// Row struct for reading live pantries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pantries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PantryRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating pantries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pantries)]
pub(crate) struct NewPantryRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: &'a str,
}

/// Row struct for reading membership rows.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pantry_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: Uuid,
    pub pantry_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

/// Insertable struct for membership rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pantry_memberships)]
pub(crate) struct NewMembershipRow<'a> {
    pub id: Uuid,
    pub pantry_id: Uuid,
    pub user_id: Uuid,
    pub role: &'a str,
}

/// Row struct for reading pantry items as ingredients.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ItemRow {
    pub id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    pub expires_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Recipe models
// ---------------------------------------------------------------------------

/// Row struct for reading and inserting recipes.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub cooking_time: Option<i32>,
    pub preparation_time: Option<i32>,
    pub total_time: Option<i32>,
    pub serving_size: Option<i32>,
    pub difficulty: Option<String>,
    pub meal_type: Option<String>,
    pub cuisine: String,
    pub dietary_restrictions: serde_json::Value,
    pub nutrition: Option<serde_json::Value>,
    pub tips: serde_json::Value,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Shopping list models
// ---------------------------------------------------------------------------

/// Insertable struct for shopping lists.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shopping_lists)]
pub(crate) struct NewShoppingListRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pantry_id: Option<Uuid>,
    pub name: &'a str,
    pub reasoning: Option<&'a str>,
    pub estimated_total: f64,
    pub generated_by_ai: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for shopping list lines.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shopping_list_items)]
pub(crate) struct NewShoppingListItemRow<'a> {
    pub id: Uuid,
    pub list_id: Uuid,
    pub position: i32,
    pub name: &'a str,
    pub quantity: f64,
    pub unit: &'a str,
    pub estimated_price: f64,
    pub category: &'a str,
    pub priority: i32,
    pub reason: &'a str,
    pub purchased: bool,
}
