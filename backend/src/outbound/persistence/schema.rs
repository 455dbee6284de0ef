//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// One credit wallet per user.
    wallets (id) {
        /// Primary key.
        id -> Uuid,
        /// Owning user; unique.
        user_id -> Uuid,
        /// Current balance; `CHECK (balance >= 0)`.
        balance -> Int4,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only ledger entries.
    credit_transactions (id) {
        /// Primary key.
        id -> Uuid,
        /// Wallet the entry belongs to.
        wallet_id -> Uuid,
        /// Denormalised owner for listing.
        user_id -> Uuid,
        /// Signed amount.
        amount -> Int4,
        /// `add` or `consume`.
        #[sql_name = "type"]
        kind -> Varchar,
        /// Free-text label.
        description -> Text,
        /// Defaults to `clock_timestamp()`.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Shared pantries.
    pantries (id) {
        /// Primary key.
        id -> Uuid,
        /// Owning user.
        owner_id -> Uuid,
        /// Display name.
        name -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Pantry membership; unique per `(pantry_id, user_id)` among live rows.
    pantry_memberships (id) {
        /// Primary key.
        id -> Uuid,
        /// Pantry.
        pantry_id -> Uuid,
        /// Member.
        user_id -> Uuid,
        /// `owner` or `member`.
        role -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Pantry stock.
    items (id) {
        /// Primary key.
        id -> Uuid,
        /// Pantry holding the item.
        pantry_id -> Uuid,
        /// User who added the item.
        added_by -> Uuid,
        /// Optional category.
        category_id -> Nullable<Uuid>,
        /// Item name.
        name -> Varchar,
        /// Quantity on hand.
        quantity -> Float8,
        /// Unit label.
        unit -> Varchar,
        /// Price of one unit.
        price_per_unit -> Float8,
        /// Optional expiry.
        expires_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Saved and generated recipes.
    recipes (id) {
        /// Primary key.
        id -> Uuid,
        /// Owner.
        user_id -> Uuid,
        /// Title.
        title -> Varchar,
        /// Description.
        description -> Text,
        /// JSON array of ingredient lines.
        ingredients -> Jsonb,
        /// JSON array of steps.
        instructions -> Jsonb,
        /// Cooking minutes.
        cooking_time -> Nullable<Int4>,
        /// Preparation minutes.
        preparation_time -> Nullable<Int4>,
        /// Total minutes.
        total_time -> Nullable<Int4>,
        /// Servings.
        serving_size -> Nullable<Int4>,
        /// `easy`, `medium`, or `hard`.
        difficulty -> Nullable<Varchar>,
        /// Meal type.
        meal_type -> Nullable<Varchar>,
        /// Cuisine label.
        cuisine -> Varchar,
        /// JSON array of diet labels.
        dietary_restrictions -> Jsonb,
        /// JSON nutrition object.
        nutrition -> Nullable<Jsonb>,
        /// JSON array of tips.
        tips -> Jsonb,
        /// Generation time; null for hand-saved recipes.
        generated_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Shopping lists.
    shopping_lists (id) {
        /// Primary key.
        id -> Uuid,
        /// Owner.
        user_id -> Uuid,
        /// Pantry planned against.
        pantry_id -> Nullable<Uuid>,
        /// Display name.
        name -> Varchar,
        /// Model rationale.
        reasoning -> Nullable<Text>,
        /// Estimated total.
        estimated_total -> Float8,
        /// Produced by a model.
        generated_by_ai -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Shopping list lines.
    shopping_list_items (id) {
        /// Primary key.
        id -> Uuid,
        /// Parent list.
        list_id -> Uuid,
        /// Position within the list.
        position -> Int4,
        /// Product name.
        name -> Varchar,
        /// Quantity.
        quantity -> Float8,
        /// Unit label.
        unit -> Varchar,
        /// Estimated price.
        estimated_price -> Float8,
        /// Store section.
        category -> Varchar,
        /// 1 to 3.
        priority -> Int4,
        /// Why it was suggested.
        reason -> Text,
        /// Ticked off.
        purchased -> Bool,
    }
}

diesel::joinable!(credit_transactions -> wallets (wallet_id));
diesel::joinable!(pantry_memberships -> pantries (pantry_id));
diesel::joinable!(items -> pantries (pantry_id));
diesel::joinable!(shopping_list_items -> shopping_lists (list_id));

diesel::allow_tables_to_appear_in_same_query!(
    wallets,
    credit_transactions,
    pantries,
    pantry_memberships,
    items,
    recipes,
    shopping_lists,
    shopping_list_items,
);
