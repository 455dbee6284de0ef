//! Credit ledger domain types.
//!
//! A wallet holds a per-user integer balance. Every change to that balance is
//! recorded as an immutable [`CreditTransaction`]; the balance always equals
//! the signed sum of the wallet's transactions.

mod ledger;
mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::UserId;

pub use ledger::{
    CONSUME_AMOUNT, DEFAULT_CONSUME_DESCRIPTION, DEFAULT_GRANT_DESCRIPTION,
    INITIAL_ALLOCATION_DESCRIPTION, INITIAL_BALANCE, LedgerOperation, LedgerPlan, LedgerRejection,
    PlannedEntry,
};
pub use service::CreditService;

/// Per-user credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    /// Wallet identifier.
    pub id: Uuid,
    /// Owning user; unique across wallets.
    pub user_id: UserId,
    /// Current balance, never negative.
    pub balance: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Credits granted to the wallet.
    Add,
    /// One credit spent on a metered operation.
    Consume,
}

impl TransactionType {
    /// Stored and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Consume => "consume",
        }
    }

    /// Parse the stored representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "add" => Some(Self::Add),
            "consume" => Some(Self::Consume),
            _ => None,
        }
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreditTransaction {
    /// Entry identifier.
    pub id: Uuid,
    /// Wallet the entry belongs to.
    pub wallet_id: Uuid,
    /// Owner of the wallet.
    pub user_id: UserId,
    /// Signed amount; `-1` for consumes, positive for grants.
    pub amount: i32,
    /// Entry direction.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Free-text label.
    pub description: String,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// Default page size for transaction listings.
pub const DEFAULT_TRANSACTION_LIMIT: i64 = 50;
/// Largest page size accepted for transaction listings.
pub const MAX_TRANSACTION_LIMIT: i64 = 200;

/// Raw listing filter as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionFilter {
    /// Entry type, matched case-insensitively.
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub kind: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Page size; `0` or absent means 50, values above 200 are capped.
    pub limit: Option<i64>,
    /// Rows to skip; negative values are treated as zero.
    pub offset: Option<i64>,
}

/// Listing filter after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Lower-cased entry type to match exactly.
    pub kind: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Page size within `1..=200`.
    pub limit: i64,
    /// Rows to skip, never negative.
    pub offset: i64,
}

impl TransactionFilter {
    /// Apply paging defaults and bounds.
    ///
    /// # Examples
    /// ```
    /// use pantry_backend::domain::credits::TransactionFilter;
    ///
    /// let query = TransactionFilter { limit: Some(500), offset: Some(-3), ..Default::default() }
    ///     .normalise();
    /// assert_eq!((query.limit, query.offset), (200, 0));
    /// ```
    #[must_use]
    pub fn normalise(&self) -> TransactionQuery {
        let limit = match self.limit {
            None => DEFAULT_TRANSACTION_LIMIT,
            Some(value) if value <= 0 => DEFAULT_TRANSACTION_LIMIT,
            Some(value) => value.min(MAX_TRANSACTION_LIMIT),
        };
        let kind = self
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map(str::to_lowercase);
        TransactionQuery {
            kind,
            from: self.from,
            to: self.to,
            limit,
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

impl TransactionQuery {
    /// Whether `transaction` satisfies the type and time-range predicates.
    #[must_use]
    pub fn matches(&self, transaction: &CreditTransaction) -> bool {
        let kind_ok = self
            .kind
            .as_deref()
            .is_none_or(|kind| kind == transaction.kind.as_str());
        let from_ok = self.from.is_none_or(|from| transaction.created_at >= from);
        let to_ok = self.to.is_none_or(|to| transaction.created_at <= to);
        kind_ok && from_ok && to_ok
    }
}

/// One page of ledger history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransactionPage {
    /// Entries on this page.
    pub transactions: Vec<CreditTransaction>,
    /// Effective page size.
    pub limit: i64,
    /// Effective offset.
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 50)]
    #[case(Some(0), 50)]
    #[case(Some(-4), 50)]
    #[case(Some(1), 1)]
    #[case(Some(200), 200)]
    #[case(Some(500), 200)]
    fn limit_is_defaulted_and_capped(#[case] limit: Option<i64>, #[case] expected: i64) {
        let filter = TransactionFilter {
            limit,
            ..TransactionFilter::default()
        };
        assert_eq!(filter.normalise().limit, expected);
    }

    #[rstest]
    #[case(None, 0)]
    #[case(Some(-10), 0)]
    #[case(Some(25), 25)]
    fn offset_is_never_negative(#[case] offset: Option<i64>, #[case] expected: i64) {
        let filter = TransactionFilter {
            offset,
            ..TransactionFilter::default()
        };
        assert_eq!(filter.normalise().offset, expected);
    }

    #[rstest]
    #[case(Some("CONSUME"), Some("consume"))]
    #[case(Some(" Add "), Some("add"))]
    #[case(Some(""), None)]
    #[case(None, None)]
    fn type_filter_is_lowercased(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let filter = TransactionFilter {
            kind: raw.map(str::to_owned),
            ..TransactionFilter::default()
        };
        assert_eq!(filter.normalise().kind.as_deref(), expected);
    }

    #[rstest]
    fn unknown_type_matches_nothing() {
        let query = TransactionFilter {
            kind: Some("refund".to_owned()),
            ..TransactionFilter::default()
        }
        .normalise();
        let entry = CreditTransaction {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            user_id: UserId::random(),
            amount: 10,
            kind: TransactionType::Add,
            description: INITIAL_ALLOCATION_DESCRIPTION.to_owned(),
            created_at: Utc::now(),
        };
        assert!(!query.matches(&entry));
    }

    #[rstest]
    fn transaction_serialises_type_field() {
        let entry = CreditTransaction {
            id: Uuid::nil(),
            wallet_id: Uuid::nil(),
            user_id: UserId::from(Uuid::nil()),
            amount: -1,
            kind: TransactionType::Consume,
            description: DEFAULT_CONSUME_DESCRIPTION.to_owned(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry).expect("serialise");
        assert_eq!(value["type"], "consume");
        assert_eq!(value["amount"], -1);
    }
}
