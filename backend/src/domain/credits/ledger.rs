//! Pure ledger rules.
//!
//! Repository adapters lock the wallet row (or observe its absence), ask the
//! operation for a [`LedgerPlan`], then write exactly what the plan says in
//! the same transaction. Keeping the rules here means the PostgreSQL and
//! in-memory adapters cannot disagree about balances.

use super::{TransactionType, Wallet};

/// Balance granted when a wallet is first created.
pub const INITIAL_BALANCE: i32 = 10;
/// Description of the opening grant.
pub const INITIAL_ALLOCATION_DESCRIPTION: &str = "Initial credit allocation";
/// Description used when a consume arrives without one.
pub const DEFAULT_CONSUME_DESCRIPTION: &str = "LLM request";
/// Description used when a grant arrives without one.
pub const DEFAULT_GRANT_DESCRIPTION: &str = "Manual credit adjustment";
/// Signed amount of every consume entry.
pub const CONSUME_AMOUNT: i32 = -1;

/// Reasons a ledger operation cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerRejection {
    /// Missing wallet or non-positive balance on consume.
    #[error("insufficient credits")]
    InsufficientCredits,
    /// Grant amount was zero or negative.
    #[error("credit amount must be positive, got {amount}")]
    InvalidAmount {
        /// Rejected amount.
        amount: i32,
    },
    /// The grant would overflow the balance.
    #[error("credit balance would overflow")]
    Overflow,
}

/// A mutation requested against a user's wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    /// Spend exactly one credit.
    Consume {
        /// Trimmed, non-empty label.
        description: String,
    },
    /// Add `amount` credits, creating the wallet first when absent.
    Grant {
        /// Strictly positive amount.
        amount: i32,
        /// Trimmed, non-empty label.
        description: String,
    },
}

/// One entry the adapter must append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Entry direction.
    pub kind: TransactionType,
    /// Signed amount.
    pub amount: i32,
    /// Label.
    pub description: String,
}

/// Writes an adapter performs for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPlan {
    /// Insert the wallet before appending entries.
    pub create_wallet: bool,
    /// Entries in commit order.
    pub entries: Vec<PlannedEntry>,
    /// Balance after all entries apply.
    pub new_balance: i32,
}

fn label(description: Option<&str>, fallback: &str) -> String {
    description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}

impl LedgerPlan {
    /// Plan for lazily opening a wallet.
    #[must_use]
    pub fn opening() -> Self {
        Self {
            create_wallet: true,
            entries: vec![PlannedEntry {
                kind: TransactionType::Add,
                amount: INITIAL_BALANCE,
                description: INITIAL_ALLOCATION_DESCRIPTION.to_owned(),
            }],
            new_balance: INITIAL_BALANCE,
        }
    }
}

impl LedgerOperation {
    /// Consume one credit; a blank description falls back to "LLM request".
    #[must_use]
    pub fn consume(description: Option<&str>) -> Self {
        Self::Consume {
            description: label(description, DEFAULT_CONSUME_DESCRIPTION),
        }
    }

    /// Grant `amount` credits; a blank description falls back to
    /// "Manual credit adjustment".
    pub fn grant(amount: i32, description: Option<&str>) -> Result<Self, LedgerRejection> {
        if amount <= 0 {
            return Err(LedgerRejection::InvalidAmount { amount });
        }
        Ok(Self::Grant {
            amount,
            description: label(description, DEFAULT_GRANT_DESCRIPTION),
        })
    }

    /// Decide the writes for this operation given the locked wallet state.
    ///
    /// # Examples
    /// ```
    /// use pantry_backend::domain::credits::{LedgerOperation, LedgerRejection};
    ///
    /// let rejected = LedgerOperation::consume(None).plan(None);
    /// assert_eq!(rejected, Err(LedgerRejection::InsufficientCredits));
    /// ```
    pub fn plan(&self, wallet: Option<&Wallet>) -> Result<LedgerPlan, LedgerRejection> {
        match self {
            Self::Consume { description } => {
                let balance = wallet
                    .map(|wallet| wallet.balance)
                    .filter(|balance| *balance > 0)
                    .ok_or(LedgerRejection::InsufficientCredits)?;
                Ok(LedgerPlan {
                    create_wallet: false,
                    entries: vec![PlannedEntry {
                        kind: TransactionType::Consume,
                        amount: CONSUME_AMOUNT,
                        description: description.clone(),
                    }],
                    new_balance: balance + CONSUME_AMOUNT,
                })
            }
            Self::Grant {
                amount,
                description,
            } => {
                if *amount <= 0 {
                    return Err(LedgerRejection::InvalidAmount { amount: *amount });
                }
                let grant = PlannedEntry {
                    kind: TransactionType::Add,
                    amount: *amount,
                    description: description.clone(),
                };
                let mut plan = match wallet {
                    Some(wallet) => LedgerPlan {
                        create_wallet: false,
                        entries: Vec::with_capacity(1),
                        new_balance: wallet.balance,
                    },
                    None => LedgerPlan::opening(),
                };
                plan.new_balance = plan
                    .new_balance
                    .checked_add(*amount)
                    .ok_or(LedgerRejection::Overflow)?;
                plan.entries.push(grant);
                Ok(plan)
            }
        }
    }
}
