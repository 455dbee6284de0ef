//! Port for wallet and ledger persistence.
//!
//! Adapters own the transactional scope: every mutating call locks the
//! wallet row (or establishes that it is absent) before reading it, asks the
//! operation for its [`crate::domain::credits::LedgerPlan`], and commits the
//! wallet update with its appended entries atomically.

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::credits::{
    CreditTransaction, LedgerOperation, LedgerRejection, TransactionQuery, Wallet,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by credit repository adapters.
    pub enum CreditRepositoryError {
        /// Connection could not be established.
        Connection { message: String } => "credit repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "credit repository query failed: {message}",
        /// The wallet cannot cover the operation.
        InsufficientCredits => "insufficient credits",
        /// The grant amount was not positive.
        InvalidAmount { amount: i32 } => "credit amount must be positive, got {amount}",
        /// Applying the grant would overflow the balance.
        Overflow => "credit balance would overflow",
    }
}

impl From<LedgerRejection> for CreditRepositoryError {
    fn from(value: LedgerRejection) -> Self {
        match value {
            LedgerRejection::InsufficientCredits => Self::insufficient_credits(),
            LedgerRejection::InvalidAmount { amount } => Self::invalid_amount(amount),
            LedgerRejection::Overflow => Self::overflow(),
        }
    }
}

/// Outcome of attempting to open a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCreation {
    /// This call inserted the wallet and its opening grant.
    Created(Wallet),
    /// Another writer won the race on the unique `user_id` index.
    AlreadyExists,
}

/// Port for wallet and transaction storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Read the user's wallet without locking.
    async fn find_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>, CreditRepositoryError>;

    /// Insert a wallet with the opening grant in one transaction.
    ///
    /// A unique violation on `user_id` yields [`WalletCreation::AlreadyExists`]
    /// rather than an error so callers can re-read.
    async fn open_wallet(&self, user_id: &UserId) -> Result<WalletCreation, CreditRepositoryError>;

    /// Apply `operation` under a row-exclusive lock and return the updated
    /// wallet.
    async fn apply(
        &self,
        user_id: &UserId,
        operation: &LedgerOperation,
    ) -> Result<Wallet, CreditRepositoryError>;

    /// Page through the user's entries, newest first.
    ///
    /// Ordering is `created_at DESC, id DESC`.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> Result<Vec<CreditTransaction>, CreditRepositoryError>;
}
