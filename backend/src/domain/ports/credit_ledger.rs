//! Driving port for the credit ledger.
//!
//! Inbound adapters (HTTP handlers, the credit guard) and the AI pipeline
//! reach the ledger through this trait so they never see the repository.

use async_trait::async_trait;

use crate::domain::credits::{TransactionFilter, TransactionPage, Wallet};
use crate::domain::{Error, UserId};

/// Ledger use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Return the user's wallet, creating it with the opening grant on first
    /// access.
    async fn get_wallet(&self, user_id: &UserId) -> Result<Wallet, Error>;

    /// Spend one credit. Missing wallets and empty balances both fail with
    /// `INSUFFICIENT_CREDITS`.
    async fn consume_credit(&self, user_id: &UserId, description: &str) -> Result<Wallet, Error>;

    /// Grant `amount` credits to `target`. Authorisation of `actor` happens
    /// at the caller; the ledger only records who asked.
    async fn add_credit(
        &self,
        actor: &UserId,
        target: &UserId,
        amount: i32,
        description: &str,
    ) -> Result<Wallet, Error>;

    /// Page through the user's history, newest first.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, Error>;

    /// Advisory pre-check used before starting metered work.
    async fn ensure_credits(&self, user_id: &UserId) -> Result<Wallet, Error> {
        let wallet = self.get_wallet(user_id).await?;
        if wallet.balance <= 0 {
            return Err(Error::insufficient_credits("insufficient credits"));
        }
        Ok(wallet)
    }
}
