//! Credit ledger service implementing [`CreditLedger`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{CreditLedger, CreditRepository, CreditRepositoryError, WalletCreation};
use crate::domain::{Error, UserId};

use super::{LedgerOperation, LedgerRejection, TransactionFilter, TransactionPage, Wallet};

/// Ledger rules over a [`CreditRepository`].
#[derive(Clone)]
pub struct CreditService<R> {
    repo: Arc<R>,
}

impl<R> CreditService<R> {
    /// Create a new service over the given repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> CreditService<R>
where
    R: CreditRepository,
{
    fn map_repository_error(error: CreditRepositoryError) -> Error {
        debug!(kind = error.kind(), %error, "credit repository call failed");
        match error {
            CreditRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("credit ledger unavailable: {message}"))
            }
            CreditRepositoryError::Query { message } => {
                Error::internal(format!("credit ledger error: {message}"))
            }
            CreditRepositoryError::InsufficientCredits => {
                Error::insufficient_credits("insufficient credits")
            }
            CreditRepositoryError::InvalidAmount { amount } => {
                Self::invalid_amount(amount)
            }
            CreditRepositoryError::Overflow => {
                Error::invalid_credit_amount("credit balance would overflow")
            }
        }
    }

    fn invalid_amount(amount: i32) -> Error {
        Error::invalid_credit_amount("credit amount must be positive")
            .with_details(json!({ "amount": amount }))
    }
}

#[async_trait]
impl<R> CreditLedger for CreditService<R>
where
    R: CreditRepository,
{
    async fn get_wallet(&self, user_id: &UserId) -> Result<Wallet, Error> {
        if let Some(wallet) = self
            .repo
            .find_wallet(user_id)
            .await
            .map_err(Self::map_repository_error)?
        {
            return Ok(wallet);
        }

        match self
            .repo
            .open_wallet(user_id)
            .await
            .map_err(Self::map_repository_error)?
        {
            WalletCreation::Created(wallet) => {
                info!(user_id = %user_id, balance = wallet.balance, "opened credit wallet");
                Ok(wallet)
            }
            WalletCreation::AlreadyExists => self
                .repo
                .find_wallet(user_id)
                .await
                .map_err(Self::map_repository_error)?
                .ok_or_else(|| Error::internal("wallet vanished after concurrent creation")),
        }
    }

    async fn consume_credit(&self, user_id: &UserId, description: &str) -> Result<Wallet, Error> {
        let operation = LedgerOperation::consume(Some(description));
        let wallet = self
            .repo
            .apply(user_id, &operation)
            .await
            .map_err(Self::map_repository_error)?;
        info!(user_id = %user_id, balance = wallet.balance, "consumed credit");
        Ok(wallet)
    }

    async fn add_credit(
        &self,
        actor: &UserId,
        target: &UserId,
        amount: i32,
        description: &str,
    ) -> Result<Wallet, Error> {
        let operation =
            LedgerOperation::grant(amount, Some(description)).map_err(|rejection| match rejection {
                LedgerRejection::InvalidAmount { amount } => Self::invalid_amount(amount),
                other => Error::invalid_credit_amount(other.to_string()),
            })?;
        let wallet = self
            .repo
            .apply(target, &operation)
            .await
            .map_err(Self::map_repository_error)?;
        info!(
            actor = %actor,
            target = %target,
            amount,
            balance = wallet.balance,
            "granted credits"
        );
        Ok(wallet)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, Error> {
        let query = filter.normalise();
        let transactions = self
            .repo
            .list_transactions(user_id, &query)
            .await
            .map_err(Self::map_repository_error)?;
        Ok(TransactionPage {
            transactions,
            limit: query.limit,
            offset: query.offset,
        })
    }
}
