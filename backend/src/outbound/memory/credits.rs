//! In-process credit ledger store.
//!
//! One async mutex guards every wallet, standing in for PostgreSQL's row
//! lock: each operation reads, plans, and writes while holding it, so the
//! same [`LedgerOperation`] rules produce the same balances as the Diesel
//! adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::credits::{
    CreditTransaction, LedgerOperation, LedgerPlan, TransactionQuery, Wallet,
};
use crate::domain::ports::{CreditRepository, CreditRepositoryError, WalletCreation};

#[derive(Debug, Default)]
struct LedgerState {
    wallets: HashMap<UserId, Wallet>,
    transactions: Vec<CreditTransaction>,
}

impl LedgerState {
    fn execute(
        &mut self,
        user_id: &UserId,
        plan: &LedgerPlan,
        clock: &dyn Clock,
    ) -> Result<Wallet, CreditRepositoryError> {
        let now = clock.utc();
        if plan.create_wallet && !self.wallets.contains_key(user_id) {
            self.wallets.insert(
                *user_id,
                Wallet {
                    id: Uuid::new_v4(),
                    user_id: *user_id,
                    balance: 0,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        let wallet = self
            .wallets
            .get_mut(user_id)
            .ok_or_else(|| CreditRepositoryError::query("wallet missing for planned entries"))?;
        for entry in &plan.entries {
            self.transactions.push(CreditTransaction {
                id: Uuid::new_v4(),
                wallet_id: wallet.id,
                user_id: *user_id,
                amount: entry.amount,
                kind: entry.kind,
                description: entry.description.clone(),
                created_at: now,
            });
        }
        wallet.balance = plan.new_balance;
        wallet.updated_at = now;
        Ok(wallet.clone())
    }
}

/// Credit repository holding wallets and ledger entries in memory.
pub struct InMemoryCreditRepository {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCreditRepository {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryCreditRepository {
    /// Empty ledger stamped by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            clock,
        }
    }

    /// Every entry recorded for `user_id`, oldest first.
    pub async fn entries_for(&self, user_id: &UserId) -> Vec<CreditTransaction> {
        let state = self.state.lock().await;
        state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == *user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CreditRepository for InMemoryCreditRepository {
    async fn find_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>, CreditRepositoryError> {
        Ok(self.state.lock().await.wallets.get(user_id).cloned())
    }

    async fn open_wallet(&self, user_id: &UserId) -> Result<WalletCreation, CreditRepositoryError> {
        let mut state = self.state.lock().await;
        if state.wallets.contains_key(user_id) {
            return Ok(WalletCreation::AlreadyExists);
        }
        let wallet = state.execute(user_id, &LedgerPlan::opening(), self.clock.as_ref())?;
        Ok(WalletCreation::Created(wallet))
    }

    async fn apply(
        &self,
        user_id: &UserId,
        operation: &LedgerOperation,
    ) -> Result<Wallet, CreditRepositoryError> {
        let mut state = self.state.lock().await;
        let plan = operation.plan(state.wallets.get(user_id))?;
        state.execute(user_id, &plan, self.clock.as_ref())
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> Result<Vec<CreditTransaction>, CreditRepositoryError> {
        let state = self.state.lock().await;
        let mut matching: Vec<CreditTransaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == *user_id && query.matches(tx))
            .cloned()
            .collect();
        // Stable: equal timestamps keep reverse insertion order.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}
