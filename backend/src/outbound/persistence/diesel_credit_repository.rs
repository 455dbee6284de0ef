//! PostgreSQL-backed `CreditRepository` implementation using Diesel ORM.
//!
//! Every mutation runs in one transaction: the wallet row is read with
//! `SELECT ... FOR UPDATE`, the domain's [`LedgerOperation`] decides the
//! writes, and the wallet update plus its ledger entries commit together.
//! Concurrent consumes for the same user therefore serialise on the row lock.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::credits::{
    CreditTransaction, LedgerOperation, LedgerPlan, LedgerRejection, TransactionQuery,
    TransactionType, Wallet,
};
use crate::domain::ports::{CreditRepository, CreditRepositoryError, WalletCreation};

use super::diesel_helpers::{
    collect_rows, is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{CreditTransactionRow, NewCreditTransactionRow, NewWalletRow, WalletRow};
use super::pool::{DbPool, PoolError};
use super::schema::{credit_transactions, wallets};

/// A grant that races a lazy wallet creation retries once; the second pass
/// finds the committed row under its lock.
const GRANT_ATTEMPTS: usize = 2;

/// Diesel-backed implementation of the `CreditRepository` port.
#[derive(Clone)]
pub struct DieselCreditRepository {
    pool: DbPool,
}

impl DieselCreditRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CreditRepositoryError {
    map_basic_pool_error(error, CreditRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CreditRepositoryError {
    map_basic_diesel_error(
        error,
        CreditRepositoryError::query,
        CreditRepositoryError::connection,
    )
}

/// Failure inside a ledger transaction.
#[derive(Debug)]
enum LedgerTxError {
    Pool(PoolError),
    Diesel(diesel::result::Error),
    Rejected(LedgerRejection),
}

impl From<diesel::result::Error> for LedgerTxError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<LedgerTxError> for CreditRepositoryError {
    fn from(value: LedgerTxError) -> Self {
        match value {
            LedgerTxError::Pool(error) => map_pool_error(error),
            LedgerTxError::Diesel(error) => map_diesel_error(error),
            LedgerTxError::Rejected(rejection) => rejection.into(),
        }
    }
}

fn row_to_wallet(row: WalletRow) -> Wallet {
    Wallet {
        id: row.id,
        user_id: UserId::from(row.user_id),
        balance: row.balance,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_transaction(row: CreditTransactionRow) -> Result<CreditTransaction, String> {
    let kind = TransactionType::parse(&row.kind)
        .ok_or_else(|| format!("unknown transaction type `{}` on {}", row.kind, row.id))?;
    Ok(CreditTransaction {
        id: row.id,
        wallet_id: row.wallet_id,
        user_id: UserId::from(row.user_id),
        amount: row.amount,
        kind,
        description: row.description,
        created_at: row.created_at,
    })
}

async fn lock_wallet(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Option<WalletRow>, diesel::result::Error> {
    wallets::table
        .filter(wallets::user_id.eq(user_id))
        .select(WalletRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// Write `plan` for `user_id`. `locked` is the row read under `FOR UPDATE`,
/// or `None` when the plan opens the wallet.
async fn execute_plan(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    locked: Option<WalletRow>,
    plan: &LedgerPlan,
) -> Result<WalletRow, diesel::result::Error> {
    let wallet_id = match locked {
        Some(row) => row.id,
        None if plan.create_wallet => {
            let new_wallet = NewWalletRow {
                id: Uuid::new_v4(),
                user_id,
                balance: 0,
            };
            diesel::insert_into(wallets::table)
                .values(&new_wallet)
                .execute(conn)
                .await?;
            new_wallet.id
        }
        None => return Err(diesel::result::Error::NotFound),
    };

    for entry in &plan.entries {
        let row = NewCreditTransactionRow {
            id: Uuid::new_v4(),
            wallet_id,
            user_id,
            amount: entry.amount,
            kind: entry.kind.as_str(),
            description: &entry.description,
        };
        diesel::insert_into(credit_transactions::table)
            .values(&row)
            .execute(conn)
            .await?;
    }

    diesel::update(wallets::table.find(wallet_id))
        .set((
            wallets::balance.eq(plan.new_balance),
            wallets::updated_at.eq(diesel::dsl::now),
        ))
        .returning(WalletRow::as_returning())
        .get_result(conn)
        .await
}

impl DieselCreditRepository {
    async fn apply_once(
        &self,
        user_id: Uuid,
        operation: &LedgerOperation,
    ) -> Result<WalletRow, LedgerTxError> {
        let mut conn = self.pool.get().await.map_err(LedgerTxError::Pool)?;
        conn.transaction(|conn| {
            async move {
                let locked = lock_wallet(conn, user_id).await?;
                let current = locked.clone().map(row_to_wallet);
                let plan = operation
                    .plan(current.as_ref())
                    .map_err(LedgerTxError::Rejected)?;
                Ok(execute_plan(conn, user_id, locked, &plan).await?)
            }
            .scope_boxed()
        })
        .await
    }
}

#[async_trait]
impl CreditRepository for DieselCreditRepository {
    async fn find_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>, CreditRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<WalletRow> = wallets::table
            .filter(wallets::user_id.eq(user_id.as_uuid()))
            .select(WalletRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_wallet))
    }

    async fn open_wallet(&self, user_id: &UserId) -> Result<WalletCreation, CreditRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = *user_id.as_uuid();
        let plan = LedgerPlan::opening();
        let result = conn
            .transaction(|conn| {
                async move { execute_plan(conn, user_id, None, &plan).await }.scope_boxed()
            })
            .await;
        match result {
            Ok(row) => Ok(WalletCreation::Created(row_to_wallet(row))),
            Err(error) if is_unique_violation(&error) => {
                debug!(%user_id, "wallet already opened by a concurrent request");
                Ok(WalletCreation::AlreadyExists)
            }
            Err(error) => Err(map_diesel_error(error)),
        }
    }

    async fn apply(
        &self,
        user_id: &UserId,
        operation: &LedgerOperation,
    ) -> Result<Wallet, CreditRepositoryError> {
        let user_id = *user_id.as_uuid();
        let mut attempt = 1;
        loop {
            match self.apply_once(user_id, operation).await {
                Ok(row) => return Ok(row_to_wallet(row)),
                Err(LedgerTxError::Diesel(error))
                    if is_unique_violation(&error) && attempt < GRANT_ATTEMPTS =>
                {
                    debug!(%user_id, attempt, "wallet created concurrently; retrying under lock");
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> Result<Vec<CreditTransaction>, CreditRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut statement = credit_transactions::table
            .filter(credit_transactions::user_id.eq(user_id.as_uuid()))
            .select(CreditTransactionRow::as_select())
            .into_boxed();
        if let Some(kind) = &query.kind {
            statement = statement.filter(credit_transactions::kind.eq(kind.clone()));
        }
        if let Some(from) = query.from {
            statement = statement.filter(credit_transactions::created_at.ge(from));
        }
        if let Some(to) = query.to {
            statement = statement.filter(credit_transactions::created_at.le(to));
        }
        let rows: Vec<CreditTransactionRow> = statement
            .order_by((
                credit_transactions::created_at.desc(),
                credit_transactions::id.desc(),
            ))
            .limit(query.limit)
            .offset(query.offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(
            rows.into_iter().map(row_to_transaction),
            CreditRepositoryError::query,
        )
    }
}
