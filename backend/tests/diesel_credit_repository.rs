//! `DieselCreditRepository` against embedded PostgreSQL.
//!
//! Runs the ledger's concurrency laws through the row-locked SQL path rather
//! than the in-memory adapter.

use std::sync::Arc;

use futures::future::join_all;
use pantry_backend::domain::credits::TransactionFilter;
use pantry_backend::domain::ports::CreditLedger;
use pantry_backend::domain::{CreditService, ErrorCode, TransactionType, UserId};
use pantry_backend::outbound::persistence::DieselCreditRepository;
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::{Builder, Runtime};

#[path = "support/pg_embed.rs"]
mod pg_embed;

mod support;

use pg_embed::test_cluster;
use support::{handle_cluster_setup_failure, migrated_database};

type Service = CreditService<DieselCreditRepository>;

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    ledger: Arc<Service>,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let database = migrated_database(&runtime, &cluster)?;
    let ledger = Arc::new(CreditService::new(Arc::new(DieselCreditRepository::new(
        database.pool,
    ))));
    Ok(TestContext {
        runtime,
        _cluster: cluster,
        ledger,
    })
}

#[fixture]
fn ledger_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

async fn history(ledger: &Service, user: &UserId) -> Vec<(TransactionType, i32, String)> {
    let filter = TransactionFilter {
        limit: Some(200),
        ..TransactionFilter::default()
    };
    ledger
        .list_transactions(user, &filter)
        .await
        .expect("history")
        .transactions
        .into_iter()
        .map(|tx| (tx.kind, tx.amount, tx.description))
        .collect()
}

#[rstest]
#[case(20, 5)]
#[case(3, 5)]
fn concurrent_consumes_never_overspend(
    ledger_context: Option<TestContext>,
    #[case] callers: usize,
    #[case] balance: i32,
) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_consumes_never_overspend skipped");
        return;
    };
    let ledger = Arc::clone(&context.ledger);
    let user = UserId::random();

    context.runtime.block_on(async {
        let wallet = ledger.get_wallet(&user).await.expect("open wallet");
        for _ in balance..wallet.balance {
            ledger.consume_credit(&user, "setup").await.expect("setup consume");
        }

        let tasks = (0..callers).map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.consume_credit(&user, "parallel").await })
        });
        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        let budget = usize::try_from(balance).expect("non-negative balance");
        let successes = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, callers.min(budget));
        assert!(results.iter().all(|result| {
            result
                .as_ref()
                .map_or_else(|error| error.code() == ErrorCode::InsufficientCredits, |_| true)
        }));

        let wallet = ledger.get_wallet(&user).await.expect("wallet");
        let expected = i32::try_from(budget.saturating_sub(callers)).expect("small balance");
        assert_eq!(wallet.balance, expected);

        let parallel_rows = history(&ledger, &user)
            .await
            .into_iter()
            .filter(|(kind, amount, description)| {
                *kind == TransactionType::Consume && *amount == -1 && description == "parallel"
            })
            .count();
        assert_eq!(parallel_rows, successes);
    });
}

#[rstest]
fn concurrent_first_use_opens_one_wallet(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_first_use_opens_one_wallet skipped");
        return;
    };
    let ledger = Arc::clone(&context.ledger);
    let user = UserId::random();

    context.runtime.block_on(async {
        let tasks = (0..16).map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.get_wallet(&user).await })
        });
        let wallets: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked").expect("wallet"))
            .collect();

        let first = wallets.first().expect("at least one wallet");
        assert!(wallets.iter().all(|wallet| wallet.id == first.id));
        assert!(wallets.iter().all(|wallet| wallet.balance == 10));

        assert_eq!(
            history(&ledger, &user).await,
            vec![(
                TransactionType::Add,
                10,
                "Initial credit allocation".to_owned()
            )]
        );
    });
}

#[rstest]
fn grants_open_missing_wallets_and_history_is_newest_first(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: grants_open_missing_wallets skipped");
        return;
    };
    let ledger = Arc::clone(&context.ledger);
    let admin = UserId::random();
    let user = UserId::random();

    context.runtime.block_on(async {
        let wallet = ledger
            .add_credit(&admin, &user, 5, "  ")
            .await
            .expect("grant");
        assert_eq!(wallet.balance, 15);

        ledger.consume_credit(&user, "").await.expect("consume");

        assert_eq!(
            history(&ledger, &user).await,
            vec![
                (TransactionType::Consume, -1, "LLM request".to_owned()),
                (TransactionType::Add, 5, "Manual credit adjustment".to_owned()),
                (TransactionType::Add, 10, "Initial credit allocation".to_owned()),
            ]
        );

        let consumes_only = TransactionFilter {
            kind: Some("CONSUME".to_owned()),
            ..TransactionFilter::default()
        };
        let page = ledger
            .list_transactions(&user, &consumes_only)
            .await
            .expect("filtered");
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.limit, 50);
    });
}

#[rstest]
fn consuming_without_a_wallet_is_refused(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: consuming_without_a_wallet_is_refused skipped");
        return;
    };
    let ledger = Arc::clone(&context.ledger);
    let user = UserId::random();

    context.runtime.block_on(async {
        let error = ledger
            .consume_credit(&user, "early")
            .await
            .expect_err("no wallet yet");
        assert_eq!(error.code(), ErrorCode::InsufficientCredits);
        assert!(history(&ledger, &user).await.is_empty());
    });
}
