//! Concurrency laws of the credit ledger on a multi-threaded runtime.

use std::sync::Arc;

use futures::future::join_all;
use pantry_backend::domain::ports::CreditLedger;
use pantry_backend::domain::{CreditService, ErrorCode, TransactionType, UserId};
use pantry_backend::outbound::memory::InMemoryCreditRepository;
use rstest::{fixture, rstest};

struct Ledger {
    repo: Arc<InMemoryCreditRepository>,
    service: Arc<CreditService<InMemoryCreditRepository>>,
}

#[fixture]
fn ledger() -> Ledger {
    let repo = Arc::new(InMemoryCreditRepository::default());
    let service = Arc::new(CreditService::new(Arc::clone(&repo)));
    Ledger { repo, service }
}

async fn drain_to(ledger: &Ledger, user: &UserId, balance: i32) {
    let wallet = ledger.service.get_wallet(user).await.expect("wallet");
    for _ in balance..wallet.balance {
        ledger
            .service
            .consume_credit(user, "setup")
            .await
            .expect("setup consume");
    }
}

async fn consume_rows(ledger: &Ledger, user: &UserId) -> usize {
    ledger
        .repo
        .entries_for(user)
        .await
        .iter()
        .filter(|tx| tx.kind == TransactionType::Consume)
        .count()
}

#[rstest]
#[case(20, 5)]
#[case(3, 5)]
#[case(5, 5)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumes_never_overspend(
    ledger: Ledger,
    #[case] callers: usize,
    #[case] balance: i32,
) {
    let user = UserId::random();
    drain_to(&ledger, &user, balance).await;
    let rows_before = consume_rows(&ledger, &user).await;

    let tasks = (0..callers).map(|_| {
        let service = Arc::clone(&ledger.service);
        tokio::spawn(async move { service.consume_credit(&user, "parallel").await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let budget = usize::try_from(balance).expect("non-negative balance");
    let successes = results.iter().filter(|result| result.is_ok()).count();
    let refusals = results
        .iter()
        .filter(|result| {
            result
                .as_ref()
                .is_err_and(|error| error.code() == ErrorCode::InsufficientCredits)
        })
        .count();
    assert_eq!(successes, callers.min(budget));
    assert_eq!(refusals, callers.saturating_sub(budget));

    let wallet = ledger.service.get_wallet(&user).await.expect("wallet");
    let expected = budget.saturating_sub(callers);
    assert_eq!(wallet.balance, i32::try_from(expected).expect("small balance"));
    assert_eq!(consume_rows(&ledger, &user).await - rows_before, successes);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_opens_one_wallet(ledger: Ledger) {
    let user = UserId::random();
    let tasks = (0..16).map(|_| {
        let service = Arc::clone(&ledger.service);
        tokio::spawn(async move { service.get_wallet(&user).await })
    });
    let wallets: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("wallet"))
        .collect();

    let first = wallets.first().expect("at least one wallet");
    assert!(wallets.iter().all(|wallet| wallet.id == first.id));
    assert!(wallets.iter().all(|wallet| wallet.balance == 10));

    let entries = ledger.repo.entries_for(&user).await;
    assert_eq!(entries.len(), 1);
    let opening = entries.first().expect("opening grant");
    assert_eq!(opening.kind, TransactionType::Add);
    assert_eq!(opening.amount, 10);
    assert_eq!(opening.description, "Initial credit allocation");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_grants_and_consumes_balance_out(ledger: Ledger) {
    let user = UserId::random();
    let admin = UserId::random();
    drain_to(&ledger, &user, 0).await;

    let consumers = (0..12).map(|_| {
        let service = Arc::clone(&ledger.service);
        tokio::spawn(async move { service.consume_credit(&user, "parallel").await.is_ok() })
    });
    let granters = (0..4).map(|_| {
        let service = Arc::clone(&ledger.service);
        tokio::spawn(async move {
            service
                .add_credit(&admin, &user, 2, "top-up")
                .await
                .expect("grant");
        })
    });
    let (consumed, granted) = futures::join!(join_all(consumers), join_all(granters));
    for joined in granted {
        joined.expect("grant task panicked");
    }
    let successes = consumed
        .into_iter()
        .map(|joined| joined.expect("consume task panicked"))
        .filter(|ok| *ok)
        .count();

    let wallet = ledger.service.get_wallet(&user).await.expect("wallet");
    let successes = i32::try_from(successes).expect("small count");
    assert!(wallet.balance >= 0);
    assert_eq!(wallet.balance, 8 - successes);

    let entries = ledger.repo.entries_for(&user).await;
    assert!(
        entries
            .windows(2)
            .all(|pair| pair[0].created_at <= pair[1].created_at),
        "ledger must be ordered by commit time"
    );
}
