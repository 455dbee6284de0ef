//! `DieselPantryRepository` against embedded PostgreSQL.
//!
//! Covers the owner row written with the pantry, the live-row membership
//! index, soft deletes, and the ingredient reader's filters.

use std::sync::Arc;

use futures::future::join_all;
use pantry_backend::domain::ports::PantryAccess;
use pantry_backend::domain::{ErrorCode, MembershipChange, MembershipRole, PantryService, UserId};
use pantry_backend::outbound::persistence::DieselPantryRepository;
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

#[path = "support/pg_embed.rs"]
mod pg_embed;

mod support;

use pg_embed::test_cluster;
use support::{execute_sql, handle_cluster_setup_failure, migrated_database};

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    url: String,
    pantries: Arc<PantryService<DieselPantryRepository>>,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let database = migrated_database(&runtime, &cluster)?;
    let pantries = Arc::new(PantryService::new(Arc::new(DieselPantryRepository::new(
        database.pool,
    ))));
    Ok(TestContext {
        runtime,
        _cluster: cluster,
        url: database.url,
        pantries,
    })
}

#[fixture]
fn pantry_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn created_pantries_carry_a_live_owner_row(pantry_context: Option<TestContext>) {
    let Some(context) = pantry_context else {
        eprintln!("SKIP-TEST-CLUSTER: created_pantries_carry_a_live_owner_row skipped");
        return;
    };
    let owner = UserId::random();
    let stranger = UserId::random();

    context.runtime.block_on(async {
        let pantry = context
            .pantries
            .create_pantry(&owner, "  Kitchen  ")
            .await
            .expect("create");
        assert_eq!(pantry.name, "Kitchen");
        assert!(context.pantries.is_owner(&pantry.id, &owner).await.expect("owner"));
        assert!(context.pantries.is_member(&pantry.id, &owner).await.expect("member"));
        assert!(!context.pantries.is_member(&pantry.id, &stranger).await.expect("stranger"));
    });
}

#[rstest]
fn removed_members_lose_access_and_can_be_re_added(pantry_context: Option<TestContext>) {
    let Some(context) = pantry_context else {
        eprintln!("SKIP-TEST-CLUSTER: removed_members_lose_access skipped");
        return;
    };
    let owner = UserId::random();
    let guest = UserId::random();

    context.runtime.block_on(async {
        let pantries = &context.pantries;
        let pantry = pantries.create_pantry(&owner, "Shared").await.expect("create");

        let added = pantries.add_member(&owner, &pantry.id, &guest).await.expect("add");
        assert!(matches!(added, MembershipChange::Added(_)));
        let again = pantries.add_member(&owner, &pantry.id, &guest).await.expect("re-add");
        assert!(matches!(again, MembershipChange::Unchanged(_)));

        let removed = pantries
            .remove_member(&owner, &pantry.id, &guest)
            .await
            .expect("remove");
        assert_eq!(removed.user_id, guest);
        assert_eq!(removed.role, MembershipRole::Member);
        assert!(!pantries.is_member(&pantry.id, &guest).await.expect("member"));

        let error = pantries
            .list_ingredients(&guest, &pantry.id)
            .await
            .expect_err("former member");
        assert_eq!(error.code(), ErrorCode::Forbidden);

        let back = pantries.add_member(&owner, &pantry.id, &guest).await.expect("return");
        assert!(matches!(back, MembershipChange::Added(_)));
        assert!(pantries.is_member(&pantry.id, &guest).await.expect("member"));
    });
}

#[rstest]
fn concurrent_adds_leave_one_live_row(pantry_context: Option<TestContext>) {
    let Some(context) = pantry_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_adds_leave_one_live_row skipped");
        return;
    };
    let owner = UserId::random();
    let guest = UserId::random();

    let pantry = context.runtime.block_on(async {
        let pantry = context
            .pantries
            .create_pantry(&owner, "Busy")
            .await
            .expect("create");
        let tasks = (0..8).map(|_| {
            let pantries = Arc::clone(&context.pantries);
            let pantry_id = pantry.id;
            tokio::spawn(async move { pantries.add_member(&owner, &pantry_id, &guest).await })
        });
        let changes: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked").expect("add"))
            .collect();
        let inserted = changes
            .iter()
            .filter(|change| matches!(change, MembershipChange::Added(_)))
            .count();
        assert_eq!(inserted, 1);
        assert!(changes
            .iter()
            .all(|change| change.membership().user_id == guest));
        pantry
    });

    let single_live_row = format!(
        "DO $$ BEGIN IF (SELECT count(*) FROM pantry_memberships \
         WHERE pantry_id = '{}' AND user_id = '{}' AND deleted_at IS NULL) <> 1 \
         THEN RAISE EXCEPTION 'expected one live membership row'; END IF; END $$;",
        pantry.id.as_uuid(),
        guest.as_uuid()
    );
    execute_sql(&context.url, &single_live_row).expect("single live row");
}

#[rstest]
fn owners_cannot_remove_themselves(pantry_context: Option<TestContext>) {
    let Some(context) = pantry_context else {
        eprintln!("SKIP-TEST-CLUSTER: owners_cannot_remove_themselves skipped");
        return;
    };
    let owner = UserId::random();

    context.runtime.block_on(async {
        let pantry = context
            .pantries
            .create_pantry(&owner, "Mine")
            .await
            .expect("create");
        let error = context
            .pantries
            .remove_member(&owner, &pantry.id, &owner)
            .await
            .expect_err("owner stays");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert!(context.pantries.is_owner(&pantry.id, &owner).await.expect("owner"));
    });
}

#[rstest]
fn ingredient_reader_skips_empty_and_deleted_items(pantry_context: Option<TestContext>) {
    let Some(context) = pantry_context else {
        eprintln!("SKIP-TEST-CLUSTER: ingredient_reader_skips_empty_and_deleted_items skipped");
        return;
    };
    let owner = UserId::random();

    let pantry = context.runtime.block_on(async {
        context
            .pantries
            .create_pantry(&owner, "Stocked")
            .await
            .expect("create")
    });

    let pantry_id = pantry.id.as_uuid();
    let owner_id = owner.as_uuid();
    let rows = [
        ("  Tomato ", 3.0, " pcs ", false),
        ("Basil", 1.0, "bunch", false),
        ("Rice", 0.0, "kg", false),
        ("Flour", 2.0, "kg", true),
    ];
    for (name, quantity, unit, deleted) in rows {
        let deleted_at = if deleted { "now()" } else { "NULL" };
        let sql = format!(
            "INSERT INTO items (id, pantry_id, added_by, name, quantity, unit, deleted_at) \
             VALUES ('{}', '{pantry_id}', '{owner_id}', '{name}', {quantity}, '{unit}', {deleted_at})",
            Uuid::new_v4()
        );
        execute_sql(&context.url, &sql).expect("seed item");
    }

    context.runtime.block_on(async {
        let ingredients = context
            .pantries
            .list_ingredients(&owner, &pantry.id)
            .await
            .expect("ingredients");
        let seen: Vec<_> = ingredients
            .iter()
            .map(|item| (item.name.as_str(), item.unit.as_str()))
            .collect();
        assert_eq!(seen, [("Basil", "bunch"), ("Tomato", "pcs")]);
    });
}
