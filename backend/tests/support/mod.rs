//! Helpers shared by the Diesel adapter suites.

use diesel::pg::PgConnection;
use diesel::{Connection as _, RunQueryDsl as _};
use pantry_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Whether `SKIP_TEST_CLUSTER` is set to a truthy value.
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when `SKIP_TEST_CLUSTER` allows it, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Create an empty database on `cluster` and return its URL.
pub fn create_database(cluster: &TestCluster) -> Result<String, String> {
    let name = format!("pantry_test_{}", Uuid::new_v4().simple());
    let admin_url = cluster.connection().database_url("postgres");
    let mut conn = PgConnection::establish(&admin_url).map_err(|err| err.to_string())?;
    diesel::sql_query(format!("CREATE DATABASE \"{name}\""))
        .execute(&mut conn)
        .map_err(|err| err.to_string())?;
    Ok(cluster.connection().database_url(&name))
}

/// A freshly migrated database.
pub struct MigratedDatabase {
    pub url: String,
    pub pool: DbPool,
}

/// Migrate a fresh database and open a pool sized for concurrent callers.
pub fn migrated_database(
    runtime: &Runtime,
    cluster: &TestCluster,
) -> Result<MigratedDatabase, String> {
    let url = create_database(cluster)?;
    let pool = runtime.block_on(async {
        run_migrations(&url).await.map_err(|err| err.to_string())?;
        DbPool::new(
            PoolConfig::new(url.clone())
                .with_max_size(8)
                .with_min_idle(Some(1)),
        )
        .await
        .map_err(|err| err.to_string())
    })?;
    Ok(MigratedDatabase { url, pool })
}

/// Run raw SQL against `url` outside any adapter.
pub fn execute_sql(url: &str, sql: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| err.to_string())?;
    diesel::sql_query(sql)
        .execute(&mut conn)
        .map(|_| ())
        .map_err(|err| err.to_string())
}
