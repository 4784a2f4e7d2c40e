//! Shared test utilities for staffplan integration tests.
//!
//! Every test gets its own freshly migrated database inside one shared
//! PostgreSQL server:
//! - with **`STAFFPLAN_TEST_PG_URL`** set, that server is used as-is;
//! - otherwise a container is started through testcontainers, once per test
//!   binary, and kept alive for the life of the process.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use staffplan_db::pool;

struct SharedPg {
    base_url: String,
    /// Keeps the container running. `None` for an external server.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("STAFFPLAN_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL of the shared PostgreSQL (no database name).
pub async fn pg_url() -> &'static str {
    &SHARED_PG.get_or_init(init_shared_pg).await.base_url
}

async fn connect(url: &str, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {url}: {e}"))
}

/// A migrated, uniquely named database for one test.
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
}

impl TestDb {
    /// Create the database and apply all migrations.
    pub async fn new() -> Self {
        let base_url = pg_url().await;
        let name = format!("staffplan_test_{}", Uuid::new_v4().simple());

        let maint = connect(&format!("{base_url}/postgres"), 1).await;
        maint
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .unwrap_or_else(|e| panic!("failed to create temp database {name}: {e}"));
        maint.close().await;

        let pool = connect(&format!("{base_url}/{name}"), 5).await;
        pool::run_migrations(&pool)
            .await
            .expect("migrations should succeed");

        Self { pool, name }
    }

    /// Close the pool and drop the database.
    pub async fn teardown(self) {
        self.pool.close().await;
        drop_test_db(&self.name).await;
    }
}

/// Drop a test database, terminating any connections still open on it.
pub async fn drop_test_db(db_name: &str) {
    let base_url = pg_url().await;
    let maint = connect(&format!("{base_url}/postgres"), 1).await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint.execute(terminate.as_str()).await;
    let _ = maint
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint.close().await;
}
