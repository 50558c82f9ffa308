//! Database Test Utilities
//!
//! Starts a disposable PostgreSQL container and applies the workspace
//! migrations. Tests using it need Docker and are marked `#[ignore]`;
//! run them with `cargo test -p test_utils -- --ignored`.

use std::time::Duration;

use sqlx::PgPool;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use infra_db::{create_pool, run_migrations, DatabaseConfig};

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "crm_test";
const POSTGRES_PASSWORD: &str = "crm_test";
const POSTGRES_DB: &str = "agent_crm_test";

/// Tables truncated by [`TestDatabase::clear_data`], children first
const TABLES: [&str; 8] = [
    "activities",
    "documents",
    "policy_instances",
    "policy_templates",
    "clients",
    "leads",
    "whatsapp_templates",
    "settings",
];

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Connection details of a test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL instance that lives as long as this value
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    pub async fn start() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };
        let pool = connect_with_retry(&config).await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Empties every table, keeping the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", TABLES.join(", ")))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Postgres restarts once after initdb, so the first connection can fail
async fn connect_with_retry(config: &TestDatabaseConfig) -> TestResult<PgPool> {
    let db_config = DatabaseConfig::new(config.connection_url())
        .max_connections(5)
        .connect_timeout(Duration::from_secs(5));

    let mut attempts = 0;
    loop {
        match create_pool(db_config.clone()).await {
            Ok(pool) => return Ok(pool),
            Err(_) if attempts < 10 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Runs `$body` against a fresh database; `db` is bound to the [`TestDatabase`]
#[macro_export]
macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        #[ignore = "requires Docker"]
        async fn $name() {
            let $db = $crate::database::TestDatabase::start()
                .await
                .expect("failed to start test database");
            $body
        }
    };
}
