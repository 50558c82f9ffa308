//! Domain Adapters
//!
//! Postgres implementations of the domain ports. Each adapter converts
//! between repository rows and domain types and maps `DatabaseError` to
//! `PortError`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClientAdapter;
//! use domain_client::ClientPort;
//!
//! let clients: Arc<dyn ClientPort> = Arc::new(PostgresClientAdapter::new(pool));
//! let client = clients.get_client(client_id).await?;
//! ```

pub mod automation;
pub mod client;
pub mod policy;

pub use automation::PostgresAutomationAdapter;
pub use client::PostgresClientAdapter;
pub use policy::PostgresPolicyAdapter;

use core_kernel::HealthCheckResult;
use sqlx::PgPool;

use crate::error::DatabaseError;

/// Runs `SELECT 1` and reports the round trip
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("Database error: {}", e)),
    }
}

/// Parses a stored enum label, reporting the column on failure
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| DatabaseError::corrupt(format!("{} '{}': {}", column, value, e)))
}

pub(crate) fn to_u32(column: &str, value: i32) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::corrupt(format!("{} is negative: {}", column, value)))
}
