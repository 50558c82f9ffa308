//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the CRM, built on SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL, one repository per table, speaking in row types
//! - [`adapters`] implement the domain ports on top of the repositories
//! - [`pool`] creates the connection pool and applies the migrations in `migrations/`
//!
//! Lead conversion and policy renewal write two rows each; the adapters run
//! those writes in a single transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClientAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/agent_crm")).await?;
//! run_migrations(&pool).await?;
//! let clients = PostgresClientAdapter::new(pool.clone());
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresAutomationAdapter, PostgresClientAdapter, PostgresPolicyAdapter};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
