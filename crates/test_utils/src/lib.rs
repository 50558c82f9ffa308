//! Test Utilities Crate
//!
//! Shared test infrastructure for the agent CRM test suite.
//!
//! # Modules
//!
//! - `fixtures`: fixed dates, contacts and settings used across tests
//! - `builders`: builders for leads, clients, policy templates and policies
//! - `database`: a throwaway Postgres container with migrations applied
//! - `generators`: proptest strategies for contact data and dates

pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
