//! Core Kernel - Foundational types and utilities for the agent CRM
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Strongly-typed identifiers for leads, clients, policies and the rest
//! - Money types with precise decimal arithmetic
//! - Calendar helpers for birthdays, renewals and agent-local "today"
//! - A small in-memory TTL cache
//! - Port error types for the ports-and-adapters seams

pub mod money;
pub mod calendar;
pub mod identifiers;
pub mod cache;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use calendar::{Timezone, CalendarError};
pub use identifiers::{
    LeadId, ClientId, PolicyTemplateId, PolicyInstanceId, ActivityId,
    DocumentId, WhatsAppTemplateId,
};
pub use cache::TtlCache;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth, Page,
};
pub use error::CoreError;
