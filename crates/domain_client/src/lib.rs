//! Client Domain - Leads, clients, documents and the activity log
//!
//! This crate holds the agent's book of business before any policy is
//! involved:
//! - Leads and their pipeline status rules, including conversion to a client
//! - Client records with contact validation and birthday helpers
//! - Document metadata for files kept in external storage
//! - The activity log every change and outbound message is written to

pub mod activity;
pub mod client;
pub mod document;
pub mod error;
pub mod lead;
pub mod ports;
pub mod validation;

pub use activity::{Activity, ActivityType, EntityType};
pub use client::{Client, ClientUpdate, NewClient};
pub use document::{Document, FileUpload, StoredFile, ALLOWED_CONTENT_TYPES, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::ClientError;
pub use lead::{ConversionDetails, Lead, LeadSource, LeadStatus, LeadUpdate, NewLead};
pub use ports::{
    ActivityPort, ActivityQuery, ClientPort, ClientQuery, DocumentPort, DocumentStorePort,
    LeadPort, LeadQuery,
};
pub use validation::{ContactValidator, ValidationResult};
