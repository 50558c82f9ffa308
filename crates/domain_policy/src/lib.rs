//! Policy Domain - Templates and client policies
//!
//! # Model
//!
//! - **PolicyTemplate**: the agent's master definition of a product
//!   (insurer, type, default premium, cover and term)
//! - **PolicyInstance**: one client's policy, issued from a template
//!
//! # Policy Lifecycle
//!
//! ```text
//! Active -> Expired -> Renewed
//!        \-> Renewed
//!        \-> Cancelled
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_policy::{PolicyInstance, NewPolicyInstance, RenewalRequest};
//!
//! let mut policy = PolicyInstance::from_template(&template, NewPolicyInstance {
//!     policy_number: "LIC-778812".into(),
//!     client_id,
//!     start_date,
//!     end_date: None,
//!     term_months: None,
//!     premium: None,
//!     sum_insured: None,
//!     premium_frequency: None,
//!     notes: None,
//! })?;
//!
//! let renewed = policy.renew(RenewalRequest::default())?;
//! ```

pub mod error;
pub mod instance;
pub mod ports;
pub mod premium;
pub mod summary;
pub mod template;

pub use error::PolicyError;
pub use instance::{
    renewal_number, NewPolicyInstance, PolicyInstance, PolicyInstanceUpdate, PolicyStatus,
    RenewalRequest,
};
pub use ports::{PolicyInstancePort, PolicyQuery, PolicyTemplatePort};
pub use premium::PremiumFrequency;
pub use summary::PolicySummary;
pub use template::{NewPolicyTemplate, PolicyTemplate, PolicyTemplateUpdate, PolicyType, MAX_TERM_MONTHS};
