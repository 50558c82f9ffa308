//! Strongly-typed identifiers for CRM entities
//!
//! Newtype wrappers around UUIDs keep a lead id from being passed where a
//! client id is expected. Each id displays with a short prefix and parses
//! with or without it, so `CLI-<uuid>` and a bare `<uuid>` are both accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (v7)
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Uuid::parse_str(uuid_str)
                    .map(Self)
                    .map_err(|_| CoreError::invalid_id($prefix, s))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Sales pipeline
define_id!(LeadId, "LEAD");
define_id!(ClientId, "CLI");

// Policies
define_id!(PolicyTemplateId, "PTPL");
define_id!(PolicyInstanceId, "POL");

// Records and automation
define_id!(ActivityId, "ACT");
define_id!(DocumentId, "DOC");
define_id!(WhatsAppTemplateId, "WAT");
