//! Activity log
//!
//! Every change the agent makes, and every message the automation sends,
//! leaves an activity entry. The dashboard shows the most recent ones and
//! the automation runner checks them so a reminder is not sent twice on the
//! same day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::ActivityId;

use crate::error::ClientError;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    LeadCreated,
    LeadUpdated,
    LeadDeleted,
    LeadConverted,
    ClientCreated,
    ClientUpdated,
    ClientDeleted,
    PolicyTemplateCreated,
    PolicyTemplateUpdated,
    PolicyTemplateDeleted,
    PolicyCreated,
    PolicyUpdated,
    PolicyDeleted,
    PolicyRenewed,
    PolicyCancelled,
    PoliciesExpired,
    DocumentUploaded,
    DocumentDeleted,
    WhatsAppTemplateCreated,
    WhatsAppTemplateUpdated,
    WhatsAppTemplateDeleted,
    SettingsUpdated,
    BirthdayGreetingSent,
    RenewalReminderSent,
    WhatsAppMessageSent,
}

impl ActivityType {
    pub const ALL: [ActivityType; 25] = [
        ActivityType::LeadCreated,
        ActivityType::LeadUpdated,
        ActivityType::LeadDeleted,
        ActivityType::LeadConverted,
        ActivityType::ClientCreated,
        ActivityType::ClientUpdated,
        ActivityType::ClientDeleted,
        ActivityType::PolicyTemplateCreated,
        ActivityType::PolicyTemplateUpdated,
        ActivityType::PolicyTemplateDeleted,
        ActivityType::PolicyCreated,
        ActivityType::PolicyUpdated,
        ActivityType::PolicyDeleted,
        ActivityType::PolicyRenewed,
        ActivityType::PolicyCancelled,
        ActivityType::PoliciesExpired,
        ActivityType::DocumentUploaded,
        ActivityType::DocumentDeleted,
        ActivityType::WhatsAppTemplateCreated,
        ActivityType::WhatsAppTemplateUpdated,
        ActivityType::WhatsAppTemplateDeleted,
        ActivityType::SettingsUpdated,
        ActivityType::BirthdayGreetingSent,
        ActivityType::RenewalReminderSent,
        ActivityType::WhatsAppMessageSent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::LeadCreated => "lead_created",
            ActivityType::LeadUpdated => "lead_updated",
            ActivityType::LeadDeleted => "lead_deleted",
            ActivityType::LeadConverted => "lead_converted",
            ActivityType::ClientCreated => "client_created",
            ActivityType::ClientUpdated => "client_updated",
            ActivityType::ClientDeleted => "client_deleted",
            ActivityType::PolicyTemplateCreated => "policy_template_created",
            ActivityType::PolicyTemplateUpdated => "policy_template_updated",
            ActivityType::PolicyTemplateDeleted => "policy_template_deleted",
            ActivityType::PolicyCreated => "policy_created",
            ActivityType::PolicyUpdated => "policy_updated",
            ActivityType::PolicyDeleted => "policy_deleted",
            ActivityType::PolicyRenewed => "policy_renewed",
            ActivityType::PolicyCancelled => "policy_cancelled",
            ActivityType::PoliciesExpired => "policies_expired",
            ActivityType::DocumentUploaded => "document_uploaded",
            ActivityType::DocumentDeleted => "document_deleted",
            ActivityType::WhatsAppTemplateCreated => "whats_app_template_created",
            ActivityType::WhatsAppTemplateUpdated => "whats_app_template_updated",
            ActivityType::WhatsAppTemplateDeleted => "whats_app_template_deleted",
            ActivityType::SettingsUpdated => "settings_updated",
            ActivityType::BirthdayGreetingSent => "birthday_greeting_sent",
            ActivityType::RenewalReminderSent => "renewal_reminder_sent",
            ActivityType::WhatsAppMessageSent => "whats_app_message_sent",
        }
    }

    /// Whether this entry records an outbound message
    pub fn is_message(&self) -> bool {
        matches!(
            self,
            ActivityType::BirthdayGreetingSent
                | ActivityType::RenewalReminderSent
                | ActivityType::WhatsAppMessageSent
        )
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown activity type '{}'", s)))
    }
}

/// Kind of record an activity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Lead,
    Client,
    PolicyTemplate,
    Policy,
    Document,
    WhatsAppTemplate,
    Settings,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Lead,
        EntityType::Client,
        EntityType::PolicyTemplate,
        EntityType::Policy,
        EntityType::Document,
        EntityType::WhatsAppTemplate,
        EntityType::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Lead => "lead",
            EntityType::Client => "client",
            EntityType::PolicyTemplate => "policy_template",
            EntityType::Policy => "policy",
            EntityType::Document => "document",
            EntityType::WhatsAppTemplate => "whats_app_template",
            EntityType::Settings => "settings",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown entity type '{}'", s)))
    }
}

/// An audit-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub activity_type: ActivityType,
    pub description: String,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(activity_type: ActivityType, description: impl Into<String>) -> Self {
        Self {
            id: ActivityId::new(),
            activity_type,
            description: description.into(),
            entity_type: None,
            entity_id: None,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Attaches the record this activity is about
    pub fn for_entity(mut self, entity_type: EntityType, entity_id: impl Into<Uuid>) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Overrides the timestamp; used when replaying or backdating runs
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
