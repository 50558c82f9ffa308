//! Sales leads
//!
//! A lead is a prospect the agent is working. It moves through an open
//! pipeline (`New → Contacted → Qualified → ProposalSent`) in any order the
//! agent likes, and ends either `Converted` (a client record now exists) or
//! `Lost`. A lost lead can be reopened as `New`; a converted lead is final.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientId, LeadId};

use crate::client::NewClient;
use crate::error::ClientError;
use crate::validation::{normalize_email, normalize_phone, normalize_text, ContactValidator, ValidationResult};

/// Pipeline status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    ProposalSent,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::ProposalSent,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::ProposalSent => "proposal_sent",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    /// Whether the lead is still being worked
    pub fn is_open(&self) -> bool {
        !matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }

    /// Whether a manual status change from `self` to `to` is allowed
    ///
    /// `Converted` is only reached through [`Lead::mark_converted`].
    pub fn can_transition_to(&self, to: LeadStatus) -> bool {
        match (self, to) {
            (from, to) if *from == to => true,
            (LeadStatus::Converted, _) => false,
            (_, LeadStatus::Converted) => false,
            (LeadStatus::Lost, LeadStatus::New) => true,
            (LeadStatus::Lost, _) => false,
            _ => true,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown lead status '{}'", s)))
    }
}

/// Where the lead came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Referral,
    Website,
    WalkIn,
    SocialMedia,
    Campaign,
    #[default]
    Other,
}

impl LeadSource {
    pub const ALL: [LeadSource; 6] = [
        LeadSource::Referral,
        LeadSource::Website,
        LeadSource::WalkIn,
        LeadSource::SocialMedia,
        LeadSource::Campaign,
        LeadSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Referral => "referral",
            LeadSource::Website => "website",
            LeadSource::WalkIn => "walk_in",
            LeadSource::SocialMedia => "social_media",
            LeadSource::Campaign => "campaign",
            LeadSource::Other => "other",
        }
    }
}

impl FromStr for LeadSource {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown lead source '{}'", s)))
    }
}

/// A sales prospect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub source: LeadSource,
    pub status: LeadStatus,
    /// Free-text product of interest ("term plan", "family floater", ...)
    pub interested_in: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub converted_client_id: Option<ClientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lead
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub source: LeadSource,
    pub interested_in: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

/// Partial update of a lead; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct LeadUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub interested_in: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

/// Client fields the agent may supply when converting a lead
#[derive(Debug, Clone, Default)]
pub struct ConversionDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
}

impl Lead {
    /// Creates a validated lead in the `New` status
    pub fn new(input: NewLead) -> Result<Self, ClientError> {
        let now = Utc::now();
        let lead = Self {
            id: LeadId::new(),
            name: input.name.trim().to_string(),
            email: normalize_email(input.email),
            phone: input.phone.trim().to_string(),
            source: input.source,
            status: LeadStatus::New,
            interested_in: normalize_text(input.interested_in),
            notes: normalize_text(input.notes),
            follow_up_date: input.follow_up_date,
            converted_client_id: None,
            created_at: now,
            updated_at: now,
        };
        lead.validated()
    }

    fn validated(mut self) -> Result<Self, ClientError> {
        let mut result = ValidationResult::ok();
        ContactValidator::validate_name("Name", &self.name, &mut result);
        ContactValidator::validate_email(self.email.as_deref(), &mut result);
        ContactValidator::validate_phone("Phone", &self.phone, &mut result);
        result.into_result()?;

        self.phone = normalize_phone(&self.phone).map_err(ClientError::invalid)?;
        Ok(self)
    }

    /// Applies a partial update, enforcing the status rules
    pub fn apply(mut self, update: LeadUpdate) -> Result<Self, ClientError> {
        if let Some(status) = update.status {
            self.transition_to(status)?;
        }
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.email.is_some() {
            self.email = normalize_email(update.email);
        }
        if let Some(phone) = update.phone {
            self.phone = phone.trim().to_string();
        }
        if let Some(source) = update.source {
            self.source = source;
        }
        if update.interested_in.is_some() {
            self.interested_in = normalize_text(update.interested_in);
        }
        if update.notes.is_some() {
            self.notes = normalize_text(update.notes);
        }
        if update.follow_up_date.is_some() {
            self.follow_up_date = update.follow_up_date;
        }
        self.updated_at = Utc::now();
        self.validated()
    }

    /// Changes the pipeline status
    pub fn transition_to(&mut self, status: LeadStatus) -> Result<(), ClientError> {
        if !self.status.can_transition_to(status) {
            return Err(ClientError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Builds the client record for this lead, letting `details` override
    /// or extend what the lead carries
    ///
    /// The lead's name is split on the first space into first and last
    /// name when no explicit names are given.
    pub fn to_new_client(&self, details: ConversionDetails) -> Result<NewClient, ClientError> {
        self.ensure_convertible()?;

        let (first, last) = split_name(&self.name);
        Ok(NewClient {
            first_name: details.first_name.unwrap_or(first),
            last_name: details.last_name.unwrap_or(last),
            email: details.email.or_else(|| self.email.clone()),
            phone: details.phone.unwrap_or_else(|| self.phone.clone()),
            whatsapp_number: details.whatsapp_number,
            date_of_birth: details.date_of_birth,
            address: details.address,
            city: details.city,
            occupation: details.occupation,
            notes: self.notes.clone(),
            lead_id: Some(self.id),
        })
    }

    /// Marks the lead converted into `client_id`
    pub fn mark_converted(&mut self, client_id: ClientId) -> Result<(), ClientError> {
        self.ensure_convertible()?;
        self.status = LeadStatus::Converted;
        self.converted_client_id = Some(client_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_convertible(&self) -> Result<(), ClientError> {
        match self.status {
            LeadStatus::Converted => Err(ClientError::AlreadyConverted),
            LeadStatus::Lost => Err(ClientError::LeadLost),
            _ => Ok(()),
        }
    }

    /// Whether a follow-up is scheduled on or before `today` for an open lead
    pub fn is_follow_up_due(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.follow_up_date.is_some_and(|date| date <= today)
    }
}

fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}
