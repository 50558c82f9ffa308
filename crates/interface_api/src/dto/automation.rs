//! Automation DTOs

use chrono::NaiveDate;
use serde::Deserialize;

use core_kernel::{ClientId, PolicyInstanceId, WhatsAppTemplateId};
use domain_automation::{TemplateMessageRequest, Variables};

/// Body of `POST /automation/{birthdays,renewals}`; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct RunJobRequest {
    /// Run as if today were this date
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendWhatsAppRequest {
    pub client_id: ClientId,
    pub template_id: WhatsAppTemplateId,
    pub policy_id: Option<PolicyInstanceId>,
    #[serde(default)]
    pub variables: Variables,
}

impl From<SendWhatsAppRequest> for TemplateMessageRequest {
    fn from(r: SendWhatsAppRequest) -> Self {
        TemplateMessageRequest {
            client_id: r.client_id,
            template_id: r.template_id,
            policy_id: r.policy_id,
            variables: r.variables,
        }
    }
}
