//! WhatsApp template DTOs

use serde::Deserialize;
use validator::Validate;

use core_kernel::{ClientId, PolicyInstanceId};
use domain_automation::{NewWhatsAppTemplate, TemplatePurpose, Variables, WhatsAppTemplateUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWhatsAppTemplateRequest {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    /// Template name approved with the WhatsApp provider
    #[validate(length(min = 1, max = 200))]
    pub provider_template: String,
    #[validate(length(min = 2, max = 10))]
    pub language_code: Option<String>,
    pub namespace: Option<String>,
    pub purpose: TemplatePurpose,
    #[validate(length(min = 1, max = 4096, message = "body is required"))]
    pub body: String,
    /// Placeholder order; read from the body when absent
    pub variables: Option<Vec<String>>,
}

impl From<CreateWhatsAppTemplateRequest> for NewWhatsAppTemplate {
    fn from(r: CreateWhatsAppTemplateRequest) -> Self {
        NewWhatsAppTemplate {
            name: r.name,
            provider_template: r.provider_template,
            language_code: r.language_code,
            namespace: r.namespace,
            purpose: r.purpose,
            body: r.body,
            variables: r.variables,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWhatsAppTemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub provider_template: Option<String>,
    #[validate(length(min = 2, max = 10))]
    pub language_code: Option<String>,
    pub namespace: Option<String>,
    pub purpose: Option<TemplatePurpose>,
    #[validate(length(min = 1, max = 4096))]
    pub body: Option<String>,
    pub variables: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateWhatsAppTemplateRequest> for WhatsAppTemplateUpdate {
    fn from(r: UpdateWhatsAppTemplateRequest) -> Self {
        WhatsAppTemplateUpdate {
            name: r.name,
            provider_template: r.provider_template,
            language_code: r.language_code,
            namespace: r.namespace,
            purpose: r.purpose,
            body: r.body,
            variables: r.variables,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppTemplateListParams {
    #[serde(default)]
    pub active_only: bool,
}

/// Renders a template for one client without sending it
#[derive(Debug, Deserialize)]
pub struct PreviewTemplateRequest {
    pub client_id: ClientId,
    pub policy_id: Option<PolicyInstanceId>,
    /// Extra values; override the ones derived from the client and policy
    #[serde(default)]
    pub variables: Variables,
}
