//! MSG91 WhatsApp sender
//!
//! Template messages go through the bulk outbound endpoint, one recipient per
//! request. Template parameters are sent as `body_1..body_n` text components
//! in the order the template declares its variables.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use core_kernel::{DomainPort, PortError};
use domain_automation::{DeliveryReceipt, OutboundWhatsApp, WhatsAppSender};

use crate::error::ExternalError;

const SERVICE: &str = "msg91";
const DEFAULT_BASE_URL: &str = "https://api.msg91.com";
const BULK_PATH: &str = "/api/v5/whatsapp/whatsapp-outbound-message/bulk/";

#[derive(Debug, Clone)]
pub struct Msg91Config {
    pub auth_key: String,
    /// The WhatsApp business number messages are sent from
    pub integrated_number: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Msg91Config {
    pub fn new(auth_key: impl Into<String>, integrated_number: impl Into<String>) -> Self {
        Self {
            auth_key: auth_key.into(),
            integrated_number: integrated_number.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Msg91WhatsApp {
    config: Msg91Config,
    http: reqwest::Client,
}

impl Msg91WhatsApp {
    pub fn new(config: Msg91Config) -> Result<Self, ExternalError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;
        Ok(Self { config, http })
    }

    fn url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), BULK_PATH)
    }

    /// Request body for one template message
    pub fn payload(&self, message: &OutboundWhatsApp) -> Value {
        let mut components = Map::new();
        for (i, value) in message.parameters.iter().enumerate() {
            components.insert(
                format!("body_{}", i + 1),
                json!({ "type": "text", "value": value }),
            );
        }

        let mut template = json!({
            "name": message.template_name,
            "language": {
                "code": message.language_code,
                "policy": "deterministic"
            },
            "to_and_components": [{
                "to": [message.to],
                "components": components
            }]
        });
        if let Some(ref namespace) = message.namespace {
            template["namespace"] = json!(namespace);
        }

        json!({
            "integrated_number": self.config.integrated_number,
            "content_type": "template",
            "payload": {
                "messaging_product": "whatsapp",
                "type": "template",
                "template": template
            }
        })
    }
}

/// Pulls the request id out of a success body, or the error text out of a failure body
fn read_response(body: &Value) -> Result<Option<String>, String> {
    let failed = body.get("status").and_then(Value::as_str) == Some("fail")
        || body.get("hasError").and_then(Value::as_bool).unwrap_or(false);
    if failed {
        let message = body
            .get("errors")
            .or_else(|| body.get("message"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string());
        return Err(message);
    }
    Ok(body
        .get("request_id")
        .or_else(|| body.pointer("/data/request_id"))
        .and_then(Value::as_str)
        .map(str::to_string))
}

impl DomainPort for Msg91WhatsApp {}

#[async_trait]
impl WhatsAppSender for Msg91WhatsApp {
    #[instrument(skip(self, message), fields(to = %message.to, template = %message.template_name))]
    async fn send(&self, message: &OutboundWhatsApp) -> Result<DeliveryReceipt, PortError> {
        let payload = self.payload(message);
        debug!(parameters = message.parameters.len(), "Sending WhatsApp template");

        let response = self
            .http
            .post(self.url())
            .header("authkey", &self.config.auth_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(ExternalError::from_response(SERVICE, response).await.into());
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;

        let request_id = read_response(&body).map_err(|message| ExternalError::Rejected {
            service: SERVICE,
            message,
        })?;
        info!(request_id = request_id.as_deref().unwrap_or("-"), "WhatsApp template accepted");
        Ok(DeliveryReceipt::sent(SERVICE, request_id))
    }
}
