//! Automation Domain Ports
//!
//! Storage for the settings record and WhatsApp templates. Message
//! channels live in [`crate::channels`].

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PortError, WhatsAppTemplateId};

use crate::settings::Settings;
use crate::whatsapp_template::{TemplatePurpose, WhatsAppTemplate};

#[async_trait]
pub trait SettingsPort: DomainPort + HealthCheckable {
    /// The stored settings, or the defaults when nothing was saved yet
    async fn get_settings(&self) -> Result<Settings, PortError>;

    async fn save_settings(&self, settings: Settings) -> Result<Settings, PortError>;
}

#[async_trait]
pub trait WhatsAppTemplatePort: DomainPort + HealthCheckable {
    /// Fails with `PortError::Conflict` when the name is taken
    async fn create_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError>;

    async fn get_template(&self, id: WhatsAppTemplateId) -> Result<WhatsAppTemplate, PortError>;

    /// Ordered by name
    async fn list_templates(&self, active_only: bool) -> Result<Vec<WhatsAppTemplate>, PortError>;

    async fn update_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError>;

    async fn delete_template(&self, id: WhatsAppTemplateId) -> Result<(), PortError>;

    /// The most recently updated active template for `purpose`
    async fn find_active_by_purpose(
        &self,
        purpose: TemplatePurpose,
    ) -> Result<Option<WhatsAppTemplate>, PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory settings and template store
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryAutomationStore {
        settings: Arc<RwLock<Option<Settings>>>,
        templates: Arc<RwLock<HashMap<WhatsAppTemplateId, WhatsAppTemplate>>>,
    }

    impl InMemoryAutomationStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_settings(settings: Settings) -> Self {
            let store = Self::new();
            *store.settings.write().await = Some(settings);
            store
        }
    }

    impl DomainPort for InMemoryAutomationStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryAutomationStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-automation-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl SettingsPort for InMemoryAutomationStore {
        async fn get_settings(&self) -> Result<Settings, PortError> {
            Ok(self.settings.read().await.clone().unwrap_or_default())
        }

        async fn save_settings(&self, settings: Settings) -> Result<Settings, PortError> {
            *self.settings.write().await = Some(settings.clone());
            Ok(settings)
        }
    }

    #[async_trait]
    impl WhatsAppTemplatePort for InMemoryAutomationStore {
        async fn create_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError> {
            let mut templates = self.templates.write().await;
            if templates.values().any(|t| t.name.eq_ignore_ascii_case(&template.name)) {
                return Err(PortError::conflict(format!(
                    "a WhatsApp template named '{}' already exists",
                    template.name
                )));
            }
            templates.insert(template.id, template.clone());
            Ok(template)
        }

        async fn get_template(&self, id: WhatsAppTemplateId) -> Result<WhatsAppTemplate, PortError> {
            self.templates
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("WhatsAppTemplate", id))
        }

        async fn list_templates(&self, active_only: bool) -> Result<Vec<WhatsAppTemplate>, PortError> {
            let templates = self.templates.read().await;
            let mut list: Vec<WhatsAppTemplate> = templates
                .values()
                .filter(|t| !active_only || t.is_active)
                .cloned()
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(list)
        }

        async fn update_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError> {
            let mut templates = self.templates.write().await;
            if !templates.contains_key(&template.id) {
                return Err(PortError::not_found("WhatsAppTemplate", template.id));
            }
            if templates
                .values()
                .any(|t| t.id != template.id && t.name.eq_ignore_ascii_case(&template.name))
            {
                return Err(PortError::conflict(format!(
                    "a WhatsApp template named '{}' already exists",
                    template.name
                )));
            }
            templates.insert(template.id, template.clone());
            Ok(template)
        }

        async fn delete_template(&self, id: WhatsAppTemplateId) -> Result<(), PortError> {
            self.templates
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("WhatsAppTemplate", id))
        }

        async fn find_active_by_purpose(
            &self,
            purpose: TemplatePurpose,
        ) -> Result<Option<WhatsAppTemplate>, PortError> {
            let templates = self.templates.read().await;
            Ok(templates
                .values()
                .filter(|t| t.is_active && t.purpose == purpose)
                .max_by_key(|t| t.updated_at)
                .cloned())
        }
    }
}
