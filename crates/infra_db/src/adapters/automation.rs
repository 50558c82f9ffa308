//! PostgreSQL adapter for agent settings and WhatsApp templates

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, WhatsAppTemplateId};
use domain_automation::{Settings, SettingsPort, TemplatePurpose, WhatsAppTemplate, WhatsAppTemplatePort};

use super::{parse_column, ping, to_u32};
use crate::error::DatabaseError;
use crate::repositories::automation::{SettingsRow, WhatsAppTemplateRow};
use crate::repositories::{SettingsRepository, WhatsAppTemplateRepository};

#[derive(Debug, Clone)]
pub struct PostgresAutomationAdapter {
    pool: PgPool,
    settings: SettingsRepository,
    templates: WhatsAppTemplateRepository,
}

impl PostgresAutomationAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            settings: SettingsRepository::new(pool.clone()),
            templates: WhatsAppTemplateRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresAutomationAdapter {}

#[async_trait]
impl HealthCheckable for PostgresAutomationAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-automation-adapter").await
    }
}

#[async_trait]
impl SettingsPort for PostgresAutomationAdapter {
    async fn get_settings(&self) -> Result<Settings, PortError> {
        match self.settings.get().await? {
            Some(row) => Ok(row_to_settings(row)?),
            None => {
                debug!("No settings stored, using defaults");
                Ok(Settings::default())
            }
        }
    }

    #[instrument(skip(self, settings))]
    async fn save_settings(&self, settings: Settings) -> Result<Settings, PortError> {
        let row = self.settings.upsert(&settings_to_row(&settings)).await?;
        Ok(row_to_settings(row)?)
    }
}

#[async_trait]
impl WhatsAppTemplatePort for PostgresAutomationAdapter {
    #[instrument(skip(self, template), fields(name = %template.name))]
    async fn create_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError> {
        let row = self
            .templates
            .insert(&template_to_row(&template))
            .await
            .map_err(|e| name_conflict(e, &template.name))?;
        Ok(row_to_template(row)?)
    }

    async fn get_template(&self, id: WhatsAppTemplateId) -> Result<WhatsAppTemplate, PortError> {
        Ok(row_to_template(self.templates.get_by_id(id.into()).await?)?)
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<WhatsAppTemplate>, PortError> {
        let rows = self.templates.list(active_only).await?;
        Ok(rows
            .into_iter()
            .map(row_to_template)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_template(&self, template: WhatsAppTemplate) -> Result<WhatsAppTemplate, PortError> {
        let row = self
            .templates
            .update(&template_to_row(&template))
            .await
            .map_err(|e| name_conflict(e, &template.name))?;
        Ok(row_to_template(row)?)
    }

    async fn delete_template(&self, id: WhatsAppTemplateId) -> Result<(), PortError> {
        Ok(self.templates.delete(id.into()).await?)
    }

    async fn find_active_by_purpose(
        &self,
        purpose: TemplatePurpose,
    ) -> Result<Option<WhatsAppTemplate>, PortError> {
        let row = self.templates.active_for_purpose(purpose.as_str()).await?;
        Ok(row.map(row_to_template).transpose()?)
    }
}

fn name_conflict(error: DatabaseError, name: &str) -> PortError {
    match error {
        DatabaseError::DuplicateEntry(_) => {
            PortError::conflict(format!("a WhatsApp template named '{}' already exists", name))
        }
        other => other.into(),
    }
}

fn settings_to_row(settings: &Settings) -> SettingsRow {
    SettingsRow {
        agent_name: settings.agent_name.clone(),
        agency_name: settings.agency_name.clone(),
        agent_phone: settings.agent_phone.clone(),
        agent_email: settings.agent_email.clone(),
        birthday_automation_enabled: settings.birthday_automation_enabled,
        renewal_automation_enabled: settings.renewal_automation_enabled,
        renewal_reminder_days: settings
            .renewal_reminder_days
            .iter()
            .map(|&d| i32::try_from(d).unwrap_or(i32::MAX))
            .collect(),
        whatsapp_enabled: settings.whatsapp_enabled,
        email_enabled: settings.email_enabled,
        default_country_code: settings.default_country_code.clone(),
        updated_at: settings.updated_at,
    }
}

fn row_to_settings(row: SettingsRow) -> Result<Settings, DatabaseError> {
    let renewal_reminder_days = row
        .renewal_reminder_days
        .into_iter()
        .map(|d| to_u32("settings.renewal_reminder_days", d))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Settings {
        agent_name: row.agent_name,
        agency_name: row.agency_name,
        agent_phone: row.agent_phone,
        agent_email: row.agent_email,
        birthday_automation_enabled: row.birthday_automation_enabled,
        renewal_automation_enabled: row.renewal_automation_enabled,
        renewal_reminder_days,
        whatsapp_enabled: row.whatsapp_enabled,
        email_enabled: row.email_enabled,
        default_country_code: row.default_country_code,
        updated_at: row.updated_at,
    })
}

fn template_to_row(template: &WhatsAppTemplate) -> WhatsAppTemplateRow {
    WhatsAppTemplateRow {
        id: template.id.into(),
        name: template.name.clone(),
        provider_template: template.provider_template.clone(),
        language_code: template.language_code.clone(),
        namespace: template.namespace.clone(),
        purpose: template.purpose.as_str().to_string(),
        body: template.body.clone(),
        variables: template.variables.clone(),
        is_active: template.is_active,
        created_at: template.created_at,
        updated_at: template.updated_at,
    }
}

fn row_to_template(row: WhatsAppTemplateRow) -> Result<WhatsAppTemplate, DatabaseError> {
    Ok(WhatsAppTemplate {
        id: WhatsAppTemplateId::from(row.id),
        name: row.name,
        provider_template: row.provider_template,
        language_code: row.language_code,
        namespace: row.namespace,
        purpose: parse_column("whatsapp_templates.purpose", &row.purpose)?,
        body: row.body,
        variables: row.variables,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_row_round_trip() {
        let settings = Settings {
            agency_name: Some("Shah & Sons Insurance".into()),
            renewal_reminder_days: vec![45, 15, 3],
            email_enabled: false,
            ..Settings::default()
        };
        let row = settings_to_row(&settings);
        assert_eq!(row.renewal_reminder_days, vec![45, 15, 3]);
        assert_eq!(row_to_settings(row).unwrap(), settings);
    }

    #[test]
    fn test_negative_reminder_day_is_corrupt() {
        let mut row = settings_to_row(&Settings::default());
        row.renewal_reminder_days = vec![7, -1];
        assert!(matches!(row_to_settings(row), Err(DatabaseError::CorruptRow(_))));
    }
}
