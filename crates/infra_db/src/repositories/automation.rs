//! Settings and WhatsApp template repositories

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const SETTINGS_COLUMNS: &str = "agent_name, agency_name, agent_phone, agent_email, \
     birthday_automation_enabled, renewal_automation_enabled, renewal_reminder_days, \
     whatsapp_enabled, email_enabled, default_country_code, updated_at";

const TEMPLATE_COLUMNS: &str = "id, name, provider_template, language_code, namespace, purpose, \
     body, variables, is_active, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRow {
    pub agent_name: String,
    pub agency_name: Option<String>,
    pub agent_phone: Option<String>,
    pub agent_email: Option<String>,
    pub birthday_automation_enabled: bool,
    pub renewal_automation_enabled: bool,
    pub renewal_reminder_days: Vec<i32>,
    pub whatsapp_enabled: bool,
    pub email_enabled: bool,
    pub default_country_code: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WhatsAppTemplateRow {
    pub id: Uuid,
    pub name: String,
    pub provider_template: String,
    pub language_code: String,
    pub namespace: Option<String>,
    pub purpose: String,
    pub body: String,
    pub variables: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single settings row
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<SettingsRow>, DatabaseError> {
        let row = sqlx::query_as::<_, SettingsRow>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM settings WHERE id = 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert(&self, row: &SettingsRow) -> Result<SettingsRow, DatabaseError> {
        let saved = sqlx::query_as::<_, SettingsRow>(&format!(
            "INSERT INTO settings (id, {SETTINGS_COLUMNS}) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET \
                 agent_name = EXCLUDED.agent_name, \
                 agency_name = EXCLUDED.agency_name, \
                 agent_phone = EXCLUDED.agent_phone, \
                 agent_email = EXCLUDED.agent_email, \
                 birthday_automation_enabled = EXCLUDED.birthday_automation_enabled, \
                 renewal_automation_enabled = EXCLUDED.renewal_automation_enabled, \
                 renewal_reminder_days = EXCLUDED.renewal_reminder_days, \
                 whatsapp_enabled = EXCLUDED.whatsapp_enabled, \
                 email_enabled = EXCLUDED.email_enabled, \
                 default_country_code = EXCLUDED.default_country_code, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(&row.agent_name)
        .bind(&row.agency_name)
        .bind(&row.agent_phone)
        .bind(&row.agent_email)
        .bind(row.birthday_automation_enabled)
        .bind(row.renewal_automation_enabled)
        .bind(&row.renewal_reminder_days)
        .bind(row.whatsapp_enabled)
        .bind(row.email_enabled)
        .bind(&row.default_country_code)
        .bind(row.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}

#[derive(Debug, Clone)]
pub struct WhatsAppTemplateRepository {
    pool: PgPool,
}

impl WhatsAppTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &WhatsAppTemplateRow) -> Result<WhatsAppTemplateRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, WhatsAppTemplateRow>(&format!(
            "INSERT INTO whatsapp_templates ({TEMPLATE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.provider_template)
        .bind(&row.language_code)
        .bind(&row.namespace)
        .bind(&row.purpose)
        .bind(&row.body)
        .bind(&row.variables)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<WhatsAppTemplateRow, DatabaseError> {
        sqlx::query_as::<_, WhatsAppTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM whatsapp_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("WhatsAppTemplate", id))
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<WhatsAppTemplateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, WhatsAppTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM whatsapp_templates \
             WHERE is_active OR NOT $1 ORDER BY name"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(&self, row: &WhatsAppTemplateRow) -> Result<WhatsAppTemplateRow, DatabaseError> {
        sqlx::query_as::<_, WhatsAppTemplateRow>(&format!(
            "UPDATE whatsapp_templates SET name = $2, provider_template = $3, language_code = $4, \
             namespace = $5, purpose = $6, body = $7, variables = $8, is_active = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.provider_template)
        .bind(&row.language_code)
        .bind(&row.namespace)
        .bind(&row.purpose)
        .bind(&row.body)
        .bind(&row.variables)
        .bind(row.is_active)
        .bind(row.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("WhatsAppTemplate", row.id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM whatsapp_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("WhatsAppTemplate", id));
        }
        Ok(())
    }

    /// The most recently updated active template for `purpose`
    pub async fn active_for_purpose(&self, purpose: &str) -> Result<Option<WhatsAppTemplateRow>, DatabaseError> {
        let row = sqlx::query_as::<_, WhatsAppTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM whatsapp_templates \
             WHERE is_active AND purpose = $1 ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
