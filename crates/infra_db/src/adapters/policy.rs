//! PostgreSQL adapter for policy templates and client policies

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use core_kernel::{
    ClientId, Currency, DomainPort, HealthCheckResult, HealthCheckable, Money, Page,
    PolicyInstanceId, PolicyTemplateId, PortError,
};
use domain_policy::{
    PolicyInstance, PolicyInstancePort, PolicyQuery, PolicyStatus, PolicySummary, PolicyTemplate,
    PolicyTemplatePort,
};

use super::{parse_column, ping, to_u32};
use crate::error::DatabaseError;
use crate::repositories::policy::{
    PolicyFilter, PolicyInstanceRow, PolicyStatus as DbPolicyStatus, PolicyTemplateRow,
};
use crate::repositories::{PolicyInstanceRepository, PolicyTemplateRepository};

#[derive(Debug, Clone)]
pub struct PostgresPolicyAdapter {
    pool: PgPool,
    templates: PolicyTemplateRepository,
    policies: PolicyInstanceRepository,
    /// Currency the dashboard totals are reported in
    currency: Currency,
}

impl PostgresPolicyAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            templates: PolicyTemplateRepository::new(pool.clone()),
            policies: PolicyInstanceRepository::new(pool.clone()),
            pool,
            currency: Currency::INR,
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
}

impl DomainPort for PostgresPolicyAdapter {}

#[async_trait]
impl HealthCheckable for PostgresPolicyAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-policy-adapter").await
    }
}

#[async_trait]
impl PolicyTemplatePort for PostgresPolicyAdapter {
    #[instrument(skip(self, template), fields(template_id = %template.id))]
    async fn create_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError> {
        let row = self.templates.insert(&template_to_row(&template)).await?;
        Ok(row_to_template(row)?)
    }

    async fn get_template(&self, id: PolicyTemplateId) -> Result<PolicyTemplate, PortError> {
        Ok(row_to_template(self.templates.get_by_id(id.into()).await?)?)
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<PolicyTemplate>, PortError> {
        let rows = self.templates.list(active_only).await?;
        Ok(rows
            .into_iter()
            .map(row_to_template)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError> {
        let row = self.templates.update(&template_to_row(&template)).await?;
        Ok(row_to_template(row)?)
    }

    async fn delete_template(&self, id: PolicyTemplateId) -> Result<(), PortError> {
        self.templates.delete(id.into()).await.map_err(|e| match e {
            DatabaseError::ForeignKeyViolation(_) => PortError::conflict(
                "policy template is used by existing policies; deactivate it instead",
            ),
            other => other.into(),
        })
    }
}

#[async_trait]
impl PolicyInstancePort for PostgresPolicyAdapter {
    #[instrument(skip(self, policy), fields(policy_number = %policy.policy_number))]
    async fn create_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError> {
        let row = self
            .policies
            .insert(&policy_to_row(&policy))
            .await
            .map_err(|e| policy_write_error(e, &policy.policy_number))?;
        Ok(row_to_policy(row)?)
    }

    async fn get_policy(&self, id: PolicyInstanceId) -> Result<PolicyInstance, PortError> {
        Ok(row_to_policy(self.policies.get_by_id(id.into()).await?)?)
    }

    #[instrument(skip(self))]
    async fn list_policies(&self, query: PolicyQuery) -> Result<Page<PolicyInstance>, PortError> {
        let mut filter = PolicyFilter {
            client_id: query.client_id.map(Into::into),
            template_id: query.template_id.map(Into::into),
            status: query.status.map(status_to_db),
            ending_between: None,
            search: query
                .search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        };
        if let Some(days) = query.expiring_within_days {
            let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
            filter = filter.expiring_within(today, days);
        }

        let limit = query.page_size();
        let offset = query.offset.unwrap_or(0);
        let (rows, total) = self.policies.list(&filter, limit, offset).await?;
        debug!(count = rows.len(), total, "Listed policies");

        let items = rows
            .into_iter()
            .map(row_to_policy)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, limit, offset))
    }

    async fn update_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError> {
        let row = self
            .policies
            .update(&policy_to_row(&policy))
            .await
            .map_err(|e| policy_write_error(e, &policy.policy_number))?;
        Ok(row_to_policy(row)?)
    }

    async fn delete_policy(&self, id: PolicyInstanceId) -> Result<(), PortError> {
        Ok(self.policies.delete(id.into()).await?)
    }

    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<PolicyInstance>, PortError> {
        let rows = self.policies.list_for_client(client_id.into()).await?;
        Ok(rows
            .into_iter()
            .map(row_to_policy)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count_for_client(&self, client_id: ClientId) -> Result<u64, PortError> {
        Ok(self.policies.count_for_client(client_id.into()).await? as u64)
    }

    #[instrument(skip(self, old, new), fields(old = %old.policy_number, new = %new.policy_number))]
    async fn save_renewal(
        &self,
        old: PolicyInstance,
        new: PolicyInstance,
    ) -> Result<PolicyInstance, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        PolicyInstanceRepository::mark_renewed_in(&mut *tx, old.id.into(), old.updated_at).await?;
        let inserted = PolicyInstanceRepository::insert_in(&mut *tx, &policy_to_row(&new))
            .await
            .map_err(|e| policy_write_error(e, &new.policy_number))?;
        tx.commit().await.map_err(DatabaseError::from)?;
        info!("Policy renewed");
        Ok(row_to_policy(inserted)?)
    }

    async fn expiring_on(&self, date: NaiveDate) -> Result<Vec<PolicyInstance>, PortError> {
        let rows = self.policies.active_ending_on(date).await?;
        Ok(rows
            .into_iter()
            .map(row_to_policy)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[instrument(skip(self))]
    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, PortError> {
        let changed = self.policies.expire_before(today).await?;
        if changed > 0 {
            info!(changed, "Expired overdue policies");
        }
        Ok(changed)
    }

    async fn summary(&self, today: NaiveDate, window_days: u32) -> Result<PolicySummary, PortError> {
        let active = self
            .policies
            .active()
            .await?
            .into_iter()
            .map(row_to_policy)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PolicySummary::compute(&active, today, window_days, self.currency))
    }
}

fn policy_write_error(error: DatabaseError, policy_number: &str) -> PortError {
    match error {
        DatabaseError::DuplicateEntry(_) => {
            PortError::conflict(format!("policy number {} already exists", policy_number))
        }
        DatabaseError::ForeignKeyViolation(_) => {
            PortError::validation("policy references an unknown client or template")
        }
        other => other.into(),
    }
}

fn status_to_db(status: PolicyStatus) -> DbPolicyStatus {
    match status {
        PolicyStatus::Active => DbPolicyStatus::Active,
        PolicyStatus::Expired => DbPolicyStatus::Expired,
        PolicyStatus::Cancelled => DbPolicyStatus::Cancelled,
        PolicyStatus::Renewed => DbPolicyStatus::Renewed,
    }
}

fn status_from_db(status: DbPolicyStatus) -> PolicyStatus {
    match status {
        DbPolicyStatus::Active => PolicyStatus::Active,
        DbPolicyStatus::Expired => PolicyStatus::Expired,
        DbPolicyStatus::Cancelled => PolicyStatus::Cancelled,
        DbPolicyStatus::Renewed => PolicyStatus::Renewed,
    }
}

fn template_to_row(template: &PolicyTemplate) -> PolicyTemplateRow {
    PolicyTemplateRow {
        id: template.id.into(),
        name: template.name.clone(),
        insurer: template.insurer.clone(),
        policy_type: template.policy_type.as_str().to_string(),
        description: template.description.clone(),
        default_premium: template.default_premium.amount(),
        default_sum_insured: template.default_sum_insured.as_ref().map(Money::amount),
        currency: template.default_premium.currency().code().to_string(),
        default_term_months: i32::try_from(template.default_term_months).unwrap_or(i32::MAX),
        premium_frequency: template.premium_frequency.as_str().to_string(),
        is_active: template.is_active,
        created_at: template.created_at,
        updated_at: template.updated_at,
    }
}

fn row_to_template(row: PolicyTemplateRow) -> Result<PolicyTemplate, DatabaseError> {
    let currency: Currency = parse_column("policy_templates.currency", &row.currency)?;
    Ok(PolicyTemplate {
        id: PolicyTemplateId::from(row.id),
        name: row.name,
        insurer: row.insurer,
        policy_type: parse_column("policy_templates.policy_type", &row.policy_type)?,
        description: row.description,
        default_premium: Money::new(row.default_premium, currency),
        default_sum_insured: row.default_sum_insured.map(|amount| Money::new(amount, currency)),
        default_term_months: to_u32("policy_templates.default_term_months", row.default_term_months)?,
        premium_frequency: parse_column("policy_templates.premium_frequency", &row.premium_frequency)?,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn policy_to_row(policy: &PolicyInstance) -> PolicyInstanceRow {
    PolicyInstanceRow {
        id: policy.id.into(),
        policy_number: policy.policy_number.clone(),
        client_id: policy.client_id.into(),
        template_id: policy.template_id.into(),
        start_date: policy.start_date,
        end_date: policy.end_date,
        premium: policy.premium.amount(),
        sum_insured: policy.sum_insured.as_ref().map(Money::amount),
        currency: policy.premium.currency().code().to_string(),
        premium_frequency: policy.premium_frequency.as_str().to_string(),
        status: status_to_db(policy.status),
        notes: policy.notes.clone(),
        renewed_from: policy.renewed_from.map(Into::into),
        created_at: policy.created_at,
        updated_at: policy.updated_at,
    }
}

fn row_to_policy(row: PolicyInstanceRow) -> Result<PolicyInstance, DatabaseError> {
    let currency: Currency = parse_column("policy_instances.currency", &row.currency)?;
    Ok(PolicyInstance {
        id: PolicyInstanceId::from(row.id),
        policy_number: row.policy_number,
        client_id: ClientId::from(row.client_id),
        template_id: PolicyTemplateId::from(row.template_id),
        start_date: row.start_date,
        end_date: row.end_date,
        premium: Money::new(row.premium, currency),
        sum_insured: row.sum_insured.map(|amount| Money::new(amount, currency)),
        premium_frequency: parse_column("policy_instances.premium_frequency", &row.premium_frequency)?,
        status: status_from_db(row.status),
        notes: row.notes,
        renewed_from: row.renewed_from.map(PolicyInstanceId::from),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_policy::{NewPolicyInstance, NewPolicyTemplate, PolicyType, PremiumFrequency};
    use rust_decimal_macros::dec;

    fn template() -> PolicyTemplate {
        PolicyTemplate::new(NewPolicyTemplate {
            name: "Family Floater".into(),
            insurer: "Star Health".into(),
            policy_type: PolicyType::Health,
            description: None,
            default_premium: Money::new(dec!(450), Currency::USD),
            default_sum_insured: Some(Money::new(dec!(50000), Currency::USD)),
            default_term_months: 12,
            premium_frequency: PremiumFrequency::Quarterly,
        })
        .unwrap()
    }

    #[test]
    fn test_template_row_keeps_currency() {
        let template = template();
        let row = template_to_row(&template);
        assert_eq!(row.currency, "USD");
        assert_eq!(row.policy_type, "health");
        assert_eq!(row_to_template(row).unwrap(), template);
    }

    #[test]
    fn test_policy_row_round_trip() {
        let template = template();
        let policy = PolicyInstance::from_template(
            &template,
            NewPolicyInstance {
                policy_number: "SH-1001".into(),
                client_id: ClientId::new(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: None,
                term_months: None,
                premium: None,
                sum_insured: None,
                premium_frequency: None,
                notes: Some("family of four".into()),
            },
        )
        .unwrap();

        let row = policy_to_row(&policy);
        assert_eq!(row.status, DbPolicyStatus::Active);
        assert_eq!(row.premium, dec!(450));
        assert_eq!(row_to_policy(row).unwrap(), policy);
    }

    #[test]
    fn test_negative_term_is_corrupt() {
        let mut row = template_to_row(&template());
        row.default_term_months = -3;
        assert!(matches!(row_to_template(row), Err(DatabaseError::CorruptRow(_))));
    }
}
