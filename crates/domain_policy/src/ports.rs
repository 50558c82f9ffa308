//! Policy Domain Ports
//!
//! Storage interfaces for policy templates and client policies. The
//! Postgres adapters live in `infra_db`; in-memory adapters behind the
//! `mock` feature back handler and automation tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    ClientId, DomainPort, HealthCheckable, Page, PolicyInstanceId, PolicyTemplateId, PortError,
};

use crate::instance::{PolicyInstance, PolicyStatus};
use crate::summary::PolicySummary;
use crate::template::PolicyTemplate;

/// Default page size for policy listings
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Query parameters for listing policies
#[derive(Debug, Clone, Default)]
pub struct PolicyQuery {
    pub client_id: Option<ClientId>,
    pub template_id: Option<PolicyTemplateId>,
    pub status: Option<PolicyStatus>,
    /// Active policies ending within this many days of `today`
    pub expiring_within_days: Option<u32>,
    pub today: Option<NaiveDate>,
    /// Matches the policy number
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PolicyQuery {
    pub fn for_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    pub fn expiring_within(days: u32, today: NaiveDate) -> Self {
        Self {
            expiring_within_days: Some(days),
            today: Some(today),
            ..Default::default()
        }
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200)
    }

    pub fn matches(&self, policy: &PolicyInstance) -> bool {
        if self.client_id.is_some_and(|id| policy.client_id != id) {
            return false;
        }
        if self.template_id.is_some_and(|id| policy.template_id != id) {
            return false;
        }
        if self.status.is_some_and(|status| policy.status != status) {
            return false;
        }
        if let (Some(days), Some(today)) = (self.expiring_within_days, self.today) {
            if !policy.is_expiring_within(today, days) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !policy.policy_number.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Template storage
#[async_trait]
pub trait PolicyTemplatePort: DomainPort + HealthCheckable {
    async fn create_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError>;

    async fn get_template(&self, id: PolicyTemplateId) -> Result<PolicyTemplate, PortError>;

    /// Ordered by name
    async fn list_templates(&self, active_only: bool) -> Result<Vec<PolicyTemplate>, PortError>;

    async fn update_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError>;

    /// Fails with `PortError::Conflict` while policies reference the template
    async fn delete_template(&self, id: PolicyTemplateId) -> Result<(), PortError>;
}

/// Client policy storage
#[async_trait]
pub trait PolicyInstancePort: DomainPort + HealthCheckable {
    /// Fails with `PortError::Conflict` on a duplicate policy number
    async fn create_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError>;

    async fn get_policy(&self, id: PolicyInstanceId) -> Result<PolicyInstance, PortError>;

    /// Ordered by end date, soonest first
    async fn list_policies(&self, query: PolicyQuery) -> Result<Page<PolicyInstance>, PortError>;

    /// Fails with `PortError::Conflict` when the number collides with another policy
    async fn update_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError>;

    async fn delete_policy(&self, id: PolicyInstanceId) -> Result<(), PortError>;

    /// Every policy of a client, newest start date first
    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<PolicyInstance>, PortError>;

    async fn count_for_client(&self, client_id: ClientId) -> Result<u64, PortError>;

    /// Saves the renewed `old` policy and inserts `new` in one unit of work
    ///
    /// Fails with `PortError::Conflict` when the stored policy is no longer
    /// active or expired, e.g. renewed by a concurrent request.
    async fn save_renewal(
        &self,
        old: PolicyInstance,
        new: PolicyInstance,
    ) -> Result<PolicyInstance, PortError>;

    /// Active policies whose last covered day is `date`
    async fn expiring_on(&self, date: NaiveDate) -> Result<Vec<PolicyInstance>, PortError>;

    /// Marks every active policy with an end date before `today` as expired
    ///
    /// Returns the number of policies changed.
    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, PortError>;

    async fn summary(&self, today: NaiveDate, window_days: u32) -> Result<PolicySummary, PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AdapterHealth, Currency, HealthCheckResult};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Tables {
        templates: HashMap<PolicyTemplateId, PolicyTemplate>,
        policies: HashMap<PolicyInstanceId, PolicyInstance>,
    }

    /// In-memory store implementing both policy ports
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryPolicyStore {
        tables: Arc<RwLock<Tables>>,
    }

    impl InMemoryPolicyStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn number_taken(tables: &Tables, number: &str, except: Option<PolicyInstanceId>) -> bool {
            tables
                .policies
                .values()
                .any(|p| Some(p.id) != except && p.policy_number == number)
        }
    }

    impl DomainPort for InMemoryPolicyStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryPolicyStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-policy-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl PolicyTemplatePort for InMemoryPolicyStore {
        async fn create_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError> {
            self.tables
                .write()
                .await
                .templates
                .insert(template.id, template.clone());
            Ok(template)
        }

        async fn get_template(&self, id: PolicyTemplateId) -> Result<PolicyTemplate, PortError> {
            self.tables
                .read()
                .await
                .templates
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PolicyTemplate", id))
        }

        async fn list_templates(&self, active_only: bool) -> Result<Vec<PolicyTemplate>, PortError> {
            let tables = self.tables.read().await;
            let mut templates: Vec<PolicyTemplate> = tables
                .templates
                .values()
                .filter(|t| !active_only || t.is_active)
                .cloned()
                .collect();
            templates.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(templates)
        }

        async fn update_template(&self, template: PolicyTemplate) -> Result<PolicyTemplate, PortError> {
            let mut tables = self.tables.write().await;
            match tables.templates.get_mut(&template.id) {
                Some(existing) => {
                    *existing = template.clone();
                    Ok(template)
                }
                None => Err(PortError::not_found("PolicyTemplate", template.id)),
            }
        }

        async fn delete_template(&self, id: PolicyTemplateId) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            if tables.policies.values().any(|p| p.template_id == id) {
                return Err(PortError::conflict(
                    "policy template is used by existing policies; deactivate it instead",
                ));
            }
            tables
                .templates
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("PolicyTemplate", id))
        }
    }

    #[async_trait]
    impl PolicyInstancePort for InMemoryPolicyStore {
        async fn create_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError> {
            let mut tables = self.tables.write().await;
            if !tables.templates.contains_key(&policy.template_id) {
                return Err(PortError::validation_field("policy template does not exist", "template_id"));
            }
            if Self::number_taken(&tables, &policy.policy_number, None) {
                return Err(PortError::conflict(format!(
                    "policy number {} already exists",
                    policy.policy_number
                )));
            }
            tables.policies.insert(policy.id, policy.clone());
            Ok(policy)
        }

        async fn get_policy(&self, id: PolicyInstanceId) -> Result<PolicyInstance, PortError> {
            self.tables
                .read()
                .await
                .policies
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Policy", id))
        }

        async fn list_policies(&self, query: PolicyQuery) -> Result<Page<PolicyInstance>, PortError> {
            let tables = self.tables.read().await;
            let mut policies: Vec<PolicyInstance> = tables
                .policies
                .values()
                .filter(|p| query.matches(p))
                .cloned()
                .collect();
            policies.sort_by(|a, b| a.end_date.cmp(&b.end_date).then(a.policy_number.cmp(&b.policy_number)));
            Ok(Page::from_vec(policies, query.page_size(), query.offset.unwrap_or(0)))
        }

        async fn update_policy(&self, policy: PolicyInstance) -> Result<PolicyInstance, PortError> {
            let mut tables = self.tables.write().await;
            if !tables.policies.contains_key(&policy.id) {
                return Err(PortError::not_found("Policy", policy.id));
            }
            if Self::number_taken(&tables, &policy.policy_number, Some(policy.id)) {
                return Err(PortError::conflict(format!(
                    "policy number {} already exists",
                    policy.policy_number
                )));
            }
            tables.policies.insert(policy.id, policy.clone());
            Ok(policy)
        }

        async fn delete_policy(&self, id: PolicyInstanceId) -> Result<(), PortError> {
            self.tables
                .write()
                .await
                .policies
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Policy", id))
        }

        async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<PolicyInstance>, PortError> {
            let tables = self.tables.read().await;
            let mut policies: Vec<PolicyInstance> = tables
                .policies
                .values()
                .filter(|p| p.client_id == client_id)
                .cloned()
                .collect();
            policies.sort_by(|a, b| b.start_date.cmp(&a.start_date));
            Ok(policies)
        }

        async fn count_for_client(&self, client_id: ClientId) -> Result<u64, PortError> {
            let tables = self.tables.read().await;
            Ok(tables.policies.values().filter(|p| p.client_id == client_id).count() as u64)
        }

        async fn save_renewal(
            &self,
            old: PolicyInstance,
            new: PolicyInstance,
        ) -> Result<PolicyInstance, PortError> {
            let mut tables = self.tables.write().await;
            match tables.policies.get(&old.id) {
                None => return Err(PortError::not_found("Policy", old.id)),
                Some(stored) if !stored.status.is_renewable() => {
                    return Err(PortError::conflict(format!(
                        "policy {} can no longer be renewed",
                        stored.policy_number
                    )));
                }
                Some(_) => {}
            }
            if Self::number_taken(&tables, &new.policy_number, None) {
                return Err(PortError::conflict(format!(
                    "policy number {} already exists",
                    new.policy_number
                )));
            }
            tables.policies.insert(old.id, old);
            tables.policies.insert(new.id, new.clone());
            Ok(new)
        }

        async fn expiring_on(&self, date: NaiveDate) -> Result<Vec<PolicyInstance>, PortError> {
            let tables = self.tables.read().await;
            Ok(tables
                .policies
                .values()
                .filter(|p| p.status == PolicyStatus::Active && p.end_date == date)
                .cloned()
                .collect())
        }

        async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, PortError> {
            let mut tables = self.tables.write().await;
            let changed = tables
                .policies
                .values_mut()
                .map(|p| p.expire_if_overdue(today))
                .filter(|changed| *changed)
                .count();
            Ok(changed as u64)
        }

        async fn summary(&self, today: NaiveDate, window_days: u32) -> Result<PolicySummary, PortError> {
            let tables = self.tables.read().await;
            Ok(PolicySummary::compute(
                tables.policies.values(),
                today,
                window_days,
                Currency::INR,
            ))
        }
    }
}
