//! Automation runner
//!
//! Executes the birthday and renewal jobs for one local date. The same
//! runner backs the `/automation/*` endpoints and the scheduled binary.
//!
//! A run never stops on a failed send: each job's outcome is recorded in
//! the [`RunReport`] and the run moves on. A message that was already
//! logged for the same record and type on the run date is skipped, so a
//! job can be re-run safely.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use core_kernel::{ClientId, PolicyInstanceId, PolicyTemplateId, Timezone, WhatsAppTemplateId};
use domain_client::{Activity, ActivityPort, ActivityType, ClientPort, EntityType};
use domain_policy::{PolicyInstancePort, PolicyTemplate, PolicyTemplatePort};

use crate::channels::{
    birthday_email, renewal_email, DeliveryReceipt, EmailSender, OutboundEmail, OutboundWhatsApp,
    WhatsAppSender,
};
use crate::error::AutomationError;
use crate::ports::{SettingsPort, WhatsAppTemplatePort};
use crate::reminders::{ReminderJob, ReminderKind, ReminderPlanner};
use crate::render::{add_policy_variables, client_variables, Variables};
use crate::settings::Settings;
use crate::whatsapp_template::{TemplatePurpose, WhatsAppTemplate};

/// Which job to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Birthdays,
    Renewals,
    All,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Birthdays => "birthdays",
            JobKind::Renewals => "renewals",
            JobKind::All => "all",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birthdays" | "birthday" => Ok(JobKind::Birthdays),
            "renewals" | "renewal" => Ok(JobKind::Renewals),
            "all" => Ok(JobKind::All),
            other => Err(AutomationError::UnknownJob(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[serde(rename = "whatsapp")]
    WhatsApp,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent,
    /// Would have been sent; nothing left the system
    DryRun,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAttempt {
    pub channel: Channel,
    pub ok: bool,
    pub detail: Option<String>,
}

/// Result of one reminder job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub reminder: ReminderKind,
    pub client_id: ClientId,
    pub client_name: String,
    pub policy_id: Option<PolicyInstanceId>,
    pub policy_number: Option<String>,
    pub status: OutcomeStatus,
    pub reason: Option<String>,
    pub attempts: Vec<ChannelAttempt>,
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub kind: JobKind,
    pub date: NaiveDate,
    pub dry_run: bool,
    /// Jobs found due on `date`
    pub matched: u32,
    /// Jobs delivered on at least one channel (or that would be, in a dry run)
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Policies moved to expired by the sweep before renewals
    pub expired: u64,
    pub notes: Vec<String>,
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    pub fn new(kind: JobKind, date: NaiveDate, dry_run: bool) -> Self {
        Self {
            kind,
            date,
            dry_run,
            matched: 0,
            sent: 0,
            skipped: 0,
            failed: 0,
            expired: 0,
            notes: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, outcome: JobOutcome) {
        self.matched += 1;
        match outcome.status {
            OutcomeStatus::Sent | OutcomeStatus::DryRun => self.sent += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// One-off template send to a client
#[derive(Debug, Clone)]
pub struct TemplateMessageRequest {
    pub client_id: ClientId,
    pub template_id: WhatsAppTemplateId,
    /// Adds policy variables (`policy_number`, `end_date`, ...)
    pub policy_id: Option<PolicyInstanceId>,
    /// Extra values; these override the built-in variables
    pub variables: Variables,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessageResult {
    pub message: OutboundWhatsApp,
    pub receipt: DeliveryReceipt,
}

/// Everything the runner talks to
#[derive(Clone)]
pub struct AutomationPorts {
    pub clients: Arc<dyn ClientPort>,
    pub activities: Arc<dyn ActivityPort>,
    pub policies: Arc<dyn PolicyInstancePort>,
    pub policy_templates: Arc<dyn PolicyTemplatePort>,
    pub settings: Arc<dyn SettingsPort>,
    pub whatsapp_templates: Arc<dyn WhatsAppTemplatePort>,
    pub whatsapp: Arc<dyn WhatsAppSender>,
    pub email: Arc<dyn EmailSender>,
}

#[derive(Clone)]
pub struct AutomationRunner {
    ports: AutomationPorts,
    timezone: Timezone,
}

struct Prepared {
    whatsapp: Option<OutboundWhatsApp>,
    email: Option<OutboundEmail>,
    failures: Vec<ChannelAttempt>,
    notes: Vec<String>,
}

impl AutomationRunner {
    pub fn new(ports: AutomationPorts, timezone: Timezone) -> Self {
        Self { ports, timezone }
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    /// Runs `kind` for `date` (the agent's today when `None`)
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        kind: JobKind,
        date: Option<NaiveDate>,
        dry_run: bool,
    ) -> Result<RunReport, AutomationError> {
        let date = date.unwrap_or_else(|| self.timezone.today());
        let settings = self.ports.settings.get_settings().await?;
        let mut report = RunReport::new(kind, date, dry_run);

        if matches!(kind, JobKind::Birthdays | JobKind::All) {
            self.run_birthdays(date, &settings, &mut report).await?;
        }
        if matches!(kind, JobKind::Renewals | JobKind::All) {
            self.run_renewals(date, &settings, &mut report).await?;
        }

        info!(
            date = %date,
            dry_run,
            matched = report.matched,
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            expired = report.expired,
            "Automation run finished"
        );
        Ok(report)
    }

    async fn run_birthdays(
        &self,
        date: NaiveDate,
        settings: &Settings,
        report: &mut RunReport,
    ) -> Result<(), AutomationError> {
        if !settings.birthday_automation_enabled {
            report.notes.push("birthday automation is disabled".to_string());
            return Ok(());
        }
        let template = self.active_template(TemplatePurpose::Birthday, settings, report).await?;
        let clients = self.ports.clients.birthdays_on(date).await?;
        let jobs = ReminderPlanner::new(settings, date).birthday_jobs(clients);
        info!(count = jobs.len(), "Birthday greetings due");

        for job in jobs {
            let outcome = self.execute(&job, date, settings, template.as_ref(), None, report.dry_run).await;
            report.push(outcome);
        }
        Ok(())
    }

    async fn run_renewals(
        &self,
        date: NaiveDate,
        settings: &Settings,
        report: &mut RunReport,
    ) -> Result<(), AutomationError> {
        if !settings.renewal_automation_enabled {
            report.notes.push("renewal automation is disabled".to_string());
            return Ok(());
        }
        if report.dry_run {
            report.notes.push("expiry sweep skipped in dry run".to_string());
        } else {
            report.expired += self.ports.policies.expire_overdue(date).await?;
            if report.expired > 0 {
                info!(count = report.expired, "Marked overdue policies expired");
            }
        }

        let template = self
            .active_template(TemplatePurpose::RenewalReminder, settings, report)
            .await?;
        let planner = ReminderPlanner::new(settings, date);

        let mut candidates = Vec::new();
        for (days_before, target) in planner.renewal_targets() {
            for policy in self.ports.policies.expiring_on(target).await? {
                match self.ports.clients.get_client(policy.client_id).await {
                    Ok(client) => candidates.push((policy, client)),
                    Err(err) => {
                        warn!(policy = %policy.policy_number, error = %err, "Client for expiring policy not loadable");
                        report.push(JobOutcome {
                            reminder: ReminderKind::Renewal { days_before },
                            client_id: policy.client_id,
                            client_name: String::new(),
                            policy_id: Some(policy.id),
                            policy_number: Some(policy.policy_number.clone()),
                            status: OutcomeStatus::Failed,
                            reason: Some(err.to_string()),
                            attempts: Vec::new(),
                        });
                    }
                }
            }
        }

        let jobs = planner.renewal_jobs(candidates);
        info!(count = jobs.len(), "Renewal reminders due");

        let mut product_cache: HashMap<PolicyTemplateId, Option<PolicyTemplate>> = HashMap::new();
        for job in jobs {
            let product = match job.policy.as_ref() {
                Some(policy) => self.product(policy.template_id, &mut product_cache).await,
                None => None,
            };
            let outcome = self
                .execute(&job, date, settings, template.as_ref(), product.as_ref(), report.dry_run)
                .await;
            report.push(outcome);
        }
        Ok(())
    }

    async fn active_template(
        &self,
        purpose: TemplatePurpose,
        settings: &Settings,
        report: &mut RunReport,
    ) -> Result<Option<WhatsAppTemplate>, AutomationError> {
        if !settings.whatsapp_enabled {
            return Ok(None);
        }
        let template = self.ports.whatsapp_templates.find_active_by_purpose(purpose).await?;
        if template.is_none() {
            report
                .notes
                .push(format!("no active WhatsApp template for {}; WhatsApp skipped", purpose));
        }
        Ok(template)
    }

    async fn product(
        &self,
        id: PolicyTemplateId,
        cache: &mut HashMap<PolicyTemplateId, Option<PolicyTemplate>>,
    ) -> Option<PolicyTemplate> {
        if let Some(cached) = cache.get(&id) {
            return cached.clone();
        }
        let loaded = match self.ports.policy_templates.get_template(id).await {
            Ok(template) => Some(template),
            Err(err) => {
                warn!(template_id = %id, error = %err, "Policy template not loadable");
                None
            }
        };
        cache.insert(id, loaded.clone());
        loaded
    }

    async fn execute(
        &self,
        job: &ReminderJob,
        date: NaiveDate,
        settings: &Settings,
        template: Option<&WhatsAppTemplate>,
        product: Option<&PolicyTemplate>,
        dry_run: bool,
    ) -> JobOutcome {
        let mut outcome = JobOutcome {
            reminder: job.kind,
            client_id: job.client.id,
            client_name: job.client.full_name(),
            policy_id: job.policy.as_ref().map(|p| p.id),
            policy_number: job.policy.as_ref().map(|p| p.policy_number.clone()),
            status: OutcomeStatus::Skipped,
            reason: None,
            attempts: Vec::new(),
        };

        let (_, entity_id) = job.entity();
        match self.already_sent(job.activity_type(), entity_id, date).await {
            Ok(true) => {
                outcome.reason = Some("already sent on this date".to_string());
                return outcome;
            }
            Ok(false) => {}
            Err(err) => {
                outcome.status = OutcomeStatus::Failed;
                outcome.reason = Some(err.to_string());
                return outcome;
            }
        }

        let prepared = prepare(job, date, settings, template, product);
        outcome.attempts = prepared.failures;
        if prepared.whatsapp.is_none() && prepared.email.is_none() {
            if outcome.attempts.is_empty() {
                outcome.reason = Some(prepared.notes.join("; "));
            } else {
                outcome.status = OutcomeStatus::Failed;
            }
            return outcome;
        }

        if dry_run {
            if let Some(ref message) = prepared.whatsapp {
                outcome.attempts.push(ChannelAttempt {
                    channel: Channel::WhatsApp,
                    ok: true,
                    detail: Some(format!("dry run: {}", message.preview)),
                });
            }
            if let Some(ref email) = prepared.email {
                outcome.attempts.push(ChannelAttempt {
                    channel: Channel::Email,
                    ok: true,
                    detail: Some(format!("dry run: {}", email.subject)),
                });
            }
            outcome.status = OutcomeStatus::DryRun;
            return outcome;
        }

        if let Some(ref message) = prepared.whatsapp {
            let result = self.ports.whatsapp.send(message).await;
            outcome.attempts.push(attempt(Channel::WhatsApp, result));
        }
        if let Some(ref email) = prepared.email {
            let result = self.ports.email.send(email).await;
            outcome.attempts.push(attempt(Channel::Email, result));
        }

        let delivered: Vec<Channel> = outcome
            .attempts
            .iter()
            .filter(|a| a.ok)
            .map(|a| a.channel)
            .collect();
        if delivered.is_empty() {
            warn!(client = %job.client.id, "Reminder failed on every channel");
            outcome.status = OutcomeStatus::Failed;
            return outcome;
        }

        outcome.status = OutcomeStatus::Sent;
        let (entity_type, entity_id) = job.entity();
        let mut metadata = serde_json::json!({
            "client_id": job.client.id,
            "channels": delivered,
            "run_date": date,
        });
        if let (ReminderKind::Renewal { days_before }, Some(policy)) = (job.kind, job.policy.as_ref()) {
            metadata["days_before"] = serde_json::json!(days_before);
            metadata["policy_number"] = serde_json::json!(policy.policy_number);
        }
        let activity = Activity::new(job.activity_type(), job.describe())
            .for_entity(entity_type, entity_id)
            .with_metadata(metadata)
            .at(self.stamp_for(date));
        if let Err(err) = self.ports.activities.record(activity).await {
            warn!(error = %err, "Failed to log sent reminder");
        }
        outcome
    }

    async fn already_sent(
        &self,
        activity_type: ActivityType,
        entity_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AutomationError> {
        let (start, end) = self.timezone.day_bounds(date)?;
        Ok(self
            .ports
            .activities
            .exists_between(activity_type, entity_id, start, end)
            .await?)
    }

    /// Timestamp for activities logged by a run for `date`
    ///
    /// Backfill runs for another day are stamped at the start of that day
    /// so the duplicate check sees them.
    fn stamp_for(&self, date: NaiveDate) -> DateTime<Utc> {
        if date == self.timezone.today() {
            return Utc::now();
        }
        self.timezone
            .day_bounds(date)
            .map(|(start, _)| start)
            .unwrap_or_else(|_| Utc::now())
    }

    async fn build_template_message(
        &self,
        request: &TemplateMessageRequest,
        settings: &Settings,
    ) -> Result<(OutboundWhatsApp, WhatsAppTemplate), AutomationError> {
        let client = self.ports.clients.get_client(request.client_id).await?;
        let template = self.ports.whatsapp_templates.get_template(request.template_id).await?;
        let today = self.timezone.today();

        let mut vars = client_variables(&client, settings, today);
        if let Some(policy_id) = request.policy_id {
            let policy = self.ports.policies.get_policy(policy_id).await?;
            if policy.client_id != client.id {
                return Err(AutomationError::validation("policy does not belong to this client"));
            }
            let product = self.ports.policy_templates.get_template(policy.template_id).await.ok();
            add_policy_variables(&mut vars, &policy, product.as_ref(), today);
        }
        vars.extend(request.variables.clone());

        let rendered = template.render(&vars)?;
        let message = OutboundWhatsApp {
            to: client.whatsapp_msisdn(&settings.default_country_code)?,
            template_name: template.provider_template.clone(),
            language_code: template.language_code.clone(),
            namespace: template.namespace.clone(),
            parameters: rendered.parameters,
            preview: rendered.body,
        };
        Ok((message, template))
    }

    /// Renders a template for a client without sending it
    pub async fn preview_template_message(
        &self,
        request: &TemplateMessageRequest,
    ) -> Result<OutboundWhatsApp, AutomationError> {
        let settings = self.ports.settings.get_settings().await?;
        let (message, _) = self.build_template_message(request, &settings).await?;
        Ok(message)
    }

    /// Sends one WhatsApp template message to a client and logs it
    #[instrument(skip(self, request), fields(client_id = %request.client_id, template_id = %request.template_id))]
    pub async fn send_template_message(
        &self,
        request: &TemplateMessageRequest,
    ) -> Result<TemplateMessageResult, AutomationError> {
        let settings = self.ports.settings.get_settings().await?;
        if !settings.whatsapp_enabled {
            return Err(AutomationError::Disabled("WhatsApp messaging".to_string()));
        }
        let (message, template) = self.build_template_message(request, &settings).await?;
        if !template.is_active {
            return Err(AutomationError::TemplateInactive(template.name));
        }

        let receipt = self.ports.whatsapp.send(&message).await?;
        info!(provider = %receipt.provider, dry_run = receipt.dry_run, "WhatsApp template message sent");

        let activity = Activity::new(
            ActivityType::WhatsAppMessageSent,
            format!("WhatsApp template '{}' sent", template.name),
        )
        .for_entity(EntityType::Client, request.client_id)
        .with_metadata(serde_json::json!({
            "template_id": template.id,
            "provider_template": template.provider_template,
            "policy_id": request.policy_id,
            "message_id": receipt.message_id,
        }));
        if let Err(err) = self.ports.activities.record(activity).await {
            warn!(error = %err, "Failed to log WhatsApp message");
        }

        Ok(TemplateMessageResult { message, receipt })
    }
}

fn attempt<E: fmt::Display>(channel: Channel, result: Result<DeliveryReceipt, E>) -> ChannelAttempt {
    match result {
        Ok(receipt) => ChannelAttempt {
            channel,
            ok: true,
            detail: match (receipt.dry_run, receipt.message_id) {
                (true, _) => Some(format!("logged only ({})", receipt.provider)),
                (false, Some(id)) => Some(id),
                (false, None) => None,
            },
        },
        Err(err) => ChannelAttempt {
            channel,
            ok: false,
            detail: Some(err.to_string()),
        },
    }
}

/// Builds the messages for a job on every enabled channel
fn prepare(
    job: &ReminderJob,
    date: NaiveDate,
    settings: &Settings,
    template: Option<&WhatsAppTemplate>,
    product: Option<&PolicyTemplate>,
) -> Prepared {
    let mut prepared = Prepared {
        whatsapp: None,
        email: None,
        failures: Vec::new(),
        notes: Vec::new(),
    };

    if !settings.whatsapp_enabled {
        prepared.notes.push("WhatsApp disabled".to_string());
    } else if let Some(template) = template {
        let mut vars = client_variables(&job.client, settings, date);
        if let Some(ref policy) = job.policy {
            add_policy_variables(&mut vars, policy, product, date);
        }
        let message = template.render(&vars).map_err(AutomationError::from).and_then(|rendered| {
            Ok(OutboundWhatsApp {
                to: job.client.whatsapp_msisdn(&settings.default_country_code)?,
                template_name: template.provider_template.clone(),
                language_code: template.language_code.clone(),
                namespace: template.namespace.clone(),
                parameters: rendered.parameters,
                preview: rendered.body,
            })
        });
        match message {
            Ok(message) => prepared.whatsapp = Some(message),
            Err(err) => prepared.failures.push(ChannelAttempt {
                channel: Channel::WhatsApp,
                ok: false,
                detail: Some(err.to_string()),
            }),
        }
    } else {
        prepared.notes.push("no active WhatsApp template".to_string());
    }

    if !settings.email_enabled {
        prepared.notes.push("email disabled".to_string());
    } else {
        prepared.email = match (&job.kind, &job.policy) {
            (ReminderKind::Renewal { .. }, Some(policy)) => {
                renewal_email(&job.client, policy, product, settings, date)
            }
            _ => birthday_email(&job.client, settings),
        };
        if prepared.email.is_none() {
            prepared.notes.push("client has no email address".to_string());
        }
    }
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::mock::{RecordingEmail, RecordingWhatsApp};
    use crate::ports::mock::InMemoryAutomationStore;
    use crate::whatsapp_template::NewWhatsAppTemplate;
    use core_kernel::Money;
    use domain_client::ports::mock::InMemoryClientStore;
    use domain_client::NewClient;
    use domain_policy::ports::mock::InMemoryPolicyStore;
    use domain_policy::{NewPolicyInstance, NewPolicyTemplate, PolicyInstance, PolicyType, PremiumFrequency};
    use rust_decimal_macros::dec;

    struct Harness {
        clients: InMemoryClientStore,
        policies: InMemoryPolicyStore,
        automation: InMemoryAutomationStore,
        whatsapp: RecordingWhatsApp,
        email: RecordingEmail,
        runner: AutomationRunner,
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 23).unwrap()
    }

    async fn harness(settings: Settings) -> Harness {
        let clients = InMemoryClientStore::new();
        let policies = InMemoryPolicyStore::new();
        let automation = InMemoryAutomationStore::with_settings(settings).await;
        let whatsapp = RecordingWhatsApp::new();
        let email = RecordingEmail::new();
        let ports = AutomationPorts {
            clients: Arc::new(clients.clone()),
            activities: Arc::new(clients.clone()),
            policies: Arc::new(policies.clone()),
            policy_templates: Arc::new(policies.clone()),
            settings: Arc::new(automation.clone()),
            whatsapp_templates: Arc::new(automation.clone()),
            whatsapp: Arc::new(whatsapp.clone()),
            email: Arc::new(email.clone()),
        };
        Harness {
            runner: AutomationRunner::new(ports, Timezone::default()),
            clients,
            policies,
            automation,
            whatsapp,
            email,
        }
    }

    async fn add_client(h: &Harness, first: &str, phone: &str, email: Option<&str>, dob: Option<NaiveDate>) -> domain_client::Client {
        let client = domain_client::Client::new(NewClient {
            first_name: first.into(),
            last_name: "Rao".into(),
            email: email.map(String::from),
            phone: phone.into(),
            date_of_birth: dob,
            ..Default::default()
        })
        .unwrap();
        h.clients.create_client(client).await.unwrap()
    }

    async fn add_template(h: &Harness, purpose: TemplatePurpose, body: &str) -> WhatsAppTemplate {
        let template = WhatsAppTemplate::new(NewWhatsAppTemplate {
            name: format!("{} template", purpose),
            provider_template: format!("{}_v1", purpose),
            language_code: None,
            namespace: None,
            purpose,
            body: body.into(),
            variables: None,
        })
        .unwrap();
        h.automation.create_template(template).await.unwrap()
    }

    async fn add_policy(h: &Harness, client: ClientId, number: &str, end_date: NaiveDate) -> PolicyInstance {
        let product = match h.policies.list_templates(false).await.unwrap().into_iter().next() {
            Some(product) => product,
            None => {
                let product = PolicyTemplate::new(NewPolicyTemplate {
                    name: "Health Plus".into(),
                    insurer: "Star Health".into(),
                    policy_type: PolicyType::Health,
                    description: None,
                    default_premium: Money::inr(dec!(18000)),
                    default_sum_insured: Some(Money::inr(dec!(500000))),
                    default_term_months: 12,
                    premium_frequency: PremiumFrequency::Annual,
                })
                .unwrap();
                h.policies.create_template(product).await.unwrap()
            }
        };
        let policy = PolicyInstance::from_template(
            &product,
            NewPolicyInstance {
                policy_number: number.into(),
                client_id: client,
                start_date: end_date - chrono::Days::new(364),
                end_date: Some(end_date),
                term_months: None,
                premium: None,
                sum_insured: None,
                premium_frequency: None,
                notes: None,
            },
        )
        .unwrap();
        h.policies.create_policy(policy).await.unwrap()
    }

    #[tokio::test]
    async fn test_birthday_run_sends_once_per_day() {
        let h = harness(Settings::default()).await;
        add_template(&h, TemplatePurpose::Birthday, "Happy birthday {{first_name}}! {{agent_name}}").await;
        add_client(&h, "Anil", "9811111111", Some("anil@example.com"), NaiveDate::from_ymd_opt(1985, 4, 23)).await;
        add_client(&h, "Bina", "9822222222", None, NaiveDate::from_ymd_opt(1985, 4, 24)).await;

        let report = h.runner.run(JobKind::Birthdays, Some(day()), false).await.unwrap();
        assert_eq!((report.matched, report.sent, report.failed), (1, 1, 0));
        let sent = h.whatsapp.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "919811111111");
        assert_eq!(sent[0].parameters[0], "Anil");
        assert_eq!(h.email.sent().await.len(), 1);

        let again = h.runner.run(JobKind::Birthdays, Some(day()), false).await.unwrap();
        assert_eq!((again.matched, again.sent, again.skipped), (1, 0, 1));
        assert_eq!(h.whatsapp.sent().await.len(), 1);

        let logged = h.clients.activities().await;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].activity_type, ActivityType::BirthdayGreetingSent);
    }

    #[tokio::test]
    async fn test_renewal_run_uses_configured_offsets_and_sweeps() {
        let h = harness(Settings::default()).await;
        add_template(
            &h,
            TemplatePurpose::RenewalReminder,
            "Hi {{first_name}}, {{policy_name}} {{policy_number}} ends {{end_date}}",
        )
        .await;
        let client = add_client(&h, "Chitra", "9833333333", None, None).await;
        add_policy(&h, client.id, "HP-7", day() + chrono::Days::new(7)).await;
        add_policy(&h, client.id, "HP-8", day() + chrono::Days::new(8)).await;
        add_policy(&h, client.id, "HP-OLD", day() - chrono::Days::new(1)).await;

        let report = h.runner.run(JobKind::Renewals, Some(day()), false).await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!((report.matched, report.sent), (1, 1));
        assert_eq!(report.outcomes[0].reminder, ReminderKind::Renewal { days_before: 7 });
        assert_eq!(report.outcomes[0].policy_number.as_deref(), Some("HP-7"));

        let sent = h.whatsapp.sent().await;
        assert_eq!(sent[0].preview, "Hi Chitra, Health Plus HP-7 ends 30 Apr 2025");
        let logged = h.clients.activities().await;
        assert_eq!(logged[0].entity_type, Some(EntityType::Policy));
    }

    #[tokio::test]
    async fn test_dry_run_sends_and_logs_nothing() {
        let h = harness(Settings::default()).await;
        add_template(&h, TemplatePurpose::RenewalReminder, "{{policy_number}} ends {{end_date}}").await;
        let client = add_client(&h, "Dev", "9844444444", Some("dev@example.com"), None).await;
        add_policy(&h, client.id, "DR-1", day() + chrono::Days::new(30)).await;
        add_policy(&h, client.id, "DR-OLD", day() - chrono::Days::new(3)).await;

        let report = h.runner.run(JobKind::Renewals, Some(day()), true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.expired, 0);
        assert_eq!(report.sent, 1);
        assert_eq!(report.outcomes[0].status, OutcomeStatus::DryRun);
        assert_eq!(report.outcomes[0].attempts.len(), 2);
        assert!(h.whatsapp.sent().await.is_empty());
        assert!(h.email.sent().await.is_empty());
        assert!(h.clients.activities().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_run() {
        let settings = Settings {
            email_enabled: false,
            ..Settings::default()
        };
        let h = harness(settings).await;
        add_template(&h, TemplatePurpose::Birthday, "Happy birthday {{first_name}}").await;
        let dob = NaiveDate::from_ymd_opt(1990, 4, 23);
        add_client(&h, "Esha", "9855555555", None, dob).await;
        add_client(&h, "Faiz", "9866666666", None, dob).await;
        h.whatsapp.fail_for("919855555555").await;

        let report = h.runner.run(JobKind::Birthdays, Some(day()), false).await.unwrap();
        assert_eq!((report.matched, report.sent, report.failed), (2, 1, 1));
        let failed = report
            .outcomes
            .iter()
            .find(|o| o.status == OutcomeStatus::Failed)
            .unwrap();
        assert_eq!(failed.client_name, "Esha Rao");
        assert!(!failed.attempts[0].ok);
        assert_eq!(h.clients.activities().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_channel_means_skipped() {
        let h = harness(Settings::default()).await;
        add_client(&h, "Gita", "9877777777", None, NaiveDate::from_ymd_opt(1970, 4, 23)).await;

        let report = h.runner.run(JobKind::Birthdays, Some(day()), false).await.unwrap();
        assert_eq!((report.matched, report.skipped), (1, 1));
        assert!(report.notes.iter().any(|n| n.contains("no active WhatsApp template")));
    }

    #[tokio::test]
    async fn test_disabled_jobs_are_noted() {
        let settings = Settings {
            birthday_automation_enabled: false,
            renewal_automation_enabled: false,
            ..Settings::default()
        };
        let h = harness(settings).await;
        add_client(&h, "Hari", "9888888888", None, NaiveDate::from_ymd_opt(1970, 4, 23)).await;

        let report = h.runner.run(JobKind::All, Some(day()), false).await.unwrap();
        assert_eq!(report.matched, 0);
        assert_eq!(report.notes.len(), 2);
    }

    #[tokio::test]
    async fn test_send_template_message() {
        let h = harness(Settings::default()).await;
        let client = add_client(&h, "Isha", "+91 98999 99999", None, None).await;
        let template = add_template(&h, TemplatePurpose::Custom, "Hello {{first_name}}, {{offer}}").await;

        let mut request = TemplateMessageRequest {
            client_id: client.id,
            template_id: template.id,
            policy_id: None,
            variables: Variables::new(),
        };
        assert!(matches!(
            h.runner.send_template_message(&request).await,
            Err(AutomationError::MissingVariable(ref v)) if v == "offer"
        ));

        request.variables.insert("offer".into(), "10% off".into());
        let preview = h.runner.preview_template_message(&request).await.unwrap();
        assert_eq!(preview.preview, "Hello Isha, 10% off");
        assert!(h.whatsapp.sent().await.is_empty());

        let result = h.runner.send_template_message(&request).await.unwrap();
        assert_eq!(result.message.to, "919899999999");
        assert_eq!(h.whatsapp.sent().await.len(), 1);
        let logged = h.clients.activities().await;
        assert_eq!(logged[0].activity_type, ActivityType::WhatsAppMessageSent);

        let inactive = h
            .automation
            .update_template(WhatsAppTemplate {
                is_active: false,
                ..template
            })
            .await
            .unwrap();
        request.template_id = inactive.id;
        assert!(matches!(
            h.runner.send_template_message(&request).await,
            Err(AutomationError::TemplateInactive(_))
        ));
    }

    #[tokio::test]
    async fn test_send_template_message_requires_whatsapp() {
        let settings = Settings {
            whatsapp_enabled: false,
            ..Settings::default()
        };
        let h = harness(settings).await;
        let request = TemplateMessageRequest {
            client_id: ClientId::new(),
            template_id: WhatsAppTemplateId::new(),
            policy_id: None,
            variables: Variables::new(),
        };
        assert!(matches!(
            h.runner.send_template_message(&request).await,
            Err(AutomationError::Disabled(_))
        ));
    }

    #[test]
    fn test_job_kind_parse() {
        assert_eq!("Renewals".parse::<JobKind>().unwrap(), JobKind::Renewals);
        assert!(matches!("weekly".parse::<JobKind>(), Err(AutomationError::UnknownJob(_))));
    }
}
