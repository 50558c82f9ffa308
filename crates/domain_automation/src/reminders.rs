//! Reminder planning
//!
//! Decides who gets a message on a given day. Planning is pure: the runner
//! loads candidates from the ports, the planner filters them against the
//! settings, and the runner sends.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_client::{ActivityType, Client, EntityType};
use domain_policy::{PolicyInstance, PolicyStatus};

use crate::settings::Settings;
use crate::whatsapp_template::TemplatePurpose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReminderKind {
    Birthday,
    Renewal { days_before: u32 },
}

/// One message to plan for one client
#[derive(Debug, Clone)]
pub struct ReminderJob {
    pub kind: ReminderKind,
    pub client: Client,
    pub policy: Option<PolicyInstance>,
}

impl ReminderJob {
    pub fn activity_type(&self) -> ActivityType {
        match self.kind {
            ReminderKind::Birthday => ActivityType::BirthdayGreetingSent,
            ReminderKind::Renewal { .. } => ActivityType::RenewalReminderSent,
        }
    }

    pub fn purpose(&self) -> TemplatePurpose {
        match self.kind {
            ReminderKind::Birthday => TemplatePurpose::Birthday,
            ReminderKind::Renewal { .. } => TemplatePurpose::RenewalReminder,
        }
    }

    /// The record the sent message is logged against
    ///
    /// Renewal reminders are logged per policy so that a client with two
    /// expiring policies gets both.
    pub fn entity(&self) -> (EntityType, Uuid) {
        match (&self.kind, &self.policy) {
            (ReminderKind::Renewal { .. }, Some(policy)) => (EntityType::Policy, policy.id.into()),
            _ => (EntityType::Client, self.client.id.into()),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, &self.policy) {
            (ReminderKind::Renewal { days_before }, Some(policy)) => format!(
                "Renewal reminder for policy {} sent to {} ({} days before expiry)",
                policy.policy_number,
                self.client.full_name(),
                days_before
            ),
            _ => format!("Birthday greeting sent to {}", self.client.full_name()),
        }
    }
}

/// Filters candidates into the jobs due on `today`
pub struct ReminderPlanner<'a> {
    settings: &'a Settings,
    today: NaiveDate,
}

impl<'a> ReminderPlanner<'a> {
    pub fn new(settings: &'a Settings, today: NaiveDate) -> Self {
        Self { settings, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Dates to look up expiring policies for, with their offsets
    pub fn renewal_targets(&self) -> Vec<(u32, NaiveDate)> {
        if !self.settings.renewal_automation_enabled {
            return Vec::new();
        }
        self.settings.reminder_targets(self.today)
    }

    /// Greetings for clients whose birthday is today
    pub fn birthday_jobs(&self, clients: impl IntoIterator<Item = Client>) -> Vec<ReminderJob> {
        if !self.settings.birthday_automation_enabled {
            return Vec::new();
        }
        clients
            .into_iter()
            .filter(|client| client.is_birthday_on(self.today))
            .map(|client| ReminderJob {
                kind: ReminderKind::Birthday,
                client,
                policy: None,
            })
            .collect()
    }

    /// Reminders for active policies ending on one of the configured offsets
    pub fn renewal_jobs(
        &self,
        candidates: impl IntoIterator<Item = (PolicyInstance, Client)>,
    ) -> Vec<ReminderJob> {
        if !self.settings.renewal_automation_enabled {
            return Vec::new();
        }
        let mut jobs: Vec<ReminderJob> = candidates
            .into_iter()
            .filter(|(policy, _)| policy.status == PolicyStatus::Active)
            .filter_map(|(policy, client)| {
                let remaining = policy.days_until_expiry(self.today);
                let days_before = u32::try_from(remaining).ok()?;
                self.settings
                    .renewal_reminder_days
                    .contains(&days_before)
                    .then_some(ReminderJob {
                        kind: ReminderKind::Renewal { days_before },
                        client,
                        policy: Some(policy),
                    })
            })
            .collect();
        jobs.sort_by_key(|job| job.policy.as_ref().map(|p| p.end_date));
        jobs
    }
}
