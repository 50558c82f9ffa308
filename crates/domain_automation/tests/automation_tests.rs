//! Tests for domain_automation

use chrono::NaiveDate;
use proptest::prelude::*;

use domain_automation::render::{add_policy_variables, client_variables};
use domain_automation::settings::normalize_reminder_days;
use domain_automation::{
    extract_placeholders, render, AutomationError, ReminderKind, ReminderPlanner, Settings,
    SettingsUpdate, Variables,
};
use domain_client::{Client, NewClient};
use domain_policy::{NewPolicyInstance, NewPolicyTemplate, PolicyInstance, PolicyTemplate, PolicyType, PremiumFrequency};
use core_kernel::Money;
use rust_decimal_macros::dec;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn client() -> Client {
    Client::new(NewClient {
        first_name: "Kavya".into(),
        last_name: "Menon".into(),
        phone: "9123456780".into(),
        date_of_birth: Some(d(1990, 6, 15)),
        ..Default::default()
    })
    .unwrap()
}

fn product() -> PolicyTemplate {
    PolicyTemplate::new(NewPolicyTemplate {
        name: "Term Secure".into(),
        insurer: "HDFC Life".into(),
        policy_type: PolicyType::Life,
        description: None,
        default_premium: Money::inr(dec!(9800)),
        default_sum_insured: Some(Money::inr(dec!(10000000))),
        default_term_months: 12,
        premium_frequency: PremiumFrequency::Annual,
    })
    .unwrap()
}

fn policy_ending(client: &Client, end_date: NaiveDate) -> PolicyInstance {
    PolicyInstance::from_template(
        &product(),
        NewPolicyInstance {
            policy_number: format!("TS-{}", end_date),
            client_id: client.id,
            start_date: d(2024, 1, 1),
            end_date: Some(end_date),
            term_months: None,
            premium: None,
            sum_insured: None,
            premium_frequency: None,
            notes: None,
        },
    )
    .unwrap()
}

mod rendering {
    use super::*;

    #[test]
    fn test_render_client_and_policy_variables() {
        let today = d(2025, 6, 15);
        let client = client();
        let settings = Settings {
            agency_name: Some("Menon Insurance".into()),
            ..Settings::default()
        };
        let policy = policy_ending(&client, d(2025, 7, 15));

        let mut vars = client_variables(&client, &settings, today);
        add_policy_variables(&mut vars, &policy, Some(&product()), today);

        let body = "Dear {{ client_name }}, your {{policy_name}} ({{insurer}}) ends on {{end_date}}, \
                    {{days_left}} days away. Premium {{premium}}. - {{agency_name}}";
        let text = render(body, &vars).unwrap();
        assert_eq!(
            text,
            "Dear Kavya Menon, your Term Secure (HDFC Life) ends on 15 Jul 2025, \
             30 days away. Premium ₹9,800.00. - Menon Insurance"
        );
        assert_eq!(vars.get("age").map(String::as_str), Some("35"));
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let vars = Variables::new();
        assert!(matches!(
            render("Hi {{first_name}}", &vars),
            Err(AutomationError::MissingVariable(ref v)) if v == "first_name"
        ));
    }

    #[test]
    fn test_unterminated_braces_are_text() {
        let vars = Variables::new();
        assert_eq!(render("price {{ not closed", &vars).unwrap(), "price {{ not closed");
        assert_eq!(
            extract_placeholders("{{a}} {{ b }} {{a}}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

mod settings {
    use super::*;

    #[test]
    fn test_update_normalizes_offsets_and_country_code() {
        let settings = Settings::default()
            .apply(SettingsUpdate {
                renewal_reminder_days: Some(vec![7, 60, 7, 0]),
                default_country_code: Some("+44".into()),
                agent_email: Some("  Agent@Example.com ".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.renewal_reminder_days, vec![60, 7, 0]);
        assert_eq!(settings.default_country_code, "44");
        assert_eq!(settings.agent_email.as_deref(), Some("agent@example.com"));
    }

    #[test]
    fn test_update_rejects_bad_values() {
        let bad_code = Settings::default().apply(SettingsUpdate {
            default_country_code: Some("91a".into()),
            ..Default::default()
        });
        assert!(matches!(bad_code, Err(AutomationError::Validation(_))));

        let too_far = Settings::default().apply(SettingsUpdate {
            renewal_reminder_days: Some(vec![400]),
            ..Default::default()
        });
        assert!(matches!(too_far, Err(AutomationError::Validation(_))));
    }
}

mod planning {
    use super::*;

    #[test]
    fn test_renewal_jobs_only_on_offsets() {
        let today = d(2025, 3, 1);
        let settings = Settings::default();
        let client = client();
        let candidates = vec![
            (policy_ending(&client, d(2025, 3, 31)), client.clone()),
            (policy_ending(&client, d(2025, 3, 2)), client.clone()),
            (policy_ending(&client, d(2025, 3, 5)), client.clone()),
        ];

        let jobs = ReminderPlanner::new(&settings, today).renewal_jobs(candidates);
        let kinds: Vec<ReminderKind> = jobs.iter().map(|j| j.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReminderKind::Renewal { days_before: 1 },
                ReminderKind::Renewal { days_before: 30 },
            ]
        );
    }

    #[test]
    fn test_cancelled_policies_get_no_reminder() {
        let today = d(2025, 3, 1);
        let settings = Settings::default();
        let client = client();
        let mut policy = policy_ending(&client, d(2025, 3, 8));
        policy.cancel().unwrap();

        let jobs = ReminderPlanner::new(&settings, today).renewal_jobs(vec![(policy, client)]);
        assert!(jobs.is_empty());
    }
}

proptest! {
    #[test]
    fn prop_reminder_days_sorted_unique(days in proptest::collection::vec(0u32..=365, 0..12)) {
        let normalized = normalize_reminder_days(days.clone()).unwrap();
        prop_assert!(normalized.windows(2).all(|w| w[0] > w[1]));
        for day in days {
            prop_assert!(normalized.contains(&day));
        }
    }

    #[test]
    fn prop_reminder_targets_match_offsets(offset in 0u32..=365) {
        let today = d(2025, 1, 1);
        let settings = Settings {
            renewal_reminder_days: vec![offset],
            ..Settings::default()
        };
        let client = client();
        let end = today + chrono::Days::new(u64::from(offset));
        let jobs = ReminderPlanner::new(&settings, today)
            .renewal_jobs(vec![(policy_ending(&client, end), client.clone())]);
        prop_assert_eq!(jobs.len(), 1);
        prop_assert_eq!(jobs[0].kind, ReminderKind::Renewal { days_before: offset });
    }
}
