//! Tests for domain_policy

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, Currency, Money};
use domain_policy::{
    NewPolicyInstance, NewPolicyTemplate, PolicyError, PolicyInstance, PolicyStatus,
    PolicyTemplate, PolicySummary, PolicyType, PremiumFrequency, RenewalRequest,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn template() -> PolicyTemplate {
    PolicyTemplate::new(NewPolicyTemplate {
        name: "Jeevan Anand".to_string(),
        insurer: "LIC".to_string(),
        policy_type: PolicyType::Life,
        description: None,
        default_premium: Money::inr(dec!(2500)),
        default_sum_insured: Some(Money::inr(dec!(500000))),
        default_term_months: 12,
        premium_frequency: PremiumFrequency::Monthly,
    })
    .unwrap()
}

fn new_policy(number: &str, start: NaiveDate) -> NewPolicyInstance {
    NewPolicyInstance {
        policy_number: number.to_string(),
        client_id: ClientId::new(),
        start_date: start,
        end_date: None,
        term_months: None,
        premium: None,
        sum_insured: None,
        premium_frequency: None,
        notes: None,
    }
}

// ============================================================================
// Issuing Tests
// ============================================================================

mod issue_tests {
    use super::*;

    #[test]
    fn test_copies_template_defaults() {
        let template = template();
        let policy = PolicyInstance::from_template(&template, new_policy("LIC-1001", d(2024, 4, 1))).unwrap();

        assert_eq!(policy.template_id, template.id);
        assert_eq!(policy.premium, Money::inr(dec!(2500)));
        assert_eq!(policy.sum_insured, Some(Money::inr(dec!(500000))));
        assert_eq!(policy.premium_frequency, PremiumFrequency::Monthly);
        assert_eq!(policy.end_date, d(2025, 3, 31));
        assert_eq!(policy.status, PolicyStatus::Active);
    }

    #[test]
    fn test_overrides_win() {
        let mut input = new_policy("LIC-1002", d(2024, 4, 1));
        input.premium = Some(Money::inr(dec!(30000)));
        input.premium_frequency = Some(PremiumFrequency::Annual);
        input.term_months = Some(24);

        let policy = PolicyInstance::from_template(&template(), input).unwrap();
        assert_eq!(policy.premium, Money::inr(dec!(30000)));
        assert_eq!(policy.end_date, d(2026, 3, 31));
    }

    #[test]
    fn test_end_date_must_follow_start() {
        let mut input = new_policy("LIC-1003", d(2024, 4, 1));
        input.end_date = Some(d(2024, 4, 1));
        assert!(matches!(
            PolicyInstance::from_template(&template(), input),
            Err(PolicyError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_inactive_template_rejected() {
        let mut template = template();
        template.is_active = false;
        let err = PolicyInstance::from_template(&template, new_policy("LIC-1004", d(2024, 4, 1))).unwrap_err();
        assert!(err.is_state_conflict());
    }

    #[test]
    fn test_annualized_premium() {
        let policy = PolicyInstance::from_template(&template(), new_policy("LIC-1005", d(2024, 4, 1))).unwrap();
        assert_eq!(policy.annualized_premium(), Money::inr(dec!(30000)));
    }
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_renewal_dates_and_number() {
        let mut policy = PolicyInstance::from_template(&template(), new_policy("LIC-2001", d(2024, 4, 1))).unwrap();
        let renewed = policy.renew(RenewalRequest::default()).unwrap();

        assert_eq!(policy.status, PolicyStatus::Renewed);
        assert_eq!(renewed.status, PolicyStatus::Active);
        assert_eq!(renewed.start_date, d(2025, 4, 1));
        assert_eq!(renewed.end_date, d(2026, 3, 31));
        assert_eq!(renewed.policy_number, "LIC-2001-R1");
        assert_eq!(renewed.renewed_from, Some(policy.id));
        assert_eq!(renewed.client_id, policy.client_id);
    }

    #[test]
    fn test_renew_twice_rejected() {
        let mut policy = PolicyInstance::from_template(&template(), new_policy("LIC-2002", d(2024, 4, 1))).unwrap();
        policy.renew(RenewalRequest::default()).unwrap();
        assert!(matches!(
            policy.renew(RenewalRequest::default()),
            Err(PolicyError::InvalidStateTransition { from: PolicyStatus::Renewed, .. })
        ));
    }

    #[test]
    fn test_expired_policy_can_be_renewed() {
        let mut policy = PolicyInstance::from_template(&template(), new_policy("LIC-2003", d(2023, 1, 1))).unwrap();
        assert!(policy.expire_if_overdue(d(2024, 1, 1)));
        assert_eq!(policy.status, PolicyStatus::Expired);

        let renewed = policy
            .renew(RenewalRequest {
                policy_number: Some("LIC-9999".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(renewed.policy_number, "LIC-9999");
    }

    #[test]
    fn test_cancel_only_from_active() {
        let mut policy = PolicyInstance::from_template(&template(), new_policy("LIC-2004", d(2024, 4, 1))).unwrap();
        policy.cancel().unwrap();
        assert_eq!(policy.status, PolicyStatus::Cancelled);
        assert!(policy.cancel().is_err());
        assert!(policy.renew(RenewalRequest::default()).is_err());
    }

    #[test]
    fn test_end_date_is_still_covered() {
        let mut policy = PolicyInstance::from_template(&template(), new_policy("LIC-2005", d(2024, 4, 1))).unwrap();
        assert!(!policy.expire_if_overdue(d(2025, 3, 31)));
        assert!(policy.expire_if_overdue(d(2025, 4, 1)));
    }

    #[test]
    fn test_next_premium_due_stays_in_period() {
        let policy = PolicyInstance::from_template(&template(), new_policy("LIC-2006", d(2024, 4, 1))).unwrap();
        assert_eq!(policy.next_premium_due(d(2024, 4, 2)), Some(d(2024, 5, 1)));
        assert_eq!(policy.next_premium_due(d(2025, 3, 2)), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_renewal_keeps_term(year in 2000i32..2040, month in 1u32..=12, day in 1u32..=28, term in 1u32..=120) {
        let mut input = new_policy("P-1", d(year, month, day));
        input.term_months = Some(term);
        let mut policy = PolicyInstance::from_template(&template(), input).unwrap();
        let renewed = policy.renew(RenewalRequest::default()).unwrap();

        prop_assert_eq!(renewed.start_date, policy.end_date.succ_opt().unwrap());
        prop_assert_eq!(renewed.term_months().unwrap(), term);
    }

    #[test]
    fn prop_summary_ignores_other_currencies(count in 0usize..6) {
        let template = template();
        let policies: Vec<PolicyInstance> = (0..count)
            .map(|i| {
                let mut input = new_policy(&format!("U-{}", i), d(2024, 1, 1));
                input.premium = Some(Money::new(dec!(100), Currency::USD));
                PolicyInstance::from_template(&template, input).unwrap()
            })
            .collect();
        let summary = PolicySummary::compute(policies.iter(), d(2024, 6, 1), 30, Currency::INR);
        prop_assert_eq!(summary.active_count, count as u64);
        prop_assert!(summary.total_active_premium.is_zero());
    }
}
