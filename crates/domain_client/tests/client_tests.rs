//! Tests for domain_client

use chrono::{Datelike, NaiveDate, Utc};
use proptest::prelude::*;

use domain_client::client::{Client, ClientUpdate, NewClient};
use domain_client::error::ClientError;
use domain_client::lead::{ConversionDetails, Lead, LeadSource, LeadStatus, LeadUpdate, NewLead};
use domain_client::validation::{normalize_phone, to_msisdn};

fn new_lead() -> NewLead {
    NewLead {
        name: "Sunil Gupta".to_string(),
        email: Some("sunil@example.com".to_string()),
        phone: "+91 99887 76655".to_string(),
        source: LeadSource::Website,
        interested_in: Some("Health".to_string()),
        notes: Some("Wants family floater".to_string()),
        follow_up_date: None,
    }
}

fn new_client() -> NewClient {
    NewClient {
        first_name: "Priya".to_string(),
        last_name: "Nair".to_string(),
        email: Some("priya@example.com".to_string()),
        phone: "9988776655".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1988, 3, 12),
        city: Some("Kochi".to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Lead Tests
// ============================================================================

mod lead_tests {
    use super::*;

    #[test]
    fn test_lead_requires_name_and_phone() {
        let mut input = new_lead();
        input.name = "   ".to_string();
        input.phone = "12".to_string();

        let err = Lead::new(input).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Name is required"));
        assert!(message.contains("Phone"));
    }

    #[test]
    fn test_lead_rejects_bad_email() {
        let mut input = new_lead();
        input.email = Some("not-an-email".to_string());
        assert!(matches!(Lead::new(input), Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_open_statuses_move_freely() {
        let mut lead = Lead::new(new_lead()).unwrap();
        lead.transition_to(LeadStatus::Qualified).unwrap();
        lead.transition_to(LeadStatus::Contacted).unwrap();
        lead.transition_to(LeadStatus::ProposalSent).unwrap();
        assert_eq!(lead.status, LeadStatus::ProposalSent);
    }

    #[test]
    fn test_converted_is_terminal() {
        let mut lead = Lead::new(new_lead()).unwrap();
        lead.mark_converted(core_kernel::ClientId::new()).unwrap();

        for status in LeadStatus::ALL {
            if status == LeadStatus::Converted {
                continue;
            }
            assert!(lead.clone().transition_to(status).is_err(), "{status} should be rejected");
        }
        assert!(matches!(
            lead.mark_converted(core_kernel::ClientId::new()),
            Err(ClientError::AlreadyConverted)
        ));
    }

    #[test]
    fn test_converted_not_reachable_by_update() {
        let lead = Lead::new(new_lead()).unwrap();
        let err = lead
            .apply(LeadUpdate {
                status: Some(LeadStatus::Converted),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_lost_reopens_only_to_new() {
        let mut lead = Lead::new(new_lead()).unwrap();
        lead.transition_to(LeadStatus::Lost).unwrap();

        assert!(lead.clone().transition_to(LeadStatus::Contacted).is_err());
        assert!(matches!(lead.to_new_client(ConversionDetails::default()), Err(ClientError::LeadLost)));

        lead.transition_to(LeadStatus::New).unwrap();
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_conversion_carries_contact_data() {
        let lead = Lead::new(new_lead()).unwrap();
        let dob = NaiveDate::from_ymd_opt(1979, 11, 2).unwrap();
        let new_client = lead
            .to_new_client(ConversionDetails {
                date_of_birth: Some(dob),
                city: Some("Jaipur".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(new_client.first_name, "Sunil");
        assert_eq!(new_client.last_name, "Gupta");
        assert_eq!(new_client.email.as_deref(), Some("sunil@example.com"));
        assert_eq!(new_client.phone, "+919988776655");
        assert_eq!(new_client.lead_id, Some(lead.id));

        let client = Client::new(new_client).unwrap();
        assert_eq!(client.date_of_birth, Some(dob));
        assert_eq!(client.city.as_deref(), Some("Jaipur"));
    }

    #[test]
    fn test_follow_up_due() {
        let mut input = new_lead();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        input.follow_up_date = Some(today);
        let mut lead = Lead::new(input).unwrap();
        assert!(lead.is_follow_up_due(today));

        lead.transition_to(LeadStatus::Lost).unwrap();
        assert!(!lead.is_follow_up_due(today));
    }
}

// ============================================================================
// Client Tests
// ============================================================================

mod client_record_tests {
    use super::*;

    #[test]
    fn test_client_rejects_future_birth_date() {
        let mut input = new_client();
        input.date_of_birth = Utc::now().date_naive().succ_opt();
        assert!(Client::new(input).is_err());
    }

    #[test]
    fn test_update_revalidates() {
        let client = Client::new(new_client()).unwrap();
        let err = client
            .apply(ClientUpdate {
                email: Some("broken@".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("Invalid email"));
    }

    #[test]
    fn test_whatsapp_msisdn_uses_default_country() {
        let client = Client::new(new_client()).unwrap();
        assert_eq!(client.whatsapp_msisdn("91").unwrap(), "919988776655");
    }

    #[test]
    fn test_birthday_and_age() {
        let client = Client::new(new_client()).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert!(client.is_birthday_on(birthday));
        assert_eq!(client.age_on(birthday), Some(37));
        assert!(!client.is_birthday_on(birthday.succ_opt().unwrap()));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_normalized_phone_is_stable(digits in "[0-9]{7,15}", plus in any::<bool>()) {
        let raw = if plus { format!("+{}", digits) } else { digits.clone() };
        let once = normalize_phone(&raw).unwrap();
        let twice = normalize_phone(&once).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.trim_start_matches('+'), digits.as_str());
    }

    #[test]
    fn prop_msisdn_is_digits_only(digits in "[1-9][0-9]{9}") {
        let msisdn = to_msisdn(&digits, "91").unwrap();
        prop_assert!(msisdn.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(msisdn.starts_with("91"));
        prop_assert_eq!(msisdn.len(), 12);
    }

    #[test]
    fn prop_client_birthday_matches_month_and_day(year in 1940i32..2005, ordinal in 1u32..365) {
        let dob = NaiveDate::from_yo_opt(year, ordinal).unwrap();
        let mut input = new_client();
        input.date_of_birth = Some(dob);
        let client = Client::new(input).unwrap();

        if let Some(same_day) = NaiveDate::from_ymd_opt(2030, dob.month(), dob.day()) {
            prop_assert!(client.is_birthday_on(same_day));
        }
    }
}
