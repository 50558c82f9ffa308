//! Client records
//!
//! A client is a customer the agent services: contact details, the date
//! of birth used for greetings, and a link back to the lead it came from.
//! Email addresses are unique across clients (compared case-insensitively).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::calendar;
use core_kernel::{ClientId, LeadId};

use crate::error::ClientError;
use crate::validation::{
    normalize_email, normalize_phone, normalize_text, to_msisdn, ContactValidator, ValidationResult,
};

/// A converted customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    /// Number used for WhatsApp when it differs from `phone`
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<LeadId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<LeadId>,
}

/// Partial update of a client; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
}

impl Client {
    /// Creates a validated client
    pub fn new(input: NewClient) -> Result<Self, ClientError> {
        let now = Utc::now();
        let client = Self {
            id: ClientId::new(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: normalize_email(input.email),
            phone: input.phone,
            whatsapp_number: normalize_text(input.whatsapp_number),
            date_of_birth: input.date_of_birth,
            address: normalize_text(input.address),
            city: normalize_text(input.city),
            occupation: normalize_text(input.occupation),
            notes: normalize_text(input.notes),
            lead_id: input.lead_id,
            created_at: now,
            updated_at: now,
        };
        client.validated(now.date_naive())
    }

    fn validated(mut self, today: NaiveDate) -> Result<Self, ClientError> {
        let mut result = ValidationResult::ok();
        ContactValidator::validate_name("First name", &self.first_name, &mut result);
        ContactValidator::validate_email(self.email.as_deref(), &mut result);
        ContactValidator::validate_phone("Phone", &self.phone, &mut result);
        if let Some(ref whatsapp) = self.whatsapp_number {
            ContactValidator::validate_phone("WhatsApp number", whatsapp, &mut result);
        }
        ContactValidator::validate_date_of_birth(self.date_of_birth, today, &mut result);
        result.into_result()?;

        self.phone = normalize_phone(&self.phone).map_err(ClientError::invalid)?;
        self.whatsapp_number = self
            .whatsapp_number
            .as_deref()
            .map(normalize_phone)
            .transpose()
            .map_err(ClientError::invalid)?;
        Ok(self)
    }

    /// Applies a partial update and re-validates
    pub fn apply(mut self, update: ClientUpdate) -> Result<Self, ClientError> {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if update.email.is_some() {
            self.email = normalize_email(update.email);
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if update.whatsapp_number.is_some() {
            self.whatsapp_number = normalize_text(update.whatsapp_number);
        }
        if update.date_of_birth.is_some() {
            self.date_of_birth = update.date_of_birth;
        }
        if update.address.is_some() {
            self.address = normalize_text(update.address);
        }
        if update.city.is_some() {
            self.city = normalize_text(update.city);
        }
        if update.occupation.is_some() {
            self.occupation = normalize_text(update.occupation);
        }
        if update.notes.is_some() {
            self.notes = normalize_text(update.notes);
        }
        self.updated_at = Utc::now();
        let today = self.updated_at.date_naive();
        self.validated(today)
    }

    /// "First Last", or just the first name when no last name is known
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    /// The number WhatsApp messages go to
    pub fn messaging_number(&self) -> &str {
        self.whatsapp_number.as_deref().unwrap_or(&self.phone)
    }

    /// Messaging number in gateway format (country code, no `+`)
    pub fn whatsapp_msisdn(&self, default_country_code: &str) -> Result<String, ClientError> {
        to_msisdn(self.messaging_number(), default_country_code).map_err(ClientError::invalid)
    }

    pub fn is_birthday_on(&self, date: NaiveDate) -> bool {
        self.date_of_birth
            .is_some_and(|dob| calendar::is_birthday_on(dob, date))
    }

    pub fn age_on(&self, date: NaiveDate) -> Option<i32> {
        self.date_of_birth.map(|dob| calendar::age_on(dob, date))
    }

    /// Case-insensitive match on name, email or phone digits
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let digits: String = needle.chars().filter(|c| c.is_ascii_digit()).collect();
        self.full_name().to_lowercase().contains(&needle)
            || self.email.as_deref().is_some_and(|e| e.contains(&needle))
            || (!digits.is_empty() && self.phone.contains(&digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client() -> NewClient {
        NewClient {
            first_name: "Anita".into(),
            last_name: "Desai".into(),
            email: Some("anita@example.com".into()),
            phone: "98200 12345".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_messaging_number_prefers_whatsapp() {
        let mut client = Client::new(new_client()).unwrap();
        assert_eq!(client.messaging_number(), "9820012345");

        client.whatsapp_number = Some("+919999900000".into());
        assert_eq!(client.messaging_number(), "+919999900000");
    }

    #[test]
    fn test_search_matches_name_email_and_phone() {
        let client = Client::new(new_client()).unwrap();
        assert!(client.matches_search("desai"));
        assert!(client.matches_search("ANITA@"));
        assert!(client.matches_search("98200"));
        assert!(!client.matches_search("mehta"));
    }

    #[test]
    fn test_full_name_without_last_name() {
        let mut input = new_client();
        input.last_name = String::new();
        assert_eq!(Client::new(input).unwrap().full_name(), "Anita");
    }
}
