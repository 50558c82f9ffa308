//! Contact validation rules
//!
//! Leads and clients share the same contact rules:
//! - A name is required
//! - Email, when present, must look like `local@domain.tld`
//! - Phone numbers are normalised to an optional leading `+` followed by
//!   7 to 15 digits (E.164 length)
//! - Dates of birth cannot be in the future or more than 120 years back
//!
//! Outbound WhatsApp messages need the full international number without
//! the `+`; [`to_msisdn`] derives it using the agent's default country code.

use chrono::NaiveDate;

use crate::error::ClientError;

/// Result of contact validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the record is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Adds a warning to the result
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Converts into `Err(ClientError::ValidationFailed)` when invalid
    pub fn into_result(self) -> Result<Vec<String>, ClientError> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(ClientError::validation_failed(self.errors))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Validator for contact details on leads and clients
pub struct ContactValidator;

impl ContactValidator {
    /// Checks that a name field is present
    pub fn validate_name(field: &str, value: &str, result: &mut ValidationResult) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            result.add_error(format!("{} is required", field));
        } else if trimmed.chars().count() > 200 {
            result.add_error(format!("{} must be at most 200 characters", field));
        }
    }

    /// Checks an optional email address
    pub fn validate_email(email: Option<&str>, result: &mut ValidationResult) {
        if let Some(email) = email {
            if !is_valid_email(email) {
                result.add_error(format!("Invalid email format: {}", email));
            }
        }
    }

    /// Checks a required phone number
    pub fn validate_phone(field: &str, phone: &str, result: &mut ValidationResult) {
        if let Err(message) = normalize_phone(phone) {
            result.add_error(format!("{}: {}", field, message));
        }
    }

    /// Checks a date of birth against `today`
    pub fn validate_date_of_birth(dob: Option<NaiveDate>, today: NaiveDate, result: &mut ValidationResult) {
        if let Some(dob) = dob {
            if dob > today {
                result.add_error("Date of birth cannot be in the future");
            } else if core_kernel::calendar::age_on(dob, today) > 120 {
                result.add_error("Date of birth is more than 120 years ago");
            }
        }
    }
}

/// Lowercases and trims an email address; blank input becomes `None`
pub fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Trims optional free text; blank input becomes `None`
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Basic structural email check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Strips formatting from a phone number
///
/// Spaces, dashes, dots and parentheses are removed; a single leading `+`
/// is kept. The remaining digits must number 7 to 15.
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '.' | '(' | ')' => {}
            other => return Err(format!("unexpected character '{}' in phone number", other)),
        }
    }

    if !(7..=15).contains(&digits.len()) {
        return Err(format!("phone number must have 7 to 15 digits, got {}", digits.len()));
    }
    Ok(format!("{}{}", plus, digits))
}

/// International number without `+`, as expected by WhatsApp gateways
///
/// - `+44 20 7946 0958` → `442079460958`
/// - `0091 98765 43210` → `919876543210`
/// - `98765 43210` with country code `91` → `919876543210`
/// - `098765 43210` with country code `91` → `919876543210`
pub fn to_msisdn(phone: &str, default_country_code: &str) -> Result<String, String> {
    let normalized = normalize_phone(phone)?;
    if let Some(international) = normalized.strip_prefix('+') {
        return Ok(international.to_string());
    }
    if let Some(international) = normalized.strip_prefix("00") {
        return Ok(international.to_string());
    }
    let cc: String = default_country_code.chars().filter(|c| c.is_ascii_digit()).collect();
    match normalized.len() {
        10 => Ok(format!("{}{}", cc, normalized)),
        11 if normalized.starts_with('0') => Ok(format!("{}{}", cc, &normalized[1..])),
        _ => Ok(normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("asha@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co.in"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("asha@@example.com"));
        assert!(!is_valid_email("asha @example.com"));
        assert!(!is_valid_email("asha@example..com"));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "+919876543210");
        assert_eq!(normalize_phone("(022) 2345.6789").unwrap(), "02223456789");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("98765x43210").is_err());
    }

    #[test]
    fn test_to_msisdn() {
        assert_eq!(to_msisdn("+44 20 7946 0958", "91").unwrap(), "442079460958");
        assert_eq!(to_msisdn("0091 98765 43210", "91").unwrap(), "919876543210");
        assert_eq!(to_msisdn("98765 43210", "91").unwrap(), "919876543210");
        assert_eq!(to_msisdn("098765 43210", "+91").unwrap(), "919876543210");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(Some("  Asha@Example.COM ".into())), Some("asha@example.com".into()));
        assert_eq!(normalize_email(Some("   ".into())), None);
    }
}
