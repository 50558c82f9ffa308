//! Repository implementations, one per table
//!
//! Repositories speak in row types and plain SQL; the adapters in
//! [`crate::adapters`] convert rows to domain types. Statements that must
//! share a transaction are exposed as `*_in` functions taking a connection.

pub mod activity;
pub mod automation;
pub mod client;
pub mod document;
pub mod lead;
pub mod policy;

pub use activity::ActivityRepository;
pub use automation::{SettingsRepository, WhatsAppTemplateRepository};
pub use client::ClientRepository;
pub use document::DocumentRepository;
pub use lead::LeadRepository;
pub use policy::{PolicyInstanceRepository, PolicyTemplateRepository};

/// `%needle%` for a `LIKE` match, with `LIKE` wildcards in `needle` escaped
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub(crate) fn to_i64(value: u32) -> i64 {
    i64::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("anita"), "%anita%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
