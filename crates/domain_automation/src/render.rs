//! Message templating
//!
//! Bodies use `{{name}}` placeholders; whitespace inside the braces is
//! ignored, so `{{ name }}` is the same placeholder. An unterminated `{{`
//! is copied through as text.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use core_kernel::calendar;
use domain_client::Client;
use domain_policy::{PolicyInstance, PolicyTemplate};

use crate::error::AutomationError;
use crate::settings::Settings;

/// Variable values keyed by placeholder name
pub type Variables = BTreeMap<String, String>;

/// Date format used in customer-facing messages (`31 Mar 2025`)
pub const MESSAGE_DATE_FORMAT: &str = "%d %b %Y";

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn segments(body: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = body;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        if open > 0 {
            out.push(Segment::Text(&rest[..open]));
        }
        out.push(Segment::Placeholder(after_open[..close].trim()));
        rest = &after_open[close + 2..];
    }
    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

/// Placeholder names in order of first appearance, without duplicates
pub fn extract_placeholders(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in segments(body) {
        if let Segment::Placeholder(name) = segment {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Substitutes every placeholder; a placeholder without a value is an error
pub fn render(body: &str, vars: &Variables) -> Result<String, AutomationError> {
    let mut out = String::with_capacity(body.len());
    for segment in segments(body) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(name) => {
                let value = vars
                    .get(name)
                    .ok_or_else(|| AutomationError::MissingVariable(name.to_string()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Variables describing a client and the agent sending to them
pub fn client_variables(client: &Client, settings: &Settings, today: NaiveDate) -> Variables {
    let mut vars = Variables::new();
    vars.insert("client_name".into(), client.full_name());
    vars.insert("first_name".into(), client.first_name.clone());
    vars.insert("last_name".into(), client.last_name.clone());
    vars.insert("agent_name".into(), settings.agent_name.clone());
    if let Some(ref agency) = settings.agency_name {
        vars.insert("agency_name".into(), agency.clone());
    }
    if let Some(ref phone) = settings.agent_phone {
        vars.insert("agent_phone".into(), phone.clone());
    }
    if let Some(age) = client.age_on(today) {
        vars.insert("age".into(), age.to_string());
    }
    vars
}

/// Variables describing a policy, merged into `vars`
pub fn add_policy_variables(
    vars: &mut Variables,
    policy: &PolicyInstance,
    template: Option<&PolicyTemplate>,
    today: NaiveDate,
) {
    vars.insert("policy_number".into(), policy.policy_number.clone());
    vars.insert("start_date".into(), policy.start_date.format(MESSAGE_DATE_FORMAT).to_string());
    vars.insert("end_date".into(), policy.end_date.format(MESSAGE_DATE_FORMAT).to_string());
    vars.insert(
        "days_left".into(),
        calendar::days_until(today, policy.end_date).max(0).to_string(),
    );
    vars.insert("premium".into(), policy.premium.to_display_string());
    if let Some(sum_insured) = policy.sum_insured {
        vars.insert("sum_insured".into(), sum_insured.to_display_string());
    }
    if let Some(template) = template {
        vars.insert("policy_name".into(), template.name.clone());
        vars.insert("insurer".into(), template.insurer.clone());
        vars.insert("policy_type".into(), template.policy_type.label().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_whitespace_tolerant() {
        let body = "Dear {{ first_name }}, your policy {{policy_number}} ends on {{end_date}}.";
        let out = render(
            body,
            &vars(&[("first_name", "Asha"), ("policy_number", "LIC-1"), ("end_date", "31 Mar 2025")]),
        )
        .unwrap();
        assert_eq!(out, "Dear Asha, your policy LIC-1 ends on 31 Mar 2025.");
    }

    #[test]
    fn test_render_missing_variable_fails() {
        let err = render("Hi {{first_name}} {{ surname }}", &vars(&[("first_name", "Asha")])).unwrap_err();
        assert!(matches!(err, AutomationError::MissingVariable(ref name) if name == "surname"));
    }

    #[test]
    fn test_unterminated_braces_are_text() {
        assert_eq!(render("50% off {{ soon", &Variables::new()).unwrap(), "50% off {{ soon");
        assert_eq!(extract_placeholders("{{a}} and {{b"), vec!["a".to_string()]);
    }

    #[test]
    fn test_extract_placeholders_dedupes_in_order() {
        assert_eq!(
            extract_placeholders("{{b}} {{a}} {{ b }}"),
            vec!["b".to_string(), "a".to_string()]
        );
    }
}
