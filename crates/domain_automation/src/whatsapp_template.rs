//! WhatsApp message templates
//!
//! WhatsApp business messages must use templates approved with the
//! provider. A CRM template pairs the provider's template name with a
//! local body (for previews and logs) whose placeholders map, in order of
//! `variables`, to the provider's `body_1..body_n` parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::WhatsAppTemplateId;

use crate::error::AutomationError;
use crate::render::{extract_placeholders, render, Variables};

/// What a template is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePurpose {
    Birthday,
    RenewalReminder,
    Welcome,
    Custom,
}

impl TemplatePurpose {
    pub const ALL: [TemplatePurpose; 4] = [
        TemplatePurpose::Birthday,
        TemplatePurpose::RenewalReminder,
        TemplatePurpose::Welcome,
        TemplatePurpose::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplatePurpose::Birthday => "birthday",
            TemplatePurpose::RenewalReminder => "renewal_reminder",
            TemplatePurpose::Welcome => "welcome",
            TemplatePurpose::Custom => "custom",
        }
    }
}

impl fmt::Display for TemplatePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplatePurpose {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplatePurpose::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AutomationError::validation(format!("unknown template purpose '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsAppTemplate {
    pub id: WhatsAppTemplateId,
    /// Local, unique name
    pub name: String,
    /// Template name registered with the provider
    pub provider_template: String,
    pub language_code: String,
    pub namespace: Option<String>,
    pub purpose: TemplatePurpose,
    pub body: String,
    /// Placeholder names in provider parameter order
    pub variables: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWhatsAppTemplate {
    pub name: String,
    pub provider_template: String,
    pub language_code: Option<String>,
    pub namespace: Option<String>,
    pub purpose: TemplatePurpose,
    pub body: String,
    /// Defaults to the placeholders of `body` in order of appearance
    pub variables: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct WhatsAppTemplateUpdate {
    pub name: Option<String>,
    pub provider_template: Option<String>,
    pub language_code: Option<String>,
    pub namespace: Option<String>,
    pub purpose: Option<TemplatePurpose>,
    pub body: Option<String>,
    pub variables: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// A template filled in for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTemplate {
    pub body: String,
    /// Values for `body_1..body_n`
    pub parameters: Vec<String>,
}

impl WhatsAppTemplate {
    pub fn new(input: NewWhatsAppTemplate) -> Result<Self, AutomationError> {
        let now = Utc::now();
        let variables = input
            .variables
            .unwrap_or_else(|| extract_placeholders(&input.body));
        let template = Self {
            id: WhatsAppTemplateId::new(),
            name: input.name.trim().to_string(),
            provider_template: input.provider_template.trim().to_string(),
            language_code: input
                .language_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "en".to_string()),
            namespace: input.namespace.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            purpose: input.purpose,
            body: input.body,
            variables: clean_variables(variables),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn apply(mut self, update: WhatsAppTemplateUpdate) -> Result<Self, AutomationError> {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(provider_template) = update.provider_template {
            self.provider_template = provider_template.trim().to_string();
        }
        if let Some(code) = update.language_code {
            self.language_code = code.trim().to_string();
        }
        if let Some(namespace) = update.namespace {
            let namespace = namespace.trim().to_string();
            self.namespace = (!namespace.is_empty()).then_some(namespace);
        }
        if let Some(purpose) = update.purpose {
            self.purpose = purpose;
        }
        if let Some(body) = update.body {
            if update.variables.is_none() {
                self.variables = extract_placeholders(&body);
            }
            self.body = body;
        }
        if let Some(variables) = update.variables {
            self.variables = clean_variables(variables);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), AutomationError> {
        if self.name.is_empty() {
            return Err(AutomationError::validation("template name is required"));
        }
        if self.provider_template.is_empty() {
            return Err(AutomationError::validation("provider template name is required"));
        }
        if self.language_code.is_empty() {
            return Err(AutomationError::validation("language code is required"));
        }
        if self.body.trim().is_empty() {
            return Err(AutomationError::validation("template body is required"));
        }
        for placeholder in extract_placeholders(&self.body) {
            if !self.variables.contains(&placeholder) {
                return Err(AutomationError::UndeclaredVariable(placeholder));
            }
        }
        Ok(())
    }

    /// Renders the body and the ordered provider parameters
    pub fn render(&self, vars: &Variables) -> Result<RenderedTemplate, AutomationError> {
        let body = render(&self.body, vars)?;
        let parameters = self
            .variables
            .iter()
            .map(|name| {
                vars.get(name)
                    .cloned()
                    .ok_or_else(|| AutomationError::MissingVariable(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RenderedTemplate { body, parameters })
    }
}

fn clean_variables(variables: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(variables.len());
    for name in variables {
        let name = name.trim().to_string();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(body: &str) -> NewWhatsAppTemplate {
        NewWhatsAppTemplate {
            name: "Renewal 7 days".into(),
            provider_template: "policy_renewal_v2".into(),
            language_code: None,
            namespace: None,
            purpose: TemplatePurpose::RenewalReminder,
            body: body.into(),
            variables: None,
        }
    }

    #[test]
    fn test_variables_default_to_body_order() {
        let template = WhatsAppTemplate::new(input("Hi {{first_name}}, {{policy_number}} ends {{end_date}}")).unwrap();
        assert_eq!(template.variables, vec!["first_name", "policy_number", "end_date"]);
        assert_eq!(template.language_code, "en");
    }

    #[test]
    fn test_undeclared_placeholder_rejected() {
        let mut new = input("Hi {{first_name}} {{age}}");
        new.variables = Some(vec!["first_name".into()]);
        assert!(matches!(
            WhatsAppTemplate::new(new),
            Err(AutomationError::UndeclaredVariable(ref v)) if v == "age"
        ));
    }

    #[test]
    fn test_render_orders_parameters_by_variables() {
        let mut new = input("{{policy_number}} for {{first_name}}");
        new.variables = Some(vec!["first_name".into(), "policy_number".into()]);
        let template = WhatsAppTemplate::new(new).unwrap();

        let vars: Variables = [("first_name", "Ravi"), ("policy_number", "P-9")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let rendered = template.render(&vars).unwrap();
        assert_eq!(rendered.body, "P-9 for Ravi");
        assert_eq!(rendered.parameters, vec!["Ravi", "P-9"]);
    }
}
