//! Settings DTOs

use serde::Deserialize;
use validator::Validate;

use domain_automation::SettingsUpdate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 200))]
    pub agent_name: Option<String>,
    #[validate(length(max = 200))]
    pub agency_name: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub agent_phone: Option<String>,
    #[validate(email)]
    pub agent_email: Option<String>,
    pub birthday_automation_enabled: Option<bool>,
    pub renewal_automation_enabled: Option<bool>,
    /// Days before expiry on which reminders go out
    #[validate(length(min = 1, max = 10))]
    pub renewal_reminder_days: Option<Vec<u32>>,
    pub whatsapp_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    #[validate(length(min = 1, max = 4))]
    pub default_country_code: Option<String>,
}

impl From<UpdateSettingsRequest> for SettingsUpdate {
    fn from(r: UpdateSettingsRequest) -> Self {
        SettingsUpdate {
            agent_name: r.agent_name,
            agency_name: r.agency_name,
            agent_phone: r.agent_phone,
            agent_email: r.agent_email,
            birthday_automation_enabled: r.birthday_automation_enabled,
            renewal_automation_enabled: r.renewal_automation_enabled,
            renewal_reminder_days: r.renewal_reminder_days,
            whatsapp_enabled: r.whatsapp_enabled,
            email_enabled: r.email_enabled,
            default_country_code: r.default_country_code,
        }
    }
}
