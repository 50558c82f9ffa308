//! API configuration
//!
//! Read from `CRM_*` environment variables (and a `.env` file, loaded by the
//! binaries). Nested sections use a double underscore, e.g.
//! `CRM_SMTP__HOST` or `CRM_CLOUDINARY__API_SECRET`.

use std::time::Duration;

use serde::Deserialize;

use core_kernel::{CoreError, Currency, Timezone};
use infra_external::{CloudinaryConfig, Msg91Config, SmtpConfig};

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// The single agent account
    pub admin_email: String,
    /// Argon2 PHC string; login is refused while empty
    pub admin_password_hash: String,
    /// IANA zone the agent works in; decides what "today" is
    pub timezone: String,
    /// Currency dashboard totals are reported in
    pub currency: String,
    pub dashboard_cache_ttl_secs: u64,
    pub max_upload_bytes: u64,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    pub cloudinary: Option<CloudinarySettings>,
    pub msg91: Option<Msg91Settings>,
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Msg91Settings {
    pub auth_key: String,
    pub integrated_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    #[serde(default = "default_true")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/agent_crm".to_string(),
            database_max_connections: 10,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 24 * 3600,
            admin_email: "agent@example.com".to_string(),
            admin_password_hash: String::new(),
            timezone: "Asia/Kolkata".to_string(),
            currency: "INR".to_string(),
            dashboard_cache_ttl_secs: 60,
            max_upload_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            cloudinary: None,
            msg91: None,
            smtp: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `CRM_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CRM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `CRM_TIMEZONE` as a timezone
    pub fn timezone(&self) -> Result<Timezone, CoreError> {
        Ok(self.timezone.parse()?)
    }

    /// `CRM_CURRENCY` as a currency
    pub fn currency(&self) -> Result<Currency, CoreError> {
        Ok(self.currency.parse()?)
    }

    pub fn dashboard_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard_cache_ttl_secs)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn cloudinary_config(&self) -> Option<CloudinaryConfig> {
        self.cloudinary.as_ref().map(|c| {
            let mut config = CloudinaryConfig::new(&c.cloud_name, &c.api_key, &c.api_secret);
            if c.folder.is_some() {
                config.default_folder = c.folder.clone();
            }
            config
        })
    }

    pub fn msg91_config(&self) -> Option<Msg91Config> {
        self.msg91
            .as_ref()
            .map(|m| Msg91Config::new(&m.auth_key, &m.integrated_number))
    }

    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        self.smtp.as_ref().map(|s| {
            let mut config = SmtpConfig::new(&s.host, &s.username, &s.password);
            config.port = s.port;
            config.starttls = s.starttls;
            config.from_name = s.from_name.clone();
            if let Some(ref from) = s.from_email {
                config.from_email = from.clone();
            }
            config
        })
    }
}
