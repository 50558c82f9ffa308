//! Process startup shared by the API server and the automation binary

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_automation::{EmailSender, WhatsAppSender};
use domain_client::DocumentStorePort;
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, PostgresAutomationAdapter, PostgresClientAdapter,
    PostgresPolicyAdapter,
};
use infra_external::{CloudinaryStore, LogOnlyEmail, LogOnlyWhatsApp, Msg91WhatsApp, SmtpMailer};

use crate::config::ApiConfig;
use crate::ApiPorts;

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over `CRM_LOG_LEVEL` when both are set.
pub fn init_tracing(config: &ApiConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Connects to Postgres, applies migrations and builds every port
pub async fn connect(config: &ApiConfig) -> anyhow::Result<ApiPorts> {
    let pool = create_pool(
        DatabaseConfig::new(&config.database_url).max_connections(config.database_max_connections),
    )
    .await
    .context("connecting to the database")?;
    run_migrations(&pool).await.context("applying migrations")?;

    let currency = config.currency()?;
    let clients = Arc::new(PostgresClientAdapter::new(pool.clone()));
    let policies = Arc::new(PostgresPolicyAdapter::new(pool.clone()).with_currency(currency));
    let automation = Arc::new(PostgresAutomationAdapter::new(pool));

    Ok(ApiPorts {
        leads: clients.clone(),
        clients: clients.clone(),
        documents: clients.clone(),
        activities: clients,
        policy_templates: policies.clone(),
        policies,
        settings: automation.clone(),
        whatsapp_templates: automation,
        whatsapp: whatsapp_sender(config)?,
        email: email_sender(config)?,
        document_store: document_store(config)?,
    })
}

fn whatsapp_sender(config: &ApiConfig) -> anyhow::Result<Arc<dyn WhatsAppSender>> {
    match config.msg91_config() {
        Some(msg91) => {
            info!("WhatsApp messages go through MSG91");
            Ok(Arc::new(Msg91WhatsApp::new(msg91)?))
        }
        None => {
            warn!("MSG91 is not configured, WhatsApp messages will only be logged");
            Ok(Arc::new(LogOnlyWhatsApp))
        }
    }
}

fn email_sender(config: &ApiConfig) -> anyhow::Result<Arc<dyn EmailSender>> {
    match config.smtp_config() {
        Some(smtp) => {
            info!(host = %smtp.host, "Email goes through SMTP");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            warn!("SMTP is not configured, emails will only be logged");
            Ok(Arc::new(LogOnlyEmail))
        }
    }
}

fn document_store(config: &ApiConfig) -> anyhow::Result<Option<Arc<dyn DocumentStorePort>>> {
    match config.cloudinary_config() {
        Some(cloudinary) => Ok(Some(Arc::new(CloudinaryStore::new(cloudinary)?))),
        None => {
            warn!("Cloudinary is not configured, document uploads are disabled");
            Ok(None)
        }
    }
}
