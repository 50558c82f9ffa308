//! HTTP API Layer
//!
//! REST API for the agent CRM built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource, each calling domain ports
//! - **Middleware**: authentication, audit logging, dashboard cache invalidation
//! - **DTOs**: request/response bodies with `validator` rules
//! - **Error Handling**: one JSON error envelope for every failure
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{bootstrap, create_router, config::ApiConfig, AppState};
//!
//! let config = ApiConfig::from_env()?;
//! let ports = bootstrap::connect(&config).await?;
//! let app = create_router(AppState::new(config, ports)?);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{CoreError, Currency, TtlCache, Timezone};
use domain_automation::{
    AutomationPorts, AutomationRunner, EmailSender, SettingsPort, WhatsAppSender,
    WhatsAppTemplatePort,
};
use domain_client::{ActivityPort, ClientPort, DocumentPort, DocumentStorePort, LeadPort};
use domain_policy::{PolicyInstancePort, PolicyTemplatePort};

use crate::config::ApiConfig;
use crate::dto::dashboard::DashboardStats;
use crate::handlers::{
    activities, auth as auth_handlers, automation, clients, dashboard, documents, health, leads,
    policies, policy_templates, settings, whatsapp_templates,
};
use crate::middleware::{audit_middleware, auth_middleware, dashboard_invalidation};

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Every port the API talks to
#[derive(Clone)]
pub struct ApiPorts {
    pub leads: Arc<dyn LeadPort>,
    pub clients: Arc<dyn ClientPort>,
    pub documents: Arc<dyn DocumentPort>,
    pub activities: Arc<dyn ActivityPort>,
    pub policy_templates: Arc<dyn PolicyTemplatePort>,
    pub policies: Arc<dyn PolicyInstancePort>,
    pub settings: Arc<dyn SettingsPort>,
    pub whatsapp_templates: Arc<dyn WhatsAppTemplatePort>,
    pub whatsapp: Arc<dyn WhatsAppSender>,
    pub email: Arc<dyn EmailSender>,
    /// Absent when Cloudinary is not configured; uploads are then refused
    pub document_store: Option<Arc<dyn DocumentStorePort>>,
}

impl ApiPorts {
    pub fn automation(&self) -> AutomationPorts {
        AutomationPorts {
            clients: self.clients.clone(),
            activities: self.activities.clone(),
            policies: self.policies.clone(),
            policy_templates: self.policy_templates.clone(),
            settings: self.settings.clone(),
            whatsapp_templates: self.whatsapp_templates.clone(),
            whatsapp: self.whatsapp.clone(),
            email: self.email.clone(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub ports: ApiPorts,
    pub runner: AutomationRunner,
    pub dashboard_cache: TtlCache<&'static str, DashboardStats>,
    pub timezone: Timezone,
    pub currency: Currency,
}

impl AppState {
    pub fn new(config: ApiConfig, ports: ApiPorts) -> Result<Self, CoreError> {
        let timezone = config.timezone()?;
        let currency = config.currency()?;
        let runner = AutomationRunner::new(ports.automation(), timezone);
        Ok(Self {
            dashboard_cache: TtlCache::new(config.dashboard_cache_ttl()),
            config: Arc::new(config),
            ports,
            runner,
            timezone,
            currency,
        })
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let upload_limit = (state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES) as usize;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let login_routes = Router::new()
        .route("/auth/login", post(auth_handlers::login))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware));

    let lead_routes = Router::new()
        .route("/", get(leads::list_leads).post(leads::create_lead))
        .route(
            "/:id",
            get(leads::get_lead).put(leads::update_lead).delete(leads::delete_lead),
        )
        .route("/:id/convert", post(leads::convert_lead));

    let client_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/:id/documents", get(documents::list_client_documents));

    let policy_template_routes = Router::new()
        .route(
            "/",
            get(policy_templates::list_templates).post(policy_templates::create_template),
        )
        .route(
            "/:id",
            get(policy_templates::get_template)
                .put(policy_templates::update_template)
                .delete(policy_templates::delete_template),
        );

    let policy_routes = Router::new()
        .route("/", get(policies::list_policies).post(policies::create_policy))
        .route(
            "/:id",
            get(policies::get_policy)
                .put(policies::update_policy)
                .delete(policies::delete_policy),
        )
        .route("/:id/renew", post(policies::renew_policy))
        .route("/:id/cancel", post(policies::cancel_policy));

    let whatsapp_template_routes = Router::new()
        .route(
            "/",
            get(whatsapp_templates::list_templates).post(whatsapp_templates::create_template),
        )
        .route(
            "/:id",
            get(whatsapp_templates::get_template)
                .put(whatsapp_templates::update_template)
                .delete(whatsapp_templates::delete_template),
        )
        .route("/:id/preview", post(whatsapp_templates::preview_template));

    let automation_routes = Router::new()
        .route("/birthdays", post(automation::run_birthdays))
        .route("/renewals", post(automation::run_renewals))
        .route("/whatsapp", post(automation::send_whatsapp));

    // Protected API routes
    let api_routes = Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .nest("/leads", lead_routes)
        .nest("/clients", client_routes)
        .nest("/policy-templates", policy_template_routes)
        .nest("/policies", policy_routes)
        .nest("/whatsapp-templates", whatsapp_template_routes)
        .nest("/automation", automation_routes)
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/activities", get(activities::list_activities))
        .route(
            "/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/:id", delete(documents::delete_document))
        .route("/settings", get(settings::get_settings).put(settings::update_settings))
        .layer(axum_middleware::from_fn_with_state(state.clone(), dashboard_invalidation))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", login_routes.merge(api_routes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
