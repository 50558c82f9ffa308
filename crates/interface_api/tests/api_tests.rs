//! Router tests against the in-memory ports

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use domain_automation::channels::mock::{RecordingEmail, RecordingWhatsApp};
use domain_automation::ports::mock::InMemoryAutomationStore;
use domain_client::ports::mock::{InMemoryClientStore, MockDocumentStore};
use domain_policy::ports::mock::InMemoryPolicyStore;
use interface_api::auth::{create_token, hash_password, AGENT_ROLE};
use interface_api::config::ApiConfig;
use interface_api::{create_router, ApiPorts, AppState};

const SECRET: &str = "test-secret";
const AGENT_EMAIL: &str = "agent@example.com";
const AGENT_PASSWORD: &str = "correct horse";
const BOUNDARY: &str = "crm-test-boundary";

struct TestApp {
    router: Router,
    token: String,
    clients: InMemoryClientStore,
    whatsapp: RecordingWhatsApp,
    store: MockDocumentStore,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(ApiConfig {
            jwt_secret: SECRET.into(),
            admin_email: AGENT_EMAIL.into(),
            ..ApiConfig::default()
        })
    }

    fn with_config(config: ApiConfig) -> Self {
        let clients = InMemoryClientStore::new();
        let policies = InMemoryPolicyStore::new();
        let automation = InMemoryAutomationStore::new();
        let whatsapp = RecordingWhatsApp::new();
        let store = MockDocumentStore::new();

        let ports = ApiPorts {
            leads: Arc::new(clients.clone()),
            clients: Arc::new(clients.clone()),
            documents: Arc::new(clients.clone()),
            activities: Arc::new(clients.clone()),
            policy_templates: Arc::new(policies.clone()),
            policies: Arc::new(policies),
            settings: Arc::new(automation.clone()),
            whatsapp_templates: Arc::new(automation),
            whatsapp: Arc::new(whatsapp.clone()),
            email: Arc::new(RecordingEmail::new()),
            document_store: Some(Arc::new(store.clone())),
        };
        let token = create_token(AGENT_EMAIL, vec![AGENT_ROLE.into()], &config.jwt_secret, 600).unwrap();
        let state = AppState::new(config, ports).unwrap();

        Self {
            router: create_router(state),
            token,
            clients,
            whatsapp,
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn upload(&self, fields: &[(&str, &str)], file: Option<(&str, &str, Vec<u8>)>) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn create_client(&self, first_name: &str, email: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/clients",
                Some(json!({
                    "first_name": first_name,
                    "last_name": "Sharma",
                    "email": email,
                    "phone": "98765 43210",
                    "date_of_birth": "1990-06-15",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn create_policy_template(&self) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/policy-templates",
                Some(json!({
                    "name": "Family Health Shield",
                    "insurer": "Star Health",
                    "policy_type": "health",
                    "default_premium": "12000",
                    "default_term_months": 12,
                    "premium_frequency": "annual",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app
        .send(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Request::get("/api/v1/leads").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .send(
            Request::get("/api/v1/leads")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_issues_a_usable_token() {
    let app = TestApp::with_config(ApiConfig {
        jwt_secret: SECRET.into(),
        admin_email: AGENT_EMAIL.into(),
        admin_password_hash: hash_password(AGENT_PASSWORD).unwrap(),
        ..ApiConfig::default()
    });

    let login = |password: &str| {
        Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": AGENT_EMAIL, "password": password }).to_string(),
            ))
            .unwrap()
    };

    let (status, _) = app.send(login("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(login(AGENT_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["token"].as_str().unwrap();

    let (status, me) = app
        .send(
            Request::get("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], AGENT_EMAIL);
}

#[tokio::test]
async fn test_invalid_lead_is_rejected_with_details() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/leads",
            Some(json!({ "name": "", "phone": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_lead_conversion_creates_client_once() {
    let app = TestApp::new();
    let (status, lead) = app
        .call(
            Method::POST,
            "/api/v1/leads",
            Some(json!({
                "name": "Priya Sharma",
                "email": "priya@example.com",
                "phone": "9876543210",
                "source": "referral",
                "interested_in": "health cover",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["status"], "new");
    let lead_id = id_of(&lead);

    let (status, client) = app
        .call(Method::POST, &format!("/api/v1/leads/{lead_id}/convert"), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{client}");
    assert_eq!(client["first_name"], "Priya");
    assert_eq!(client["last_name"], "Sharma");
    assert_eq!(client["lead_id"].as_str(), Some(lead_id.as_str()));

    let (_, lead) = app.call(Method::GET, &format!("/api/v1/leads/{lead_id}"), None).await;
    assert_eq!(lead["status"], "converted");

    let (status, body) = app
        .call(Method::POST, &format!("/api/v1/leads/{lead_id}/convert"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_malformed_convert_body_is_rejected() {
    let app = TestApp::new();
    let (_, lead) = app
        .call(
            Method::POST,
            "/api/v1/leads",
            Some(json!({ "name": "Dev Patel", "phone": "9876500011" })),
        )
        .await;
    let lead_id = id_of(&lead);

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/leads/{lead_id}/convert"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "bad_request");

    let (_, lead) = app.call(Method::GET, &format!("/api/v1/leads/{lead_id}"), None).await;
    assert_eq!(lead["status"], "new");
}

#[tokio::test]
async fn test_duplicate_client_email_conflicts() {
    let app = TestApp::new();
    app.create_client("Asha", "asha@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/clients",
            Some(json!({
                "first_name": "Other",
                "last_name": "Person",
                "email": "ASHA@example.com",
                "phone": "9123456780",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = TestApp::new();
    let (status, _) = app.call(Method::GET, "/api/v1/clients/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/clients/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_policy_lifecycle() {
    let app = TestApp::new();
    let client = app.create_client("Asha", "asha@example.com").await;
    let template = app.create_policy_template().await;

    let policy_body = json!({
        "policy_number": "SH-1001",
        "client_id": client["id"],
        "template_id": template["id"],
        "start_date": "2025-01-01",
    });
    let (status, policy) = app
        .call(Method::POST, "/api/v1/policies", Some(policy_body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{policy}");
    assert_eq!(policy["end_date"], "2025-12-31");
    assert_eq!(policy["status"], "active");

    let (status, _) = app.call(Method::POST, "/api/v1/policies", Some(policy_body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A client with policies cannot be deleted
    let client_id = id_of(&client);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/clients/{client_id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, detail) = app
        .call(Method::GET, &format!("/api/v1/clients/{client_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["policies"].as_array().unwrap().len(), 1);

    let policy_id = id_of(&policy);
    let (status, renewed) = app
        .call(
            Method::POST,
            &format!("/api/v1/policies/{policy_id}/renew"),
            Some(json!({ "policy_number": "SH-1002" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{renewed}");
    assert_eq!(renewed["start_date"], "2026-01-01");

    let (_, old) = app
        .call(Method::GET, &format!("/api/v1/policies/{policy_id}"), None)
        .await;
    assert_eq!(old["status"], "renewed");

    let (status, _) = app
        .call(Method::POST, &format!("/api/v1/policies/{policy_id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_and_oversized_files() {
    let app = TestApp::with_config(ApiConfig {
        jwt_secret: SECRET.into(),
        max_upload_bytes: 1024,
        ..ApiConfig::default()
    });

    let (status, body) = app
        .upload(&[], Some(("page.html", "text/html", b"<html></html>".to_vec())))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{body}");

    let (status, body) = app
        .upload(&[], Some(("scan.pdf", "application/pdf", vec![b'x'; 2048])))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");

    // Past the request body limit, not just the file size check
    let (status, body) = app
        .upload(&[], Some(("scan.pdf", "application/pdf", vec![b'x'; 128 * 1024])))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");

    let (status, _) = app.upload(&[("folder", "misc")], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_list_and_delete_document() {
    let app = TestApp::new();
    let client = app.create_client("Asha", "asha@example.com").await;
    let client_id = id_of(&client);

    let (status, document) = app
        .upload(
            &[("client_id", client_id.as_str())],
            Some(("KYC form.pdf", "application/pdf", b"%PDF-1.4".to_vec())),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{document}");
    assert_eq!(document["file_name"], "KYC form.pdf");
    assert_eq!(document["size_bytes"], 8);
    let storage_key = document["storage_key"].as_str().unwrap().to_string();
    assert!(app.store.contains(&storage_key).await);

    let (status, listed) = app
        .call(Method::GET, &format!("/api/v1/clients/{client_id}/documents"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let document_id = id_of(&document);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/documents/{document_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.store.contains(&storage_key).await);
}

#[tokio::test]
async fn test_storage_outage_keeps_document_metadata() {
    let app = TestApp::new();
    let (status, document) = app
        .upload(&[], Some(("photo.png", "image/png", vec![1, 2, 3])))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.store.set_failing(true);
    let document_id = id_of(&document);
    let (status, body) = app
        .call(Method::DELETE, &format!("/api/v1/documents/{document_id}"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");

    app.store.set_failing(false);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/documents/{document_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_failed_client_delete_keeps_stored_files() {
    let app = TestApp::new();
    let client = app.create_client("Asha", "asha@example.com").await;
    let client_id = id_of(&client);
    let (status, document) = app
        .upload(
            &[("client_id", client_id.as_str())],
            Some(("PAN card.pdf", "application/pdf", b"%PDF-1.4".to_vec())),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{document}");
    let storage_key = document["storage_key"].as_str().unwrap().to_string();

    app.clients.set_refuse_client_deletes(true);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/clients/{client_id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.store.contains(&storage_key).await);

    let (_, documents) = app
        .call(Method::GET, &format!("/api/v1/clients/{client_id}/documents"), None)
        .await;
    assert_eq!(documents.as_array().unwrap().len(), 1);

    app.clients.set_refuse_client_deletes(false);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/clients/{client_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.store.contains(&storage_key).await);
}

#[tokio::test]
async fn test_dashboard_reflects_writes() {
    let app = TestApp::new();
    let (status, stats) = app.call(Method::GET, "/api/v1/dashboard/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_leads"], 0);
    assert_eq!(stats["conversion_rate"], 0.0);

    app.call(
        Method::POST,
        "/api/v1/leads",
        Some(json!({ "name": "Ravi Kumar", "phone": "9876500000" })),
    )
    .await;
    app.create_client("Asha", "asha@example.com").await;

    let (_, stats) = app.call(Method::GET, "/api/v1/dashboard/stats", None).await;
    assert_eq!(stats["total_leads"], 1);
    assert_eq!(stats["new_leads_this_month"], 1);
    assert_eq!(stats["total_clients"], 1);
    let by_status = stats["leads_by_status"].as_array().unwrap();
    assert!(by_status
        .iter()
        .any(|entry| entry["status"] == "new" && entry["count"] == 1));
    assert!(!stats["recent_activities"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_activity_feed_filters() {
    let app = TestApp::new();
    let client = app.create_client("Asha", "asha@example.com").await;
    let client_id = id_of(&client);

    let (status, feed) = app
        .call(
            Method::GET,
            &format!("/api/v1/activities?entity_type=client&entity_id={client_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["activity_type"], "client_created");

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/activities?entity_id={client_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.clients.activities().await.len(), 1);
}

#[tokio::test]
async fn test_whatsapp_template_preview_and_send() {
    let app = TestApp::new();
    let client = app.create_client("Asha", "asha@example.com").await;

    let (status, template) = app
        .call(
            Method::POST,
            "/api/v1/whatsapp-templates",
            Some(json!({
                "name": "greeting",
                "provider_template": "crm_greeting",
                "purpose": "custom",
                "body": "Hello {{first_name}}, this is {{agent_name}}.",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{template}");
    let template_id = id_of(&template);

    let (status, preview) = app
        .call(
            Method::POST,
            &format!("/api/v1/whatsapp-templates/{template_id}/preview"),
            Some(json!({ "client_id": client["id"], "variables": { "agent_name": "Meera" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{preview}");
    assert_eq!(preview["preview"], "Hello Asha, this is Meera.");
    assert!(app.whatsapp.sent().await.is_empty());

    let (status, result) = app
        .call(
            Method::POST,
            "/api/v1/automation/whatsapp",
            Some(json!({ "client_id": client["id"], "template_id": template_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{result}");
    let sent = app.whatsapp.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].to.ends_with("9876543210"));
}

#[tokio::test]
async fn test_settings_update_and_disabled_messaging() {
    let app = TestApp::new();
    let (status, settings) = app
        .call(
            Method::PUT,
            "/api/v1/settings",
            Some(json!({
                "agent_name": "Meera Iyer",
                "renewal_reminder_days": [7, 30, 15],
                "whatsapp_enabled": false,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{settings}");
    assert_eq!(settings["renewal_reminder_days"], json!([30, 15, 7]));

    let (_, settings) = app.call(Method::GET, "/api/v1/settings", None).await;
    assert_eq!(settings["agent_name"], "Meera Iyer");

    let client = app.create_client("Asha", "asha@example.com").await;
    let (_, template) = app
        .call(
            Method::POST,
            "/api/v1/whatsapp-templates",
            Some(json!({
                "name": "greeting",
                "provider_template": "crm_greeting",
                "purpose": "custom",
                "body": "Hello {{first_name}}",
            })),
        )
        .await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/automation/whatsapp",
            Some(json!({ "client_id": client["id"], "template_id": template["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_birthday_run_dry_run_sends_nothing() {
    let app = TestApp::new();
    app.create_client("Asha", "asha@example.com").await;

    let (status, report) = app
        .call(
            Method::POST,
            "/api/v1/automation/birthdays",
            Some(json!({ "date": "2025-06-15", "dry_run": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["kind"], "birthdays");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["matched"], 1);
    assert_eq!(report["failed"], 0);
    assert!(app.whatsapp.sent().await.is_empty());
}
