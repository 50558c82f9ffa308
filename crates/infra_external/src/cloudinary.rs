//! Cloudinary document storage
//!
//! Uploads go to `/v1_1/{cloud}/auto/upload` so Cloudinary picks the resource
//! type (`image` for pictures, `raw` for PDFs and Word files). The storage key
//! records both parts as `resource_type:public_id`, which is what the destroy
//! endpoint needs later.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use core_kernel::{DomainPort, PortError};
use domain_client::{DocumentStorePort, FileUpload, StoredFile};

use crate::error::ExternalError;

const SERVICE: &str = "cloudinary";
const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Used when the upload does not name a folder
    pub default_folder: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            default_folder: Some("agent-crm".to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, ExternalError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type,
            action
        )
    }
}

const SIGNATURE_ALGORITHM: &str = "sha256";

/// Request signature: SHA-256 hex of the sorted `k=v&...` string followed by the secret
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Splits `resource_type:public_id`; keys without a type are images
pub fn split_storage_key(storage_key: &str) -> (&str, &str) {
    match storage_key.split_once(':') {
        Some((resource_type, public_id)) if !resource_type.contains('/') => (resource_type, public_id),
        _ => ("image", storage_key),
    }
}

fn public_id_for(file: &FileUpload) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", file.safe_stem(), &suffix[..8])
}

impl DomainPort for CloudinaryStore {}

#[async_trait]
impl DocumentStorePort for CloudinaryStore {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.size()))]
    async fn upload(&self, file: &FileUpload) -> Result<StoredFile, PortError> {
        let folder = file
            .folder
            .clone()
            .or_else(|| self.config.default_folder.clone())
            .unwrap_or_default();
        let public_id = public_id_for(file);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", folder.clone()),
                ("public_id", public_id.clone()),
                ("timestamp", timestamp.clone()),
            ],
            &self.config.api_secret,
        );

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ExternalError::InvalidMessage(e.to_string()))?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id)
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM);
        if !folder.is_empty() {
            form = form.text("folder", folder);
        }

        let response = self
            .http
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(ExternalError::from_response(SERVICE, response).await.into());
        }
        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;

        info!(public_id = %uploaded.public_id, "Uploaded document");
        Ok(StoredFile {
            url: uploaded.secure_url,
            storage_key: format!("{}:{}", uploaded.resource_type, uploaded.public_id),
            size_bytes: uploaded.bytes.unwrap_or_else(|| file.size()),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, storage_key: &str) -> Result<(), PortError> {
        let (resource_type, public_id) = split_storage_key(storage_key);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("public_id", public_id.to_string()),
                ("timestamp", timestamp.clone()),
            ],
            &self.config.api_secret,
        );
        let params = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", SIGNATURE_ALGORITHM.to_string()),
        ];

        let response = self
            .http
            .post(self.endpoint(resource_type, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(ExternalError::from_response(SERVICE, response).await.into());
        }
        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ExternalError::from_reqwest(SERVICE, e))?;

        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                warn!(public_id, "Stored file was already gone");
                Ok(())
            }
            other => Err(ExternalError::Rejected {
                service: SERVICE,
                message: format!("destroy returned '{}'", other),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_parameters() {
        let signature = sign(
            &[
                ("timestamp", "1700000000".to_string()),
                ("public_id", "policy_abc".to_string()),
                ("folder", "crm".to_string()),
            ],
            "abcd",
        );
        assert_eq!(
            signature,
            "cc718dc86de0cdaafc458dbc071d2da06d75787fecac044be35c0b5733102d0c"
        );
    }

    #[test]
    fn test_empty_parameters_are_not_signed() {
        let with_empty = sign(
            &[("folder", String::new()), ("timestamp", "1".to_string())],
            "s",
        );
        let without = sign(&[("timestamp", "1".to_string())], "s");
        assert_eq!(with_empty, without);
    }

    #[test]
    fn test_split_storage_key() {
        assert_eq!(split_storage_key("raw:crm/policy_1a2b"), ("raw", "crm/policy_1a2b"));
        assert_eq!(split_storage_key("crm/photo"), ("image", "crm/photo"));
    }

    #[test]
    fn test_endpoint_layout() {
        let store = CloudinaryStore::new(CloudinaryConfig::new("demo", "key", "secret")).unwrap();
        assert_eq!(
            store.endpoint("auto", "upload"),
            "https://api.cloudinary.com/v1_1/demo/auto/upload"
        );
    }

    #[test]
    fn test_public_id_uses_safe_stem() {
        let file = FileUpload {
            file_name: "Policy Schedule.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
            folder: None,
        };
        let id = public_id_for(&file);
        assert!(id.starts_with("policy_schedule_"));
        assert_eq!(id.len(), "policy_schedule_".len() + 8);
    }
}
