//! Uploaded documents
//!
//! The file bytes live in external storage; the CRM keeps the metadata and
//! the public URL, attached to a client and optionally to one of their
//! policies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClientId, DocumentId, PolicyInstanceId};

use crate::error::ClientError;

/// Content types accepted for upload
pub const ALLOWED_CONTENT_TYPES: [&str; 6] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Metadata for a stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub client_id: Option<ClientId>,
    pub policy_id: Option<PolicyInstanceId>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: String,
    /// Opaque key the storage backend needs to delete the file
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Records a file that has just been stored
    pub fn from_stored(
        upload: &FileUpload,
        stored: StoredFile,
        client_id: Option<ClientId>,
        policy_id: Option<PolicyInstanceId>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            client_id,
            policy_id,
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            size_bytes: stored.size_bytes,
            url: stored.url,
            storage_key: stored.storage_key,
            uploaded_at: Utc::now(),
        }
    }
}

/// A file received from the client, not yet stored
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Storage folder, e.g. `clients/<id>`
    pub folder: Option<String>,
}

impl FileUpload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks size and content type before anything is sent to storage
    pub fn validate(&self, max_bytes: u64) -> Result<(), ClientError> {
        if self.bytes.is_empty() {
            return Err(ClientError::invalid("uploaded file is empty"));
        }
        if self.size() > max_bytes {
            return Err(ClientError::FileTooLarge {
                size: self.size(),
                limit: max_bytes,
            });
        }
        if !is_allowed_content_type(&self.content_type) {
            return Err(ClientError::UnsupportedContentType(self.content_type.clone()));
        }
        Ok(())
    }

    /// File name reduced to a storage-safe stem (`Policy Schedule.pdf` → `policy_schedule`)
    pub fn safe_stem(&self) -> String {
        let stem = self
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name);
        let cleaned: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let cleaned = cleaned.trim_matches('_').to_string();
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned
        }
    }
}

/// Where a file ended up in storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub url: String,
    pub storage_key: String,
    pub size_bytes: u64,
}

/// Whether a content type may be uploaded; parameters such as `; charset=` are ignored
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> FileUpload {
        FileUpload {
            file_name: "Policy Schedule (2024).pdf".into(),
            content_type: content_type.into(),
            bytes: vec![0u8; len],
            folder: None,
        }
    }

    #[test]
    fn test_validate_rejects_large_files() {
        let err = upload("application/pdf", 2048).validate(1024).unwrap_err();
        assert!(matches!(err, ClientError::FileTooLarge { size: 2048, limit: 1024 }));
    }

    #[test]
    fn test_validate_rejects_unknown_types() {
        let err = upload("application/zip", 10).validate(1024).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedContentType(_)));
        assert!(upload("IMAGE/PNG", 10).validate(1024).is_ok());
        assert!(upload("application/pdf; charset=binary", 10).validate(1024).is_ok());
    }

    #[test]
    fn test_safe_stem() {
        assert_eq!(upload("application/pdf", 1).safe_stem(), "policy_schedule__2024");
    }
}
