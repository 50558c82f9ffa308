//! Document metadata repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const DOCUMENT_COLUMNS: &str =
    "id, client_id, policy_id, file_name, content_type, size_bytes, url, storage_key, uploaded_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub policy_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &DocumentRow) -> Result<DocumentRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(row.id)
        .bind(row.client_id)
        .bind(row.policy_id)
        .bind(&row.file_name)
        .bind(&row.content_type)
        .bind(row.size_bytes)
        .bind(&row.url)
        .bind(&row.storage_key)
        .bind(row.uploaded_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<DocumentRow, DatabaseError> {
        sqlx::query_as::<_, DocumentRow>(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Document", id))
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<DocumentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE client_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Document", id));
        }
        Ok(())
    }
}
