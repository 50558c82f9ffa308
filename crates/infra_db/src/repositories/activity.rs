//! Activity log repository

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DatabaseError;

const ACTIVITY_COLUMNS: &str = "id, activity_type, description, entity_type, entity_id, metadata, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub activity_type: String,
    pub description: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &ActivityRow) -> Result<ActivityRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, ActivityRow>(&format!(
            "INSERT INTO activities ({ACTIVITY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.activity_type)
        .bind(&row.description)
        .bind(&row.entity_type)
        .bind(row.entity_id)
        .bind(&row.metadata)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    /// Newest first
    pub async fn recent(&self, filter: &ActivityFilter, limit: u32) -> Result<Vec<ActivityRow>, DatabaseError> {
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE TRUE"));
        if let Some(ref entity_type) = filter.entity_type {
            select.push(" AND entity_type = ").push_bind(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            select.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(ref activity_type) = filter.activity_type {
            select.push(" AND activity_type = ").push_bind(activity_type.clone());
        }
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(limit));
        let rows = select.build_query_as::<ActivityRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn exists_between(
        &self,
        activity_type: &str,
        entity_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM activities \
             WHERE activity_type = $1 AND entity_id = $2 AND created_at >= $3 AND created_at < $4)",
        )
        .bind(activity_type)
        .bind(entity_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
