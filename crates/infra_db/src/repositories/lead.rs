//! Lead repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{contains_pattern, to_i64};
use crate::error::DatabaseError;

const LEAD_COLUMNS: &str = "id, name, email, phone, source, status, interested_in, notes, \
     follow_up_date, converted_client_id, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    ProposalSent,
    Converted,
    Lost,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub source: String,
    pub status: LeadStatus,
    pub interested_in: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub converted_client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for [`LeadRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    /// Lowercased search text
    pub search: Option<String>,
}

impl LeadFilter {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(ref source) = self.source {
            builder.push(" AND source = ").push_bind(source.clone());
        }
        if let Some(ref search) = self.search {
            let pattern = contains_pattern(search);
            builder
                .push(" AND (lower(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR coalesce(email, '') LIKE ")
                .push_bind(pattern);
            let digits: String = search.chars().filter(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                builder.push(" OR phone LIKE ").push_bind(contains_pattern(&digits));
            }
            builder.push(")");
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &LeadRow) -> Result<LeadRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, LeadRow>(&format!(
            "INSERT INTO leads ({LEAD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {LEAD_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.source)
        .bind(row.status)
        .bind(&row.interested_in)
        .bind(&row.notes)
        .bind(row.follow_up_date)
        .bind(row.converted_client_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<LeadRow, DatabaseError> {
        sqlx::query_as::<_, LeadRow>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Lead", id))
    }

    /// Newest first, with the total number of matches
    pub async fn list(
        &self,
        filter: &LeadFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<LeadRow>, i64), DatabaseError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {LEAD_COLUMNS} FROM leads"));
        filter.push_where(&mut select);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(offset));
        let rows = select.build_query_as::<LeadRow>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    pub async fn update(&self, row: &LeadRow) -> Result<LeadRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, row).await
    }

    /// Saves every mutable column of `row`
    pub async fn update_in(conn: &mut PgConnection, row: &LeadRow) -> Result<LeadRow, DatabaseError> {
        sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads SET name = $2, email = $3, phone = $4, source = $5, status = $6, \
             interested_in = $7, notes = $8, follow_up_date = $9, converted_client_id = $10, \
             updated_at = $11 \
             WHERE id = $1 RETURNING {LEAD_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.source)
        .bind(row.status)
        .bind(&row.interested_in)
        .bind(&row.notes)
        .bind(row.follow_up_date)
        .bind(row.converted_client_id)
        .bind(row.updated_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Lead", row.id))
    }

    /// Marks an open lead converted into `client_id`
    ///
    /// The status guard makes a second, concurrent conversion of the same
    /// lead fail with `StaleState` instead of linking two clients.
    pub async fn mark_converted_in(
        conn: &mut PgConnection,
        id: Uuid,
        client_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<LeadRow, DatabaseError> {
        sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads SET status = 'converted', converted_client_id = $2, updated_at = $3 \
             WHERE id = $1 AND status NOT IN ('converted', 'lost') RETURNING {LEAD_COLUMNS}"
        ))
        .bind(id)
        .bind(client_id)
        .bind(updated_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::stale(format!("lead {} is no longer open for conversion", id)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Lead", id));
        }
        Ok(())
    }

    pub async fn count_by_status(&self) -> Result<Vec<(LeadStatus, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (LeadStatus, i64)>(
            "SELECT status, COUNT(*) FROM leads GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
