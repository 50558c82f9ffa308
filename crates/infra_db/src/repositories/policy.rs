//! Policy template and policy instance repositories

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{contains_pattern, to_i64};
use crate::error::DatabaseError;

const TEMPLATE_COLUMNS: &str = "id, name, insurer, policy_type, description, default_premium, \
     default_sum_insured, currency, default_term_months, premium_frequency, is_active, \
     created_at, updated_at";

const POLICY_COLUMNS: &str = "id, policy_number, client_id, template_id, start_date, end_date, \
     premium, sum_insured, currency, premium_frequency, status, notes, renewed_from, \
     created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "policy_status", rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Expired,
    Cancelled,
    Renewed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PolicyTemplateRow {
    pub id: Uuid,
    pub name: String,
    pub insurer: String,
    pub policy_type: String,
    pub description: Option<String>,
    pub default_premium: Decimal,
    pub default_sum_insured: Option<Decimal>,
    pub currency: String,
    pub default_term_months: i32,
    pub premium_frequency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PolicyInstanceRow {
    pub id: Uuid,
    pub policy_number: String,
    pub client_id: Uuid,
    pub template_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub premium: Decimal,
    pub sum_insured: Option<Decimal>,
    pub currency: String,
    pub premium_frequency: String,
    pub status: PolicyStatus,
    pub notes: Option<String>,
    pub renewed_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PolicyTemplateRepository {
    pool: PgPool,
}

impl PolicyTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &PolicyTemplateRow) -> Result<PolicyTemplateRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, PolicyTemplateRow>(&format!(
            "INSERT INTO policy_templates ({TEMPLATE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.insurer)
        .bind(&row.policy_type)
        .bind(&row.description)
        .bind(row.default_premium)
        .bind(row.default_sum_insured)
        .bind(&row.currency)
        .bind(row.default_term_months)
        .bind(&row.premium_frequency)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<PolicyTemplateRow, DatabaseError> {
        sqlx::query_as::<_, PolicyTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM policy_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("PolicyTemplate", id))
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<PolicyTemplateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PolicyTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM policy_templates \
             WHERE is_active OR NOT $1 ORDER BY lower(name)"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(&self, row: &PolicyTemplateRow) -> Result<PolicyTemplateRow, DatabaseError> {
        sqlx::query_as::<_, PolicyTemplateRow>(&format!(
            "UPDATE policy_templates SET name = $2, insurer = $3, policy_type = $4, description = $5, \
             default_premium = $6, default_sum_insured = $7, currency = $8, default_term_months = $9, \
             premium_frequency = $10, is_active = $11, updated_at = $12 \
             WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.insurer)
        .bind(&row.policy_type)
        .bind(&row.description)
        .bind(row.default_premium)
        .bind(row.default_sum_insured)
        .bind(&row.currency)
        .bind(row.default_term_months)
        .bind(&row.premium_frequency)
        .bind(row.is_active)
        .bind(row.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("PolicyTemplate", row.id))
    }

    /// Fails with a foreign key violation while policies use the template
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM policy_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("PolicyTemplate", id));
        }
        Ok(())
    }
}

/// Filters for [`PolicyInstanceRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    pub client_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub status: Option<PolicyStatus>,
    /// Active policies ending in `[from, to]`
    pub ending_between: Option<(NaiveDate, NaiveDate)>,
    /// Lowercased policy number fragment
    pub search: Option<String>,
}

impl PolicyFilter {
    /// Active policies ending within `days` of `today`, both ends included
    pub fn expiring_within(mut self, today: NaiveDate, days: u32) -> Self {
        let until = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        self.ending_between = Some((today, until));
        self
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(client_id) = self.client_id {
            builder.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(template_id) = self.template_id {
            builder.push(" AND template_id = ").push_bind(template_id);
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some((from, to)) = self.ending_between {
            builder
                .push(" AND status = 'active' AND end_date BETWEEN ")
                .push_bind(from)
                .push(" AND ")
                .push_bind(to);
        }
        if let Some(ref search) = self.search {
            builder
                .push(" AND lower(policy_number) LIKE ")
                .push_bind(contains_pattern(search));
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyInstanceRepository {
    pool: PgPool,
}

impl PolicyInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert(&self, row: &PolicyInstanceRow) -> Result<PolicyInstanceRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, row).await
    }

    pub async fn insert_in(
        conn: &mut PgConnection,
        row: &PolicyInstanceRow,
    ) -> Result<PolicyInstanceRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "INSERT INTO policy_instances ({POLICY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {POLICY_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.policy_number)
        .bind(row.client_id)
        .bind(row.template_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.premium)
        .bind(row.sum_insured)
        .bind(&row.currency)
        .bind(&row.premium_frequency)
        .bind(row.status)
        .bind(&row.notes)
        .bind(row.renewed_from)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(conn)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<PolicyInstanceRow, DatabaseError> {
        sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policy_instances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Policy", id))
    }

    /// Soonest end date first, with the total number of matches
    pub async fn list(
        &self,
        filter: &PolicyFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<PolicyInstanceRow>, i64), DatabaseError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM policy_instances");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {POLICY_COLUMNS} FROM policy_instances"));
        filter.push_where(&mut select);
        select
            .push(" ORDER BY end_date, policy_number LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(offset));
        let rows = select
            .build_query_as::<PolicyInstanceRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<PolicyInstanceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policy_instances WHERE client_id = $1 \
             ORDER BY start_date DESC, created_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_client(&self, client_id: Uuid) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM policy_instances WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn update(&self, row: &PolicyInstanceRow) -> Result<PolicyInstanceRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, row).await
    }

    pub async fn update_in(
        conn: &mut PgConnection,
        row: &PolicyInstanceRow,
    ) -> Result<PolicyInstanceRow, DatabaseError> {
        sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "UPDATE policy_instances SET policy_number = $2, start_date = $3, end_date = $4, \
             premium = $5, sum_insured = $6, currency = $7, premium_frequency = $8, status = $9, \
             notes = $10, updated_at = $11 \
             WHERE id = $1 RETURNING {POLICY_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.policy_number)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.premium)
        .bind(row.sum_insured)
        .bind(&row.currency)
        .bind(&row.premium_frequency)
        .bind(row.status)
        .bind(&row.notes)
        .bind(row.updated_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Policy", row.id))
    }

    /// Marks an active or expired policy renewed
    pub async fn mark_renewed_in(
        conn: &mut PgConnection,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<PolicyInstanceRow, DatabaseError> {
        sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "UPDATE policy_instances SET status = 'renewed', updated_at = $2 \
             WHERE id = $1 AND status IN ('active', 'expired') RETURNING {POLICY_COLUMNS}"
        ))
        .bind(id)
        .bind(updated_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::stale(format!("policy {} can no longer be renewed", id)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM policy_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Policy", id));
        }
        Ok(())
    }

    pub async fn active_ending_on(&self, date: NaiveDate) -> Result<Vec<PolicyInstanceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policy_instances \
             WHERE status = 'active' AND end_date = $1 ORDER BY policy_number"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn active(&self) -> Result<Vec<PolicyInstanceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PolicyInstanceRow>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policy_instances WHERE status = 'active'"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Moves active policies that ended before `today` to expired
    pub async fn expire_before(&self, today: NaiveDate) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE policy_instances SET status = 'expired', updated_at = now() \
             WHERE status = 'active' AND end_date < $1",
        )
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
