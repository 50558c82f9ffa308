//! Client repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{contains_pattern, to_i64};
use crate::error::DatabaseError;

const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, whatsapp_number, \
     date_of_birth, address, city, occupation, notes, lead_id, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Lowercased search text
    pub search: Option<String>,
    pub city: Option<String>,
}

impl ClientFilter {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(ref city) = self.city {
            builder.push(" AND lower(city) = lower(").push_bind(city.clone()).push(")");
        }
        if let Some(ref search) = self.search {
            let pattern = contains_pattern(search);
            builder
                .push(" AND (lower(first_name || ' ' || last_name) LIKE ")
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
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &ClientRow) -> Result<ClientRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, row).await
    }

    pub async fn insert_in(conn: &mut PgConnection, row: &ClientRow) -> Result<ClientRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, ClientRow>(&format!(
            "INSERT INTO clients ({CLIENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.whatsapp_number)
        .bind(row.date_of_birth)
        .bind(&row.address)
        .bind(&row.city)
        .bind(&row.occupation)
        .bind(&row.notes)
        .bind(row.lead_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(conn)
        .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<ClientRow, DatabaseError> {
        sqlx::query_as::<_, ClientRow>(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Client", id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<ClientRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Ordered by name, with the total number of matches
    pub async fn list(
        &self,
        filter: &ClientFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ClientRow>, i64), DatabaseError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {CLIENT_COLUMNS} FROM clients"));
        filter.push_where(&mut select);
        select
            .push(" ORDER BY lower(first_name), lower(last_name), created_at LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(offset));
        let rows = select.build_query_as::<ClientRow>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    pub async fn update(&self, row: &ClientRow) -> Result<ClientRow, DatabaseError> {
        sqlx::query_as::<_, ClientRow>(&format!(
            "UPDATE clients SET first_name = $2, last_name = $3, email = $4, phone = $5, \
             whatsapp_number = $6, date_of_birth = $7, address = $8, city = $9, occupation = $10, \
             notes = $11, updated_at = $12 \
             WHERE id = $1 RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(row.id)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.whatsapp_number)
        .bind(row.date_of_birth)
        .bind(&row.address)
        .bind(&row.city)
        .bind(&row.occupation)
        .bind(&row.notes)
        .bind(row.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Client", row.id))
    }

    /// Deletes the client; documents cascade, policies block the delete
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Client", id));
        }
        Ok(())
    }

    /// Clients born in `month` (1-12)
    pub async fn born_in_month(&self, month: u32) -> Result<Vec<ClientRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients \
             WHERE date_of_birth IS NOT NULL AND EXTRACT(MONTH FROM date_of_birth) = $1 \
             ORDER BY lower(first_name), lower(last_name)"
        ))
        .bind(i32::try_from(month).unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn with_date_of_birth(&self) -> Result<Vec<ClientRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE date_of_birth IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
