//! PostgreSQL adapter for leads, clients, documents and the activity log
//!
//! One adapter serves the four record ports of `domain_client` so that lead
//! conversion can insert the client and update the lead in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::calendar;
use core_kernel::{
    ClientId, DocumentId, DomainPort, HealthCheckResult, HealthCheckable, LeadId, Page, PortError,
};
use domain_client::ports::page_size;
use domain_client::{
    Activity, ActivityPort, ActivityQuery, ActivityType, Client, ClientPort, ClientQuery, Document,
    DocumentPort, Lead, LeadPort, LeadQuery, LeadStatus,
};

use super::{parse_column, ping};
use crate::error::DatabaseError;
use crate::repositories::activity::{ActivityFilter, ActivityRow};
use crate::repositories::client::{ClientFilter, ClientRow};
use crate::repositories::document::DocumentRow;
use crate::repositories::lead::{LeadFilter, LeadRow, LeadStatus as DbLeadStatus};
use crate::repositories::{
    ActivityRepository, ClientRepository, DocumentRepository, LeadRepository,
};

/// Default number of entries in the activity feed
const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

#[derive(Debug, Clone)]
pub struct PostgresClientAdapter {
    pool: PgPool,
    leads: LeadRepository,
    clients: ClientRepository,
    documents: DocumentRepository,
    activities: ActivityRepository,
}

impl PostgresClientAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            leads: LeadRepository::new(pool.clone()),
            clients: ClientRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            activities: ActivityRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresClientAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClientAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-client-adapter").await
    }
}

#[async_trait]
impl LeadPort for PostgresClientAdapter {
    #[instrument(skip(self, lead), fields(lead_id = %lead.id))]
    async fn create_lead(&self, lead: Lead) -> Result<Lead, PortError> {
        let row = self.leads.insert(&lead_to_row(&lead)).await?;
        Ok(row_to_lead(row)?)
    }

    async fn get_lead(&self, id: LeadId) -> Result<Lead, PortError> {
        let row = self.leads.get_by_id(id.into()).await?;
        Ok(row_to_lead(row)?)
    }

    #[instrument(skip(self))]
    async fn list_leads(&self, query: LeadQuery) -> Result<Page<Lead>, PortError> {
        let filter = LeadFilter {
            status: query.status.map(status_to_db),
            source: query.source.map(|s| s.as_str().to_string()),
            search: search_text(query.search.as_deref()),
        };
        let limit = page_size(query.limit);
        let offset = query.offset.unwrap_or(0);
        let (rows, total) = self.leads.list(&filter, limit, offset).await?;
        debug!(count = rows.len(), total, "Listed leads");

        let items = rows
            .into_iter()
            .map(row_to_lead)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, limit, offset))
    }

    async fn update_lead(&self, lead: Lead) -> Result<Lead, PortError> {
        let row = self.leads.update(&lead_to_row(&lead)).await?;
        Ok(row_to_lead(row)?)
    }

    async fn delete_lead(&self, id: LeadId) -> Result<(), PortError> {
        Ok(self.leads.delete(id.into()).await?)
    }

    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, u64)>, PortError> {
        let counts = self.leads.count_by_status().await?;
        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(status, count)| (status_from_db(status), count as u64))
            .collect())
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError> {
        Ok(self.leads.count_created_since(since).await? as u64)
    }

    #[instrument(skip(self, lead, client), fields(lead_id = %lead.id, client_id = %client.id))]
    async fn convert_lead(&self, lead: Lead, client: Client) -> Result<Client, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let inserted = ClientRepository::insert_in(&mut *tx, &client_to_row(&client)).await?;
        LeadRepository::mark_converted_in(&mut *tx, lead.id.into(), client.id.into(), lead.updated_at).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        debug!("Lead converted");
        Ok(row_to_client(inserted))
    }
}

#[async_trait]
impl ClientPort for PostgresClientAdapter {
    #[instrument(skip(self, client), fields(client_id = %client.id))]
    async fn create_client(&self, client: Client) -> Result<Client, PortError> {
        let row = self.clients.insert(&client_to_row(&client)).await.map_err(email_conflict)?;
        Ok(row_to_client(row))
    }

    async fn get_client(&self, id: ClientId) -> Result<Client, PortError> {
        Ok(row_to_client(self.clients.get_by_id(id.into()).await?))
    }

    #[instrument(skip(self))]
    async fn list_clients(&self, query: ClientQuery) -> Result<Page<Client>, PortError> {
        let filter = ClientFilter {
            search: search_text(query.search.as_deref()),
            city: query.city.clone().filter(|c| !c.trim().is_empty()),
        };
        let limit = page_size(query.limit);
        let offset = query.offset.unwrap_or(0);
        let (rows, total) = self.clients.list(&filter, limit, offset).await?;
        let items = rows.into_iter().map(row_to_client).collect();
        Ok(Page::new(items, total as u64, limit, offset))
    }

    async fn update_client(&self, client: Client) -> Result<Client, PortError> {
        let row = self.clients.update(&client_to_row(&client)).await.map_err(email_conflict)?;
        Ok(row_to_client(row))
    }

    async fn delete_client(&self, id: ClientId) -> Result<(), PortError> {
        self.clients.delete(id.into()).await.map_err(|e| match e {
            DatabaseError::ForeignKeyViolation(_) => {
                PortError::conflict("client still has policies; delete them first")
            }
            other => other.into(),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Client>, PortError> {
        Ok(self.clients.find_by_email(email.trim()).await?.map(row_to_client))
    }

    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Client>, PortError> {
        use chrono::Datelike;
        let rows = self.clients.born_in_month(date.month()).await?;
        Ok(rows
            .into_iter()
            .map(row_to_client)
            .filter(|client| client.is_birthday_on(date))
            .collect())
    }

    async fn upcoming_birthdays(
        &self,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<(Client, NaiveDate)>, PortError> {
        let rows = self.clients.with_date_of_birth().await?;
        let mut upcoming: Vec<(Client, NaiveDate)> = rows
            .into_iter()
            .map(row_to_client)
            .filter_map(|client| {
                let next = calendar::birthday_within(client.date_of_birth?, from, days)?;
                Some((client, next))
            })
            .collect();
        upcoming.sort_by_key(|(_, next)| *next);
        Ok(upcoming)
    }

    async fn count_clients(&self) -> Result<u64, PortError> {
        Ok(self.clients.count().await? as u64)
    }
}

#[async_trait]
impl DocumentPort for PostgresClientAdapter {
    async fn save_document(&self, document: Document) -> Result<Document, PortError> {
        let row = self.documents.insert(&document_to_row(&document)).await?;
        Ok(row_to_document(row)?)
    }

    async fn get_document(&self, id: DocumentId) -> Result<Document, PortError> {
        let row = self.documents.get_by_id(id.into()).await?;
        Ok(row_to_document(row)?)
    }

    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Document>, PortError> {
        let rows = self.documents.list_for_client(client_id.into()).await?;
        Ok(rows
            .into_iter()
            .map(row_to_document)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_document(&self, id: DocumentId) -> Result<(), PortError> {
        Ok(self.documents.delete(id.into()).await?)
    }
}

#[async_trait]
impl ActivityPort for PostgresClientAdapter {
    async fn record(&self, activity: Activity) -> Result<Activity, PortError> {
        let row = self.activities.insert(&activity_to_row(&activity)).await?;
        Ok(row_to_activity(row)?)
    }

    async fn list_recent(&self, query: ActivityQuery) -> Result<Vec<Activity>, PortError> {
        let filter = ActivityFilter {
            entity_type: query.entity_type.map(|t| t.as_str().to_string()),
            entity_id: query.entity_id,
            activity_type: query.activity_type.map(|t| t.as_str().to_string()),
        };
        let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 200);
        let rows = self.activities.recent(&filter, limit).await?;
        Ok(rows
            .into_iter()
            .map(row_to_activity)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn exists_between(
        &self,
        activity_type: ActivityType,
        entity_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, PortError> {
        Ok(self
            .activities
            .exists_between(activity_type.as_str(), entity_id, start, end)
            .await?)
    }
}

fn search_text(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

fn email_conflict(error: DatabaseError) -> PortError {
    match error {
        DatabaseError::DuplicateEntry(_) => PortError::conflict("a client with this email already exists"),
        other => other.into(),
    }
}

fn status_to_db(status: LeadStatus) -> DbLeadStatus {
    match status {
        LeadStatus::New => DbLeadStatus::New,
        LeadStatus::Contacted => DbLeadStatus::Contacted,
        LeadStatus::Qualified => DbLeadStatus::Qualified,
        LeadStatus::ProposalSent => DbLeadStatus::ProposalSent,
        LeadStatus::Converted => DbLeadStatus::Converted,
        LeadStatus::Lost => DbLeadStatus::Lost,
    }
}

fn status_from_db(status: DbLeadStatus) -> LeadStatus {
    match status {
        DbLeadStatus::New => LeadStatus::New,
        DbLeadStatus::Contacted => LeadStatus::Contacted,
        DbLeadStatus::Qualified => LeadStatus::Qualified,
        DbLeadStatus::ProposalSent => LeadStatus::ProposalSent,
        DbLeadStatus::Converted => LeadStatus::Converted,
        DbLeadStatus::Lost => LeadStatus::Lost,
    }
}

fn lead_to_row(lead: &Lead) -> LeadRow {
    LeadRow {
        id: lead.id.into(),
        name: lead.name.clone(),
        email: lead.email.clone(),
        phone: lead.phone.clone(),
        source: lead.source.as_str().to_string(),
        status: status_to_db(lead.status),
        interested_in: lead.interested_in.clone(),
        notes: lead.notes.clone(),
        follow_up_date: lead.follow_up_date,
        converted_client_id: lead.converted_client_id.map(Uuid::from),
        created_at: lead.created_at,
        updated_at: lead.updated_at,
    }
}

fn row_to_lead(row: LeadRow) -> Result<Lead, DatabaseError> {
    Ok(Lead {
        id: LeadId::from(row.id),
        name: row.name,
        email: row.email,
        phone: row.phone,
        source: parse_column("leads.source", &row.source)?,
        status: status_from_db(row.status),
        interested_in: row.interested_in,
        notes: row.notes,
        follow_up_date: row.follow_up_date,
        converted_client_id: row.converted_client_id.map(ClientId::from),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn client_to_row(client: &Client) -> ClientRow {
    ClientRow {
        id: client.id.into(),
        first_name: client.first_name.clone(),
        last_name: client.last_name.clone(),
        email: client.email.clone(),
        phone: client.phone.clone(),
        whatsapp_number: client.whatsapp_number.clone(),
        date_of_birth: client.date_of_birth,
        address: client.address.clone(),
        city: client.city.clone(),
        occupation: client.occupation.clone(),
        notes: client.notes.clone(),
        lead_id: client.lead_id.map(Uuid::from),
        created_at: client.created_at,
        updated_at: client.updated_at,
    }
}

fn row_to_client(row: ClientRow) -> Client {
    Client {
        id: ClientId::from(row.id),
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        phone: row.phone,
        whatsapp_number: row.whatsapp_number,
        date_of_birth: row.date_of_birth,
        address: row.address,
        city: row.city,
        occupation: row.occupation,
        notes: row.notes,
        lead_id: row.lead_id.map(LeadId::from),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn document_to_row(document: &Document) -> DocumentRow {
    DocumentRow {
        id: document.id.into(),
        client_id: document.client_id.map(Uuid::from),
        policy_id: document.policy_id.map(Uuid::from),
        file_name: document.file_name.clone(),
        content_type: document.content_type.clone(),
        size_bytes: i64::try_from(document.size_bytes).unwrap_or(i64::MAX),
        url: document.url.clone(),
        storage_key: document.storage_key.clone(),
        uploaded_at: document.uploaded_at,
    }
}

fn row_to_document(row: DocumentRow) -> Result<Document, DatabaseError> {
    Ok(Document {
        id: DocumentId::from(row.id),
        client_id: row.client_id.map(ClientId::from),
        policy_id: row.policy_id.map(Into::into),
        file_name: row.file_name,
        content_type: row.content_type,
        size_bytes: u64::try_from(row.size_bytes)
            .map_err(|_| DatabaseError::corrupt("documents.size_bytes is negative"))?,
        url: row.url,
        storage_key: row.storage_key,
        uploaded_at: row.uploaded_at,
    })
}

fn activity_to_row(activity: &Activity) -> ActivityRow {
    ActivityRow {
        id: activity.id.into(),
        activity_type: activity.activity_type.as_str().to_string(),
        description: activity.description.clone(),
        entity_type: activity.entity_type.map(|t| t.as_str().to_string()),
        entity_id: activity.entity_id,
        metadata: activity.metadata.clone(),
        created_at: activity.created_at,
    }
}

fn row_to_activity(row: ActivityRow) -> Result<Activity, DatabaseError> {
    Ok(Activity {
        id: row.id.into(),
        activity_type: parse_column("activities.activity_type", &row.activity_type)?,
        description: row.description,
        entity_type: row
            .entity_type
            .as_deref()
            .map(|t| parse_column("activities.entity_type", t))
            .transpose()?,
        entity_id: row.entity_id,
        metadata: row.metadata,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_client::{EntityType, LeadSource, NewClient, NewLead};

    #[test]
    fn test_lead_row_round_trip_keeps_status_and_source() {
        let mut lead = Lead::new(NewLead {
            name: "Meera Iyer".into(),
            phone: "98450 00001".into(),
            source: LeadSource::WalkIn,
            ..Default::default()
        })
        .unwrap();
        lead.transition_to(LeadStatus::Contacted).unwrap();

        let row = lead_to_row(&lead);
        assert_eq!(row.source, "walk_in");
        assert_eq!(row.status, DbLeadStatus::Contacted);
        assert_eq!(row_to_lead(row).unwrap(), lead);
    }

    #[test]
    fn test_unknown_stored_label_is_corrupt_row() {
        let client = Client::new(NewClient {
            first_name: "Ravi".into(),
            phone: "9000000000".into(),
            ..Default::default()
        })
        .unwrap();
        let mut row = activity_to_row(
            &Activity::new(ActivityType::ClientCreated, "Client created")
                .for_entity(EntityType::Client, client.id),
        );
        row.activity_type = "teleported".into();
        assert!(matches!(row_to_activity(row), Err(DatabaseError::CorruptRow(_))));
    }
}
