//! Client Domain Ports
//!
//! Port interfaces for leads, clients, documents and the activity log, plus
//! the external file store documents are uploaded to.
//!
//! # Architecture
//!
//! - **Postgres adapters** in `infra_db` implement the record ports
//! - **Cloudinary** in `infra_external` implements [`DocumentStorePort`]
//! - **Mock adapters** (feature `mock`) keep everything in memory for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_client::ports::ClientPort;
//! use std::sync::Arc;
//!
//! pub struct ClientService {
//!     clients: Arc<dyn ClientPort>,
//! }
//!
//! impl ClientService {
//!     pub async fn get(&self, id: ClientId) -> Result<Client, PortError> {
//!         self.clients.get_client(id).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use core_kernel::{ClientId, DocumentId, DomainPort, HealthCheckable, LeadId, Page, PortError};

use crate::activity::{Activity, ActivityType, EntityType};
use crate::client::Client;
use crate::document::{Document, FileUpload, StoredFile};
use crate::lead::{Lead, LeadSource, LeadStatus};

/// Default page size for list queries
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 200;

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`
pub fn page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Query parameters for listing leads
#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    /// Matches name, email or phone
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl LeadQuery {
    pub fn by_status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Whether a lead satisfies the filters (paging aside)
    pub fn matches(&self, lead: &Lead) -> bool {
        if self.status.is_some_and(|status| lead.status != status) {
            return false;
        }
        if self.source.is_some_and(|source| lead.source != source) {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            let digits: String = needle.chars().filter(|c| c.is_ascii_digit()).collect();
            let hit = lead.name.to_lowercase().contains(&needle)
                || lead.email.as_deref().is_some_and(|e| e.contains(&needle))
                || (!digits.is_empty() && lead.phone.contains(&digits));
            if !needle.is_empty() && !hit {
                return false;
            }
        }
        true
    }
}

/// Query parameters for listing clients
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    /// Matches name, email or phone
    pub search: Option<String>,
    pub city: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ClientQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, client: &Client) -> bool {
        if let Some(ref city) = self.city {
            if !client.city.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(city)) {
                return false;
            }
        }
        self.search
            .as_deref()
            .map_or(true, |needle| client.matches_search(needle))
    }
}

/// Query parameters for the activity feed
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub activity_type: Option<ActivityType>,
    pub limit: Option<u32>,
}

impl ActivityQuery {
    pub fn recent(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn for_entity(entity_type: EntityType, entity_id: impl Into<Uuid>) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        self.entity_type.map_or(true, |t| activity.entity_type == Some(t))
            && self.entity_id.map_or(true, |id| activity.entity_id == Some(id))
            && self.activity_type.map_or(true, |t| activity.activity_type == t)
    }
}

/// Lead storage
#[async_trait]
pub trait LeadPort: DomainPort + HealthCheckable {
    async fn create_lead(&self, lead: Lead) -> Result<Lead, PortError>;

    /// Returns the lead or `PortError::NotFound`
    async fn get_lead(&self, id: LeadId) -> Result<Lead, PortError>;

    /// Newest first
    async fn list_leads(&self, query: LeadQuery) -> Result<Page<Lead>, PortError>;

    /// Persists an already-validated lead
    async fn update_lead(&self, lead: Lead) -> Result<Lead, PortError>;

    async fn delete_lead(&self, id: LeadId) -> Result<(), PortError>;

    /// Lead counts per status; statuses with no leads are omitted
    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, u64)>, PortError>;

    /// Number of leads created at or after `since`
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError>;

    /// Inserts `client` and saves the converted `lead` in one unit of work
    ///
    /// `lead` must already be marked converted into `client.id`. Fails with
    /// a conflict when the client's email is taken or when the stored lead
    /// is no longer open, e.g. converted by a concurrent request.
    async fn convert_lead(&self, lead: Lead, client: Client) -> Result<Client, PortError>;
}

/// Client storage
#[async_trait]
pub trait ClientPort: DomainPort + HealthCheckable {
    /// Fails with `PortError::Conflict` when the email is already used
    async fn create_client(&self, client: Client) -> Result<Client, PortError>;

    async fn get_client(&self, id: ClientId) -> Result<Client, PortError>;

    /// Ordered by name
    async fn list_clients(&self, query: ClientQuery) -> Result<Page<Client>, PortError>;

    /// Fails with `PortError::Conflict` when the new email belongs to another client
    async fn update_client(&self, client: Client) -> Result<Client, PortError>;

    /// Removes the client and their document metadata
    ///
    /// Fails with `PortError::Conflict` while policies still reference the client.
    async fn delete_client(&self, id: ClientId) -> Result<(), PortError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Client>, PortError>;

    /// Clients whose birthday falls on `date` (29 February birthdays match
    /// 28 February in common years)
    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Client>, PortError>;

    /// Clients with a birthday in `[from, from + days)`, soonest first
    async fn upcoming_birthdays(
        &self,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<(Client, NaiveDate)>, PortError>;

    async fn count_clients(&self) -> Result<u64, PortError>;
}

/// Document metadata storage
#[async_trait]
pub trait DocumentPort: DomainPort + HealthCheckable {
    async fn save_document(&self, document: Document) -> Result<Document, PortError>;

    async fn get_document(&self, id: DocumentId) -> Result<Document, PortError>;

    /// Newest first
    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Document>, PortError>;

    async fn delete_document(&self, id: DocumentId) -> Result<(), PortError>;
}

/// Activity log storage
#[async_trait]
pub trait ActivityPort: DomainPort + HealthCheckable {
    async fn record(&self, activity: Activity) -> Result<Activity, PortError>;

    /// Newest first
    async fn list_recent(&self, query: ActivityQuery) -> Result<Vec<Activity>, PortError>;

    /// Whether an activity of `activity_type` about `entity_id` was logged
    /// within `[start, end)`
    async fn exists_between(
        &self,
        activity_type: ActivityType,
        entity_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, PortError>;
}

/// External file storage
#[async_trait]
pub trait DocumentStorePort: DomainPort {
    /// Stores the file and returns its public URL and storage key
    async fn upload(&self, file: &FileUpload) -> Result<StoredFile, PortError>;

    /// Removes a stored file; deleting a missing file is not an error
    async fn delete(&self, storage_key: &str) -> Result<(), PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::calendar;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Tables {
        leads: HashMap<LeadId, Lead>,
        clients: HashMap<ClientId, Client>,
        documents: HashMap<DocumentId, Document>,
        activities: Vec<Activity>,
    }

    /// In-memory store implementing every record port of this crate
    ///
    /// Sharing one store lets lead conversion insert the client atomically
    /// the way the database adapter does.
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryClientStore {
        tables: Arc<RwLock<Tables>>,
        refuse_client_deletes: Arc<AtomicBool>,
    }

    impl InMemoryClientStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes `delete_client` fail with a conflict, as when a policy is
        /// attached between the caller's checks and the delete
        pub fn set_refuse_client_deletes(&self, refuse: bool) {
            self.refuse_client_deletes.store(refuse, Ordering::SeqCst);
        }

        /// Pre-populates with clients for testing
        pub async fn with_clients(clients: Vec<Client>) -> Self {
            let store = Self::new();
            {
                let mut tables = store.tables.write().await;
                for client in clients {
                    tables.clients.insert(client.id, client);
                }
            }
            store
        }

        /// Every recorded activity, oldest first
        pub async fn activities(&self) -> Vec<Activity> {
            self.tables.read().await.activities.clone()
        }

        fn email_taken(tables: &Tables, email: Option<&str>, except: Option<ClientId>) -> bool {
            let Some(email) = email else {
                return false;
            };
            tables.clients.values().any(|c| {
                Some(c.id) != except
                    && c.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
        }
    }

    impl DomainPort for InMemoryClientStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryClientStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-client-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl LeadPort for InMemoryClientStore {
        async fn create_lead(&self, lead: Lead) -> Result<Lead, PortError> {
            self.tables.write().await.leads.insert(lead.id, lead.clone());
            Ok(lead)
        }

        async fn get_lead(&self, id: LeadId) -> Result<Lead, PortError> {
            self.tables
                .read()
                .await
                .leads
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Lead", id))
        }

        async fn list_leads(&self, query: LeadQuery) -> Result<Page<Lead>, PortError> {
            let tables = self.tables.read().await;
            let mut leads: Vec<Lead> = tables
                .leads
                .values()
                .filter(|lead| query.matches(lead))
                .cloned()
                .collect();
            leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(Page::from_vec(leads, page_size(query.limit), query.offset.unwrap_or(0)))
        }

        async fn update_lead(&self, lead: Lead) -> Result<Lead, PortError> {
            let mut tables = self.tables.write().await;
            match tables.leads.get_mut(&lead.id) {
                Some(existing) => {
                    *existing = lead.clone();
                    Ok(lead)
                }
                None => Err(PortError::not_found("Lead", lead.id)),
            }
        }

        async fn delete_lead(&self, id: LeadId) -> Result<(), PortError> {
            self.tables
                .write()
                .await
                .leads
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Lead", id))
        }

        async fn count_by_status(&self) -> Result<Vec<(LeadStatus, u64)>, PortError> {
            let tables = self.tables.read().await;
            Ok(LeadStatus::ALL
                .into_iter()
                .map(|status| {
                    let count = tables.leads.values().filter(|l| l.status == status).count();
                    (status, count as u64)
                })
                .filter(|(_, count)| *count > 0)
                .collect())
        }

        async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError> {
            let tables = self.tables.read().await;
            Ok(tables.leads.values().filter(|l| l.created_at >= since).count() as u64)
        }

        async fn convert_lead(&self, lead: Lead, client: Client) -> Result<Client, PortError> {
            let mut tables = self.tables.write().await;
            match tables.leads.get(&lead.id) {
                None => return Err(PortError::not_found("Lead", lead.id)),
                Some(stored) if !stored.status.is_open() => {
                    return Err(PortError::conflict(format!(
                        "lead {} is no longer open for conversion",
                        lead.id
                    )));
                }
                Some(_) => {}
            }
            if Self::email_taken(&tables, client.email.as_deref(), None) {
                return Err(PortError::conflict("a client with this email already exists"));
            }
            tables.clients.insert(client.id, client.clone());
            tables.leads.insert(lead.id, lead);
            Ok(client)
        }
    }

    #[async_trait]
    impl ClientPort for InMemoryClientStore {
        async fn create_client(&self, client: Client) -> Result<Client, PortError> {
            let mut tables = self.tables.write().await;
            if Self::email_taken(&tables, client.email.as_deref(), None) {
                return Err(PortError::conflict("a client with this email already exists"));
            }
            tables.clients.insert(client.id, client.clone());
            Ok(client)
        }

        async fn get_client(&self, id: ClientId) -> Result<Client, PortError> {
            self.tables
                .read()
                .await
                .clients
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Client", id))
        }

        async fn list_clients(&self, query: ClientQuery) -> Result<Page<Client>, PortError> {
            let tables = self.tables.read().await;
            let mut clients: Vec<Client> = tables
                .clients
                .values()
                .filter(|c| query.matches(c))
                .cloned()
                .collect();
            clients.sort_by(|a, b| {
                (a.first_name.to_lowercase(), a.last_name.to_lowercase())
                    .cmp(&(b.first_name.to_lowercase(), b.last_name.to_lowercase()))
            });
            Ok(Page::from_vec(clients, page_size(query.limit), query.offset.unwrap_or(0)))
        }

        async fn update_client(&self, client: Client) -> Result<Client, PortError> {
            let mut tables = self.tables.write().await;
            if !tables.clients.contains_key(&client.id) {
                return Err(PortError::not_found("Client", client.id));
            }
            if Self::email_taken(&tables, client.email.as_deref(), Some(client.id)) {
                return Err(PortError::conflict("a client with this email already exists"));
            }
            tables.clients.insert(client.id, client.clone());
            Ok(client)
        }

        async fn delete_client(&self, id: ClientId) -> Result<(), PortError> {
            if self.refuse_client_deletes.load(Ordering::SeqCst) {
                return Err(PortError::conflict("client is still referenced by policies"));
            }
            let mut tables = self.tables.write().await;
            if tables.clients.remove(&id).is_none() {
                return Err(PortError::not_found("Client", id));
            }
            tables.documents.retain(|_, d| d.client_id != Some(id));
            Ok(())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Client>, PortError> {
            let tables = self.tables.read().await;
            Ok(tables
                .clients
                .values()
                .find(|c| c.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email.trim())))
                .cloned())
        }

        async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Client>, PortError> {
            let tables = self.tables.read().await;
            Ok(tables
                .clients
                .values()
                .filter(|c| c.is_birthday_on(date))
                .cloned()
                .collect())
        }

        async fn upcoming_birthdays(
            &self,
            from: NaiveDate,
            days: u32,
        ) -> Result<Vec<(Client, NaiveDate)>, PortError> {
            let tables = self.tables.read().await;
            let mut upcoming: Vec<(Client, NaiveDate)> = tables
                .clients
                .values()
                .filter_map(|c| {
                    let dob = c.date_of_birth?;
                    calendar::birthday_within(dob, from, days).map(|next| (c.clone(), next))
                })
                .collect();
            upcoming.sort_by_key(|(_, next)| *next);
            Ok(upcoming)
        }

        async fn count_clients(&self) -> Result<u64, PortError> {
            Ok(self.tables.read().await.clients.len() as u64)
        }
    }

    #[async_trait]
    impl DocumentPort for InMemoryClientStore {
        async fn save_document(&self, document: Document) -> Result<Document, PortError> {
            let mut tables = self.tables.write().await;
            if let Some(client_id) = document.client_id {
                if !tables.clients.contains_key(&client_id) {
                    return Err(PortError::validation_field("client does not exist", "client_id"));
                }
            }
            tables.documents.insert(document.id, document.clone());
            Ok(document)
        }

        async fn get_document(&self, id: DocumentId) -> Result<Document, PortError> {
            self.tables
                .read()
                .await
                .documents
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Document", id))
        }

        async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Document>, PortError> {
            let tables = self.tables.read().await;
            let mut documents: Vec<Document> = tables
                .documents
                .values()
                .filter(|d| d.client_id == Some(client_id))
                .cloned()
                .collect();
            documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
            Ok(documents)
        }

        async fn delete_document(&self, id: DocumentId) -> Result<(), PortError> {
            self.tables
                .write()
                .await
                .documents
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Document", id))
        }
    }

    #[async_trait]
    impl ActivityPort for InMemoryClientStore {
        async fn record(&self, activity: Activity) -> Result<Activity, PortError> {
            self.tables.write().await.activities.push(activity.clone());
            Ok(activity)
        }

        async fn list_recent(&self, query: ActivityQuery) -> Result<Vec<Activity>, PortError> {
            let tables = self.tables.read().await;
            let mut activities: Vec<Activity> = tables
                .activities
                .iter()
                .filter(|a| query.matches(a))
                .cloned()
                .collect();
            activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            activities.truncate(page_size(query.limit) as usize);
            Ok(activities)
        }

        async fn exists_between(
            &self,
            activity_type: ActivityType,
            entity_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<bool, PortError> {
            let tables = self.tables.read().await;
            Ok(tables.activities.iter().any(|a| {
                a.activity_type == activity_type
                    && a.entity_id == Some(entity_id)
                    && a.created_at >= start
                    && a.created_at < end
            }))
        }
    }

    /// In-memory file store; can be switched to fail every call
    #[derive(Debug, Default, Clone)]
    pub struct MockDocumentStore {
        files: Arc<RwLock<HashMap<String, usize>>>,
        failing: Arc<AtomicBool>,
    }

    impl MockDocumentStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes subsequent calls fail with `ServiceUnavailable`
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub async fn contains(&self, storage_key: &str) -> bool {
            self.files.read().await.contains_key(storage_key)
        }

        fn check(&self) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(PortError::unavailable("mock-store", "storage offline"))
            } else {
                Ok(())
            }
        }
    }

    impl DomainPort for MockDocumentStore {}

    #[async_trait]
    impl DocumentStorePort for MockDocumentStore {
        async fn upload(&self, file: &FileUpload) -> Result<StoredFile, PortError> {
            self.check()?;
            let folder = file.folder.as_deref().unwrap_or("crm");
            let storage_key = format!("{}/{}_{}", folder, file.safe_stem(), Uuid::new_v4().simple());
            self.files.write().await.insert(storage_key.clone(), file.bytes.len());
            Ok(StoredFile {
                url: format!("https://files.example.test/{}", storage_key),
                storage_key,
                size_bytes: file.size(),
            })
        }

        async fn delete(&self, storage_key: &str) -> Result<(), PortError> {
            self.check()?;
            self.files.write().await.remove(storage_key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryClientStore;
    use super::*;
    use crate::client::NewClient;
    use crate::lead::{ConversionDetails, NewLead};

    fn client(first: &str, email: &str) -> Client {
        Client::new(NewClient {
            first_name: first.into(),
            last_name: "Iyer".into(),
            email: Some(email.into()),
            phone: "9876543210".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = InMemoryClientStore::new();
        store.create_client(client("Meera", "meera@example.com")).await.unwrap();

        let err = store
            .create_client(client("Meena", "MEERA@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_keeping_own_email_is_allowed() {
        let store = InMemoryClientStore::new();
        let created = store.create_client(client("Meera", "meera@example.com")).await.unwrap();

        let updated = created
            .apply(crate::client::ClientUpdate {
                city: Some("Pune".into()),
                ..Default::default()
            })
            .unwrap();
        let saved = store.update_client(updated).await.unwrap();
        assert_eq!(saved.city.as_deref(), Some("Pune"));
    }

    #[tokio::test]
    async fn test_convert_lead_inserts_client() {
        let store = InMemoryClientStore::new();
        let lead = store
            .create_lead(
                Lead::new(NewLead {
                    name: "Kiran Rao".into(),
                    phone: "9123456780".into(),
                    ..Default::default()
                })
                .unwrap(),
            )
            .await
            .unwrap();

        let mut lead = store.get_lead(lead.id).await.unwrap();
        let new_client = Client::new(lead.to_new_client(ConversionDetails::default()).unwrap()).unwrap();
        lead.mark_converted(new_client.id).unwrap();
        let saved = store.convert_lead(lead.clone(), new_client).await.unwrap();

        assert_eq!(saved.lead_id, Some(lead.id));
        let stored = store.get_lead(lead.id).await.unwrap();
        assert_eq!(stored.status, LeadStatus::Converted);
        assert_eq!(stored.converted_client_id, Some(saved.id));
        assert_eq!(store.count_clients().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_convert_lead_from_stale_copy_is_conflict() {
        let store = InMemoryClientStore::new();
        let lead = store
            .create_lead(
                Lead::new(NewLead {
                    name: "Nisha Pillai".into(),
                    phone: "9123456781".into(),
                    ..Default::default()
                })
                .unwrap(),
            )
            .await
            .unwrap();

        // Two requests read the lead while it is still open
        let mut first = store.get_lead(lead.id).await.unwrap();
        let mut second = store.get_lead(lead.id).await.unwrap();

        let client = Client::new(first.to_new_client(ConversionDetails::default()).unwrap()).unwrap();
        first.mark_converted(client.id).unwrap();
        store.convert_lead(first, client).await.unwrap();

        let client = Client::new(second.to_new_client(ConversionDetails::default()).unwrap()).unwrap();
        second.mark_converted(client.id).unwrap();
        let err = store.convert_lead(second, client).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.count_clients().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lead_query_filters_and_pages() {
        let store = InMemoryClientStore::new();
        for i in 0..5 {
            let mut lead = Lead::new(NewLead {
                name: format!("Lead {}", i),
                phone: format!("98765000{:02}", i),
                ..Default::default()
            })
            .unwrap();
            if i % 2 == 0 {
                lead.transition_to(LeadStatus::Contacted).unwrap();
            }
            store.create_lead(lead).await.unwrap();
        }

        let page = store
            .list_leads(LeadQuery::by_status(LeadStatus::Contacted).paginate(2, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        let counts = store.count_by_status().await.unwrap();
        assert!(counts.contains(&(LeadStatus::New, 2)));
        assert!(counts.contains(&(LeadStatus::Contacted, 3)));
    }

    #[tokio::test]
    async fn test_exists_between_is_half_open() {
        let store = InMemoryClientStore::new();
        let client_id = ClientId::new();
        let at = Utc::now();
        store
            .record(
                Activity::new(ActivityType::BirthdayGreetingSent, "greeted")
                    .for_entity(EntityType::Client, client_id)
                    .at(at),
            )
            .await
            .unwrap();

        let hour = chrono::Duration::hours(1);
        assert!(store
            .exists_between(ActivityType::BirthdayGreetingSent, client_id.into(), at - hour, at + hour)
            .await
            .unwrap());
        assert!(!store
            .exists_between(ActivityType::BirthdayGreetingSent, client_id.into(), at - hour, at)
            .await
            .unwrap());
        assert!(!store
            .exists_between(ActivityType::RenewalReminderSent, client_id.into(), at - hour, at + hour)
            .await
            .unwrap());
    }
}
