//! Client DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_client::{Client, ClientQuery, ClientUpdate, Document, NewClient};
use domain_policy::PolicyInstance;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(length(min = 7, max = 20))]
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl From<CreateClientRequest> for NewClient {
    fn from(r: CreateClientRequest) -> Self {
        NewClient {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            whatsapp_number: r.whatsapp_number,
            date_of_birth: r.date_of_birth,
            address: r.address,
            city: r.city,
            occupation: r.occupation,
            notes: r.notes,
            lead_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub whatsapp_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl From<UpdateClientRequest> for ClientUpdate {
    fn from(r: UpdateClientRequest) -> Self {
        ClientUpdate {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            whatsapp_number: r.whatsapp_number,
            date_of_birth: r.date_of_birth,
            address: r.address,
            city: r.city,
            occupation: r.occupation,
            notes: r.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListParams {
    /// Matches name, email or phone
    pub search: Option<String>,
    pub city: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ClientListParams> for ClientQuery {
    fn from(p: ClientListParams) -> Self {
        ClientQuery {
            search: p.search.filter(|s| !s.trim().is_empty()),
            city: p.city.filter(|s| !s.trim().is_empty()),
            limit: p.limit,
            offset: p.offset,
        }
    }
}

/// A client together with their policies and documents
#[derive(Debug, Serialize)]
pub struct ClientDetailResponse {
    #[serde(flatten)]
    pub client: Client,
    pub policies: Vec<PolicyInstance>,
    pub documents: Vec<Document>,
}
