//! Lead DTOs

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use domain_client::{ConversionDetails, LeadQuery, LeadSource, LeadStatus, LeadUpdate, NewLead};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[serde(default)]
    pub source: LeadSource,
    #[validate(length(max = 200))]
    pub interested_in: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl From<CreateLeadRequest> for NewLead {
    fn from(r: CreateLeadRequest) -> Self {
        NewLead {
            name: r.name,
            email: r.email,
            phone: r.phone,
            source: r.source,
            interested_in: r.interested_in,
            notes: r.notes,
            follow_up_date: r.follow_up_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    #[validate(length(max = 200))]
    pub interested_in: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl From<UpdateLeadRequest> for LeadUpdate {
    fn from(r: UpdateLeadRequest) -> Self {
        LeadUpdate {
            name: r.name,
            email: r.email,
            phone: r.phone,
            source: r.source,
            status: r.status,
            interested_in: r.interested_in,
            notes: r.notes,
            follow_up_date: r.follow_up_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadListParams {
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<LeadListParams> for LeadQuery {
    fn from(p: LeadListParams) -> Self {
        LeadQuery {
            status: p.status,
            source: p.source,
            search: p.search.filter(|s| !s.trim().is_empty()),
            limit: p.limit,
            offset: p.offset,
        }
    }
}

/// Client fields that override what the lead already holds
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConvertLeadRequest {
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
    pub address: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
}

impl From<ConvertLeadRequest> for ConversionDetails {
    fn from(r: ConvertLeadRequest) -> Self {
        ConversionDetails {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            whatsapp_number: r.whatsapp_number,
            date_of_birth: r.date_of_birth,
            address: r.address,
            city: r.city,
            occupation: r.occupation,
        }
    }
}
