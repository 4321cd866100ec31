//! Business partners on a shipment: the receiving consignee and the sending exporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::workflow::Stage;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Consignee {
    pub id: String,
    pub name: String,
    pub registered_name: String,
    pub business_address: String,
    pub tin: String,
    pub brn: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
    pub is_active: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsigneeDocument {
    pub id: String,
    pub consignee_id: String,
    pub name: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Exporter {
    pub id: String,
    pub name: String,
    pub business_address: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
    pub is_active: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a consignee.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsigneeForm {
    pub name: String,
    pub registered_name: String,
    pub business_address: String,
    pub tin: String,
    pub brn: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
}

/// Partial update for a consignee; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsigneePatch {
    pub name: Option<String>,
    pub registered_name: Option<String>,
    pub business_address: Option<String>,
    pub tin: Option<String>,
    pub brn: Option<String>,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl ConsigneePatch {
    pub fn apply(self, consignee: &mut Consignee) {
        let Self {
            name,
            registered_name,
            business_address,
            tin,
            brn,
            contact_person,
            contact_number,
            email,
            is_active,
        } = self;
        if let Some(v) = name {
            consignee.name = v;
        }
        if let Some(v) = registered_name {
            consignee.registered_name = v;
        }
        if let Some(v) = business_address {
            consignee.business_address = v;
        }
        if let Some(v) = tin {
            consignee.tin = v;
        }
        if let Some(v) = brn {
            consignee.brn = v;
        }
        if let Some(v) = contact_person {
            consignee.contact_person = v;
        }
        if let Some(v) = contact_number {
            consignee.contact_number = v;
        }
        if let Some(v) = email {
            consignee.email = v;
        }
        if let Some(v) = is_active {
            consignee.is_active = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExporterForm {
    pub name: String,
    pub business_address: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExporterPatch {
    pub name: Option<String>,
    pub business_address: Option<String>,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl ExporterPatch {
    pub fn apply(self, exporter: &mut Exporter) {
        if let Some(v) = self.name {
            exporter.name = v;
        }
        if let Some(v) = self.business_address {
            exporter.business_address = v;
        }
        if let Some(v) = self.contact_person {
            exporter.contact_person = v;
        }
        if let Some(v) = self.contact_number {
            exporter.contact_number = v;
        }
        if let Some(v) = self.email {
            exporter.email = v;
        }
        if let Some(v) = self.is_active {
            exporter.is_active = v;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsigneeDocument {
    pub name: String,
    pub file_url: String,
}

/// Shipment line shown on a consignee or exporter page.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSummary {
    pub id: String,
    pub reference_number: String,
    pub status: Stage,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsigneeDetail {
    #[serde(flatten)]
    pub consignee: Consignee,
    pub documents: Vec<ConsigneeDocument>,
    pub shipments: Vec<ShipmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterDetail {
    #[serde(flatten)]
    pub exporter: Exporter,
    pub shipments: Vec<ShipmentSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Consignee,
    Exporter,
}

/// Validates a Philippine TIN: `ddd-ddd-ddd` with an optional `-ddd` branch code.
pub fn is_valid_tin(tin: &str) -> bool {
    let groups: Vec<&str> = tin.split('-').collect();
    (groups.len() == 3 || groups.len() == 4)
        && groups
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}
