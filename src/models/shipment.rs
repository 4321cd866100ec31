//! Shipment record and the JSON sub-documents stored alongside it.
//!
//! Each aspect of a shipment (party snapshots, details, documents, timeline,
//! notes, cargo, computations, statement of facts) lives in its own TEXT
//! column as JSON. `ShipmentRow` is the raw row, `Shipment` the decoded form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::FromRow;

use crate::workflow::{Stage, StageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
pub enum FreightType {
    #[serde(alias = "IMS")]
    #[sqlx(rename = "IMS")]
    Sea,
    #[serde(alias = "IMA")]
    #[sqlx(rename = "IMA")]
    Air,
}

impl FreightType {
    /// Transaction code used in reference numbers.
    pub fn code(self) -> &'static str {
        match self {
            FreightType::Sea => "IMS",
            FreightType::Air => "IMA",
        }
    }
}

/// Point-in-time copy of the consignee taken onto the shipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsigneeSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub tin: String,
    pub brn: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExporterSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub contact_person: String,
    pub contact_number: String,
    pub email: String,
}

/// Transport identifiers, ports and dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentDetails {
    pub bl_number: String,
    pub awb_number: String,
    pub vessel_name: String,
    pub flight_number: String,
    pub registry_number: String,
    pub voyage_number: String,
    pub container_number: String,
    pub port_of_origin: String,
    pub port_of_discharge: String,
    pub country_of_origin: String,
    pub country_of_export: String,
    pub terms_of_delivery: String,
    pub final_destination: String,
    pub contact_person: String,
    pub contact_number: String,
    pub eta: String,
    pub ata: String,
    pub description_of_goods: String,
    pub markings_and_numbers: String,
    pub packaging_code: String,
    pub packaging_details: String,
    pub volume: String,
}

impl ShipmentDetails {
    /// BL number for sea freight, AWB (falling back to flight) for air.
    pub fn transport_reference(&self, freight: FreightType) -> &str {
        match freight {
            FreightType::Sea => &self.bl_number,
            FreightType::Air if !self.awb_number.is_empty() => &self.awb_number,
            FreightType::Air => &self.flight_number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    NotUploaded,
    Draft,
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub name: String,
    pub status: DocumentStatus,
    pub is_verified: bool,
    pub is_required: bool,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: Stage,
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CargoItem {
    pub id: String,
    pub description: String,
    pub invoice_value: f64,
    pub gross_weight: f64,
    pub net_weight: f64,
    pub quantity: f64,
    pub hs_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Computations {
    pub dutiable_value: f64,
    pub customs_duty: f64,
    pub vat: f64,
    pub other_charges: f64,
    pub total_payable: f64,
}

impl Computations {
    /// Recomputes the payable total from its parts.
    pub fn with_total(mut self) -> Self {
        self.total_payable = self.customs_duty + self.vat + self.other_charges;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Free-text activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementOfFactEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub created_by: Author,
    #[serde(default)]
    pub documents: Vec<AttachedDocument>,
}

/// Raw shipments row.
#[derive(Debug, Clone, FromRow)]
pub struct ShipmentRow {
    pub id: String,
    pub reference_number: String,
    pub freight_type: FreightType,
    pub status: Stage,
    pub user_id: String,
    pub consignee_id: Option<String>,
    pub exporter_id: Option<String>,
    pub consignee_data: String,
    pub exporter_data: String,
    pub shipment_details: String,
    pub documents_data: String,
    pub timeline_data: String,
    pub notes_data: String,
    pub cargo_data: String,
    pub computations: Option<String>,
    pub statement_of_facts_data: String,
    pub is_locked: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded shipment as served to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub reference_number: String,
    pub freight_type: FreightType,
    pub status: Stage,
    pub user_id: String,
    pub consignee_id: Option<String>,
    pub exporter_id: Option<String>,
    pub consignee: ConsigneeSnapshot,
    pub exporter: ExporterSnapshot,
    pub shipment_details: ShipmentDetails,
    pub documents: Vec<DocumentEntry>,
    pub timeline: Vec<TimelineEntry>,
    pub notes: Vec<Note>,
    pub cargo: Vec<CargoItem>,
    pub computations: Option<Computations>,
    pub statement_of_facts: Vec<StatementOfFactEvent>,
    pub is_locked: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = serde_json::Error;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            consignee: decode_column(&row.consignee_data)?,
            exporter: decode_column(&row.exporter_data)?,
            shipment_details: decode_column(&row.shipment_details)?,
            documents: decode_column(&row.documents_data)?,
            timeline: decode_column(&row.timeline_data)?,
            notes: decode_column(&row.notes_data)?,
            cargo: decode_column(&row.cargo_data)?,
            computations: match row.computations.as_deref() {
                Some(raw) => decode_column(raw)?,
                None => None,
            },
            statement_of_facts: decode_column(&row.statement_of_facts_data)?,
            id: row.id,
            reference_number: row.reference_number,
            freight_type: row.freight_type,
            status: row.status,
            user_id: row.user_id,
            consignee_id: row.consignee_id,
            exporter_id: row.exporter_id,
            is_locked: row.is_locked,
            completion_date: row.completion_date,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Storage encoding of a sub-document.
pub fn encode_column<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Inverse of [`encode_column`]. Empty text and JSON `null` decode to the default.
pub fn decode_column<T: DeserializeOwned + Default>(raw: &str) -> Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    serde_json::from_str(trimmed)
}

/// One editable section of a shipment, each with its own field set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum SectionUpdate {
    Consignee {
        name: String,
        address: String,
        #[serde(default)]
        tin: String,
        #[serde(default)]
        brn: String,
    },
    Exporter {
        name: String,
        address: String,
    },
    #[serde(rename_all = "snake_case")]
    Transport {
        #[serde(default)]
        bl_number: String,
        #[serde(default)]
        awb_number: String,
        #[serde(default)]
        vessel_name: String,
        #[serde(default)]
        flight_number: String,
        #[serde(default)]
        registry_number: String,
        #[serde(default)]
        voyage_number: String,
        #[serde(default)]
        container_number: String,
    },
    Location {
        port_of_origin: String,
        port_of_discharge: String,
        #[serde(default)]
        terms_of_delivery: String,
        #[serde(default)]
        final_destination: String,
        #[serde(default)]
        contact_person: String,
        #[serde(default)]
        contact_number: String,
    },
    Schedule {
        #[serde(default)]
        eta: String,
        #[serde(default)]
        ata: String,
    },
}

impl SectionUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            SectionUpdate::Consignee { .. } => "consignee",
            SectionUpdate::Exporter { .. } => "exporter",
            SectionUpdate::Transport { .. } => "transport",
            SectionUpdate::Location { .. } => "location",
            SectionUpdate::Schedule { .. } => "schedule",
        }
    }

    /// Writes this section onto the shipment, leaving every other field untouched.
    pub fn apply(self, shipment: &mut Shipment) {
        match self {
            SectionUpdate::Consignee { name, address, tin, brn } => {
                let snapshot = &mut shipment.consignee;
                snapshot.name = name;
                snapshot.address = address;
                snapshot.tin = tin;
                snapshot.brn = brn;
            }
            SectionUpdate::Exporter { name, address } => {
                shipment.exporter.name = name;
                shipment.exporter.address = address;
            }
            SectionUpdate::Transport {
                bl_number,
                awb_number,
                vessel_name,
                flight_number,
                registry_number,
                voyage_number,
                container_number,
            } => {
                let details = &mut shipment.shipment_details;
                details.bl_number = bl_number;
                details.awb_number = awb_number;
                details.vessel_name = vessel_name;
                details.flight_number = flight_number;
                details.registry_number = registry_number;
                details.voyage_number = voyage_number;
                details.container_number = container_number;
            }
            SectionUpdate::Location {
                port_of_origin,
                port_of_discharge,
                terms_of_delivery,
                final_destination,
                contact_person,
                contact_number,
            } => {
                let details = &mut shipment.shipment_details;
                details.port_of_origin = port_of_origin;
                details.port_of_discharge = port_of_discharge;
                details.terms_of_delivery = terms_of_delivery;
                details.final_destination = final_destination;
                details.contact_person = contact_person;
                details.contact_number = contact_number;
            }
            SectionUpdate::Schedule { eta, ata } => {
                shipment.shipment_details.eta = eta;
                shipment.shipment_details.ata = ata;
            }
        }
    }
}

/// Row of the shipments list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentListItem {
    pub id: String,
    pub reference_number: String,
    pub consignee: String,
    #[serde(rename = "type")]
    pub freight_type: FreightType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bl_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awb_number: Option<String>,
    pub status: Stage,
    pub eta: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub is_locked: bool,
    pub user_id: String,
    pub created_by: Option<Author>,
}

impl ShipmentListItem {
    pub fn from_shipment(shipment: &Shipment, created_by: Option<Author>) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let details = &shipment.shipment_details;
        let consignee = if shipment.consignee.name.is_empty() {
            "N/A".to_string()
        } else {
            shipment.consignee.name.clone()
        };
        Self {
            id: shipment.id.clone(),
            reference_number: shipment.reference_number.clone(),
            consignee,
            freight_type: shipment.freight_type,
            bl_number: match shipment.freight_type {
                FreightType::Sea => non_empty(&details.bl_number),
                FreightType::Air => None,
            },
            awb_number: match shipment.freight_type {
                FreightType::Air => non_empty(details.transport_reference(FreightType::Air)),
                FreightType::Sea => None,
            },
            status: shipment.status,
            eta: non_empty(&details.eta),
            completion_date: shipment.completion_date,
            last_update: shipment.updated_at,
            is_locked: shipment.is_locked,
            user_id: shipment.user_id.clone(),
            created_by,
        }
    }
}
