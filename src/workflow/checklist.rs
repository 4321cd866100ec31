use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::shipment::{DocumentEntry, DocumentStatus, FreightType};

/// Documents after the transport document that every import needs.
const REQUIRED_DOCUMENTS: [&str; 2] = ["Commercial Invoice", "Packing List"];

const OPTIONAL_DOCUMENTS: [&str; 6] = [
    "Letterhead",
    "Safety Data Sheet (SDS)",
    "Certificate of Origin",
    "Import Permit",
    "Product Certifications",
    "Final SAD",
];

fn transport_document(freight: FreightType) -> &'static str {
    match freight {
        FreightType::Sea => "Bill of Lading",
        FreightType::Air => "Airway Bill",
    }
}

fn empty_entry(name: &str, is_required: bool) -> DocumentEntry {
    DocumentEntry {
        name: name.to_string(),
        status: DocumentStatus::NotUploaded,
        is_verified: false,
        is_required,
        files: Vec::new(),
    }
}

/// Checklist a new shipment starts with.
pub fn initial_checklist(freight: FreightType) -> Vec<DocumentEntry> {
    std::iter::once(empty_entry(transport_document(freight), true))
        .chain(REQUIRED_DOCUMENTS.iter().map(|name| empty_entry(name, true)))
        .chain(OPTIONAL_DOCUMENTS.iter().map(|name| empty_entry(name, false)))
        .collect()
}

fn find_mut<'a>(documents: &'a mut [DocumentEntry], name: &str) -> Result<&'a mut DocumentEntry> {
    documents
        .iter_mut()
        .find(|doc| doc.name == name)
        .ok_or_else(|| AppError::NotFound(format!("Document '{name}'")))
}

/// Appends an uploaded file. Anything but `Final` is stored as a draft.
pub fn record_upload<'a>(
    documents: &'a mut [DocumentEntry],
    name: &str,
    file_url: String,
    status: DocumentStatus,
) -> Result<&'a DocumentEntry> {
    let doc = find_mut(documents, name)?;
    doc.files.push(file_url);
    doc.status = match status {
        DocumentStatus::Final => DocumentStatus::Final,
        _ => DocumentStatus::Draft,
    };
    // a new file has not been looked at yet
    doc.is_verified = false;
    Ok(doc)
}

pub fn verify<'a>(documents: &'a mut [DocumentEntry], name: &str) -> Result<&'a DocumentEntry> {
    let doc = find_mut(documents, name)?;
    if doc.files.is_empty() {
        return Err(AppError::Validation(format!(
            "'{name}' has no uploaded file to verify"
        )));
    }
    doc.is_verified = true;
    Ok(doc)
}

pub fn required_documents_verified(documents: &[DocumentEntry]) -> bool {
    documents
        .iter()
        .filter(|doc| doc.is_required)
        .all(|doc| doc.is_verified)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Gray,
    Yellow,
    Orange,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub color: IndicatorColor,
    pub action: &'static str,
}

pub fn indicator(doc: &DocumentEntry) -> Indicator {
    let (color, action) = match (doc.status, doc.is_verified) {
        (DocumentStatus::NotUploaded, _) => (IndicatorColor::Gray, "Upload"),
        (DocumentStatus::Draft, false) => (IndicatorColor::Yellow, "Verify"),
        (DocumentStatus::Draft, true) => (IndicatorColor::Yellow, "Verified"),
        (DocumentStatus::Final, true) => (IndicatorColor::Green, "Verified"),
        (DocumentStatus::Final, false) => (IndicatorColor::Orange, "Verify"),
    };
    Indicator { color, action }
}

/// Document line as shown in the document collection stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    #[serde(flatten)]
    pub document: DocumentEntry,
    pub indicator: Indicator,
}

pub fn document_rows(documents: &[DocumentEntry]) -> Vec<DocumentRow> {
    documents
        .iter()
        .map(|doc| DocumentRow {
            indicator: indicator(doc),
            document: doc.clone(),
        })
        .collect()
}
