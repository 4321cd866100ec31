use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    db::{
        client_store::{
            find_consignee, find_consignee_by_identity, find_exporter, find_exporter_by_identity,
            insert_consignee, insert_exporter,
        },
        shipment_store::{ShipmentStore, insert_shipment},
        user_store::UserStore,
    },
    error::{AppError, Result},
    models::{
        client::{ClientKind, Consignee, ConsigneeForm, Exporter, ExporterForm},
        shipment::{
            AttachedDocument, Author, CargoItem, Computations, ConsigneeSnapshot, DocumentEntry,
            DocumentStatus, ExporterSnapshot, FreightType, Note, SectionUpdate, Shipment,
            ShipmentDetails, ShipmentListItem, StatementOfFactEvent,
        },
        user::User,
    },
    services::{
        access::{ResourcePermissions, ensure_create, ensure_edit, ensure_staff, ensure_view},
        storage::DocumentStorage,
    },
    workflow::{
        Advance, ClientDetailsCheck, ConfirmationPrompt, Stage, StageCard, WorkflowTracker,
        check_client_details,
        checklist::{self, DocumentRow},
        reference::generate_reference,
    },
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipment {
    pub freight_type: FreightType,
    #[serde(default)]
    pub consignee: ConsigneeSnapshot,
    #[serde(default)]
    pub exporter: ExporterSnapshot,
    #[serde(default)]
    pub shipment_details: ShipmentDetails,
}

/// Cargo line as submitted; a missing id creates a new line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CargoInput {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub invoice_value: f64,
    #[serde(default)]
    pub gross_weight: f64,
    #[serde(default)]
    pub net_weight: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub hs_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactInput {
    pub description: String,
    #[serde(default)]
    pub documents: Vec<AttachedDocument>,
}

/// Everything the shipment workflow page needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub shipment: Shipment,
    pub stage_label: &'static str,
    pub stages: Vec<StageCard>,
    pub documents: Vec<DocumentRow>,
    pub required_documents_verified: bool,
    pub client_details: ClientDetailsCheck,
    pub confirmation: ConfirmationPrompt,
    pub permissions: ResourcePermissions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCompletion {
    #[serde(flatten)]
    pub advance: Advance,
    pub shipment: Shipment,
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

fn fill(target: &mut String, source: &str) {
    if target.trim().is_empty() {
        *target = source.to_string();
    }
}

fn fill_consignee_snapshot(snapshot: &mut ConsigneeSnapshot, record: &Consignee) {
    snapshot.id = Some(record.id.clone());
    fill(&mut snapshot.name, &record.name);
    fill(&mut snapshot.address, &record.business_address);
    fill(&mut snapshot.tin, &record.tin);
    fill(&mut snapshot.brn, &record.brn);
    fill(&mut snapshot.contact_person, &record.contact_person);
    fill(&mut snapshot.contact_number, &record.contact_number);
    fill(&mut snapshot.email, &record.email);
}

fn fill_exporter_snapshot(snapshot: &mut ExporterSnapshot, record: &Exporter) {
    snapshot.id = Some(record.id.clone());
    fill(&mut snapshot.name, &record.name);
    fill(&mut snapshot.address, &record.business_address);
    fill(&mut snapshot.contact_person, &record.contact_person);
    fill(&mut snapshot.contact_number, &record.contact_number);
    fill(&mut snapshot.email, &record.email);
}

fn ensure_version(shipment: &Shipment, expected: i64) -> Result<()> {
    if shipment.version != expected {
        return Err(AppError::Conflict(
            "Shipment was modified by someone else; reload and try again".into(),
        ));
    }
    Ok(())
}

fn ensure_unlocked(shipment: &Shipment) -> Result<()> {
    if shipment.is_locked {
        return Err(AppError::Conflict("Shipment is locked".into()));
    }
    Ok(())
}

fn validate_cargo(input: &CargoInput) -> Result<()> {
    if !non_empty(&input.description) {
        return Err(AppError::Validation("Cargo description is required".into()));
    }
    let amounts = [
        input.invoice_value,
        input.gross_weight,
        input.net_weight,
        input.quantity,
    ];
    if amounts.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AppError::Validation(
            "Cargo amounts must be non-negative numbers".into(),
        ));
    }
    Ok(())
}

fn validate_computations(c: &Computations) -> Result<()> {
    let parts = [c.dutiable_value, c.customs_duty, c.vat, c.other_charges];
    if parts.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AppError::Validation(
            "Computed amounts must be non-negative numbers".into(),
        ));
    }
    Ok(())
}

/// Shipment records and the clearance workflow running over them
#[derive(Clone)]
pub struct ShipmentService {
    store: ShipmentStore,
    users: UserStore,
    storage: Arc<dyn DocumentStorage>,
}

impl ShipmentService {
    pub fn new(store: ShipmentStore, users: UserStore, storage: Arc<dyn DocumentStorage>) -> Self {
        Self {
            store,
            users,
            storage,
        }
    }

    /// Create a shipment together with any consignee or exporter it names
    /// that does not exist yet. All rows land in one transaction.
    pub async fn create(&self, actor: &User, request: CreateShipment) -> Result<Shipment> {
        ensure_create(actor, "shipment")?;
        let CreateShipment {
            freight_type,
            mut consignee,
            mut exporter,
            shipment_details,
        } = request;

        if consignee.id.is_none() && !non_empty(&consignee.name) {
            return Err(AppError::Validation("Consignee name is required".into()));
        }
        if exporter.id.is_none() && !non_empty(&exporter.name) {
            return Err(AppError::Validation("Exporter name is required".into()));
        }

        let mut tx = self.store.pool().begin().await.map_err(AppError::Database)?;

        let consignee_record = match consignee.id.as_deref() {
            Some(id) => {
                let record = find_consignee(&mut tx, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Consignee".into()))?;
                ensure_view(actor, &record.user_id, "Consignee")?;
                record
            }
            None => match find_consignee_by_identity(&mut tx, &actor.id, &consignee.tin, &consignee.name)
                .await?
            {
                Some(record) => record,
                None => {
                    let form = ConsigneeForm {
                        name: consignee.name.clone(),
                        registered_name: consignee.name.clone(),
                        business_address: consignee.address.clone(),
                        tin: consignee.tin.clone(),
                        brn: consignee.brn.clone(),
                        contact_person: consignee.contact_person.clone(),
                        contact_number: consignee.contact_number.clone(),
                        email: consignee.email.clone(),
                    };
                    insert_consignee(&mut tx, &actor.id, &form).await?
                }
            },
        };

        let exporter_record = match exporter.id.as_deref() {
            Some(id) => {
                let record = find_exporter(&mut tx, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Exporter".into()))?;
                ensure_view(actor, &record.user_id, "Exporter")?;
                record
            }
            None => match find_exporter_by_identity(&mut tx, &actor.id, &exporter.name, &exporter.address)
                .await?
            {
                Some(record) => record,
                None => {
                    let form = ExporterForm {
                        name: exporter.name.clone(),
                        business_address: exporter.address.clone(),
                        contact_person: exporter.contact_person.clone(),
                        contact_number: exporter.contact_number.clone(),
                        email: exporter.email.clone(),
                    };
                    insert_exporter(&mut tx, &actor.id, &form).await?
                }
            },
        };

        fill_consignee_snapshot(&mut consignee, &consignee_record);
        fill_exporter_snapshot(&mut exporter, &exporter_record);

        let now = Utc::now();
        let shipment = Shipment {
            id: Uuid::new_v4().to_string(),
            reference_number: generate_reference(freight_type, now),
            freight_type,
            status: Stage::INITIAL,
            user_id: actor.id.clone(),
            consignee_id: Some(consignee_record.id),
            exporter_id: Some(exporter_record.id),
            consignee,
            exporter,
            shipment_details,
            documents: checklist::initial_checklist(freight_type),
            timeline: Vec::new(),
            notes: Vec::new(),
            cargo: Vec::new(),
            computations: None,
            statement_of_facts: Vec::new(),
            is_locked: false,
            completion_date: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        insert_shipment(&mut tx, &shipment).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            shipment_id = %shipment.id,
            reference = %shipment.reference_number,
            user_id = %actor.id,
            "shipment created"
        );
        self.store.get(&shipment.id).await
    }

    /// Shipments the actor may see, newest first
    pub async fn visible(&self, actor: &User) -> Result<Vec<Shipment>> {
        let owner = (!actor.role.is_staff()).then_some(actor.id.as_str());
        self.store.list(owner).await
    }

    pub async fn list(&self, actor: &User) -> Result<Vec<ShipmentListItem>> {
        let shipments = self.visible(actor).await?;
        let authors: HashMap<String, String> = self
            .users
            .get_all_users()
            .await?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        Ok(shipments
            .iter()
            .map(|shipment| {
                let created_by = authors.get(&shipment.user_id).map(|name| Author {
                    id: shipment.user_id.clone(),
                    name: name.clone(),
                });
                ShipmentListItem::from_shipment(shipment, created_by)
            })
            .collect())
    }

    pub async fn get(&self, actor: &User, id: &str) -> Result<Shipment> {
        let shipment = self.store.get(id).await?;
        ensure_view(actor, &shipment.user_id, "Shipment")?;
        Ok(shipment)
    }

    pub async fn workflow_view(&self, actor: &User, id: &str) -> Result<WorkflowView> {
        let shipment = self.get(actor, id).await?;
        let permissions = ResourcePermissions::resolve(actor, Some(&shipment.user_id));
        let tracker = WorkflowTracker::new(shipment.status, shipment.timeline.clone());
        let client_details = check_client_details(
            shipment.freight_type,
            &shipment.consignee,
            &shipment.exporter,
            &shipment.shipment_details,
        );

        Ok(WorkflowView {
            stage_label: shipment.status.label(),
            stages: tracker.board(),
            documents: checklist::document_rows(&shipment.documents),
            required_documents_verified: checklist::required_documents_verified(&shipment.documents),
            confirmation: client_details.prompt(),
            client_details,
            permissions,
            shipment,
        })
    }

    pub async fn check_client_details(&self, actor: &User, id: &str) -> Result<ClientDetailsCheck> {
        let shipment = self.get(actor, id).await?;
        Ok(check_client_details(
            shipment.freight_type,
            &shipment.consignee,
            &shipment.exporter,
            &shipment.shipment_details,
        ))
    }

    /// Load, check access and version, apply `change`, then save.
    async fn mutate<F>(&self, actor: &User, id: &str, version: i64, change: F) -> Result<Shipment>
    where
        F: FnOnce(&mut Shipment) -> Result<()>,
    {
        let mut shipment = self.store.get(id).await?;
        ensure_edit(actor, &shipment.user_id, "Shipment")?;
        ensure_unlocked(&shipment)?;
        ensure_version(&shipment, version)?;

        change(&mut shipment)?;
        self.store.save(&shipment).await
    }

    pub async fn update_section(
        &self,
        actor: &User,
        id: &str,
        version: i64,
        update: SectionUpdate,
    ) -> Result<Shipment> {
        let section = update.name();
        let shipment = self
            .mutate(actor, id, version, |shipment| {
                update.apply(shipment);
                Ok(())
            })
            .await?;
        tracing::info!(shipment_id = %id, section, "shipment section updated");
        Ok(shipment)
    }

    pub async fn replace_documents(
        &self,
        actor: &User,
        id: &str,
        version: i64,
        documents: Vec<DocumentEntry>,
    ) -> Result<Shipment> {
        let mut seen = std::collections::HashSet::new();
        for doc in &documents {
            if !non_empty(&doc.name) {
                return Err(AppError::Validation("Document name is required".into()));
            }
            if !seen.insert(doc.name.as_str()) {
                return Err(AppError::Validation(format!(
                    "Document '{}' is listed twice",
                    doc.name
                )));
            }
        }

        self.mutate(actor, id, version, |shipment| {
            shipment.documents = documents;
            Ok(())
        })
        .await
    }

    pub async fn add_note(&self, actor: &User, id: &str, version: i64, content: String) -> Result<Shipment> {
        if !non_empty(&content) {
            return Err(AppError::Validation("Note content is required".into()));
        }
        let author = actor.name.clone();
        self.mutate(actor, id, version, |shipment| {
            shipment.notes.push(Note {
                content: content.trim().to_string(),
                timestamp: Utc::now(),
                author,
            });
            Ok(())
        })
        .await
    }

    /// Insert a new cargo line or replace the one with the same id.
    pub async fn upsert_cargo(&self, actor: &User, id: &str, version: i64, input: CargoInput) -> Result<Shipment> {
        validate_cargo(&input)?;
        self.mutate(actor, id, version, |shipment| {
            let item = CargoItem {
                id: input
                    .id
                    .filter(|id| non_empty(id))
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                description: input.description.trim().to_string(),
                invoice_value: input.invoice_value,
                gross_weight: input.gross_weight,
                net_weight: input.net_weight,
                quantity: input.quantity,
                hs_code: input.hs_code.trim().to_string(),
            };
            match shipment.cargo.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => shipment.cargo.push(item),
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_cargo(&self, actor: &User, id: &str, version: i64, cargo_id: &str) -> Result<Shipment> {
        self.mutate(actor, id, version, |shipment| {
            let before = shipment.cargo.len();
            shipment.cargo.retain(|item| item.id != cargo_id);
            if shipment.cargo.len() == before {
                return Err(AppError::NotFound("Cargo item".into()));
            }
            Ok(())
        })
        .await
    }

    pub async fn set_computations(
        &self,
        actor: &User,
        id: &str,
        version: i64,
        computations: Computations,
    ) -> Result<Shipment> {
        validate_computations(&computations)?;
        self.mutate(actor, id, version, |shipment| {
            shipment.computations = Some(computations.with_total());
            Ok(())
        })
        .await
    }

    pub async fn add_fact(&self, actor: &User, id: &str, version: i64, input: FactInput) -> Result<Shipment> {
        if !non_empty(&input.description) {
            return Err(AppError::Validation("Description is required".into()));
        }
        let created_by = Author {
            id: actor.id.clone(),
            name: actor.name.clone(),
        };
        self.mutate(actor, id, version, |shipment| {
            shipment.statement_of_facts.push(StatementOfFactEvent {
                id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                description: input.description.trim().to_string(),
                created_by,
                documents: input.documents,
            });
            Ok(())
        })
        .await
    }

    pub async fn delete_fact(&self, actor: &User, id: &str, version: i64, event_id: &str) -> Result<Shipment> {
        self.mutate(actor, id, version, |shipment| {
            let before = shipment.statement_of_facts.len();
            shipment.statement_of_facts.retain(|event| event.id != event_id);
            if shipment.statement_of_facts.len() == before {
                return Err(AppError::NotFound("Statement of facts event".into()));
            }
            Ok(())
        })
        .await
    }

    /// Point the shipment at a client record. A snapshot that already holds
    /// data is left as it was captured.
    pub async fn link_client(
        &self,
        actor: &User,
        id: &str,
        version: i64,
        kind: ClientKind,
        client_id: &str,
    ) -> Result<Shipment> {
        let mut conn = self.store.pool().acquire().await.map_err(AppError::Database)?;

        match kind {
            ClientKind::Consignee => {
                let record = find_consignee(&mut conn, client_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Consignee".into()))?;
                drop(conn);
                ensure_view(actor, &record.user_id, "Consignee")?;
                self.mutate(actor, id, version, |shipment| {
                    shipment.consignee_id = Some(record.id.clone());
                    if !non_empty(&shipment.consignee.name) {
                        fill_consignee_snapshot(&mut shipment.consignee, &record);
                    }
                    Ok(())
                })
                .await
            }
            ClientKind::Exporter => {
                let record = find_exporter(&mut conn, client_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Exporter".into()))?;
                drop(conn);
                ensure_view(actor, &record.user_id, "Exporter")?;
                self.mutate(actor, id, version, |shipment| {
                    shipment.exporter_id = Some(record.id.clone());
                    if !non_empty(&shipment.exporter.name) {
                        fill_exporter_snapshot(&mut shipment.exporter, &record);
                    }
                    Ok(())
                })
                .await
            }
        }
    }

    /// Complete the current stage and advance. Completing Delivered a second
    /// time changes nothing.
    pub async fn complete_stage(&self, actor: &User, id: &str, version: i64) -> Result<StageCompletion> {
        ensure_staff(actor)?;
        let mut shipment = self.store.get(id).await?;
        ensure_edit(actor, &shipment.user_id, "Shipment")?;
        ensure_version(&shipment, version)?;

        let mut tracker = WorkflowTracker::new(shipment.status, std::mem::take(&mut shipment.timeline));
        let now = Utc::now();
        let advance = tracker.complete_current_stage(now);

        if advance == Advance::AlreadyFinished {
            let (status, timeline) = tracker.into_parts();
            shipment.status = status;
            shipment.timeline = timeline;
            return Ok(StageCompletion { advance, shipment });
        }

        ensure_unlocked(&shipment)?;
        let (status, timeline) = tracker.into_parts();
        shipment.status = status;
        shipment.timeline = timeline;
        if advance == Advance::Finished {
            shipment.completion_date = Some(now);
            shipment.is_locked = true;
        }

        let shipment = self.store.save(&shipment).await?;
        tracing::info!(shipment_id = %id, ?advance, "stage completed");
        Ok(StageCompletion { advance, shipment })
    }

    /// Store an uploaded file for one checklist document.
    pub async fn upload_document(
        &self,
        actor: &User,
        id: &str,
        version: i64,
        document: &str,
        file_name: &str,
        status: DocumentStatus,
    ) -> Result<Shipment> {
        let shipment = self.store.get(id).await?;
        ensure_edit(actor, &shipment.user_id, "Shipment")?;
        ensure_unlocked(&shipment)?;
        ensure_version(&shipment, version)?;
        if !shipment.documents.iter().any(|doc| doc.name == document) {
            return Err(AppError::NotFound(format!("Document '{document}'")));
        }

        let url = self.storage.store(id, document, file_name).await?;
        let shipment = self
            .mutate(actor, id, version, |shipment| {
                checklist::record_upload(&mut shipment.documents, document, url, status)?;
                Ok(())
            })
            .await?;
        tracing::info!(shipment_id = %id, %document, "document uploaded");
        Ok(shipment)
    }

    pub async fn verify_document(&self, actor: &User, id: &str, version: i64, document: &str) -> Result<Shipment> {
        ensure_staff(actor)?;
        let shipment = self
            .mutate(actor, id, version, |shipment| {
                checklist::verify(&mut shipment.documents, document)?;
                Ok(())
            })
            .await?;
        tracing::info!(shipment_id = %id, %document, verified_by = %actor.id, "document verified");
        Ok(shipment)
    }
}
