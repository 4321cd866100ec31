use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::extract::{AuthUser, Json, Path, Query},
    models::{
        client::ClientKind,
        response::{ApiResponse, with_status},
        shipment::{
            Computations, DocumentEntry, DocumentStatus, SectionUpdate, Shipment, ShipmentListItem,
        },
    },
    services::{
        shipment_service::{CargoInput, CreateShipment, FactInput, StageCompletion, WorkflowView},
        statement_service::render_statement,
    },
    state::AppState,
    workflow::ClientDetailsCheck,
};

/// Version of the shipment the caller last read
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: i64,
}

#[derive(Debug, Deserialize)]
pub struct SectionRequest {
    pub version: i64,
    pub update: SectionUpdate,
}

#[derive(Debug, Deserialize)]
pub struct DocumentsRequest {
    pub version: i64,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub version: i64,
    pub document: String,
    pub file_name: String,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub version: i64,
    pub document: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub version: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CargoRequest {
    pub version: i64,
    pub item: CargoInput,
}

#[derive(Debug, Deserialize)]
pub struct ComputationsRequest {
    pub version: i64,
    pub computations: Computations,
}

#[derive(Debug, Deserialize)]
pub struct FactRequest {
    pub version: i64,
    #[serde(flatten)]
    pub fact: FactInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub version: i64,
    pub kind: ClientKind,
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteStageRequest {
    pub version: i64,
}

pub async fn list_shipments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Vec<ShipmentListItem>>> {
    Ok(ApiResponse::ok(state.shipments.list(&user).await?))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateShipment>,
) -> Result<Response> {
    let shipment = state.shipments.create(&user, request).await?;
    Ok(with_status(StatusCode::CREATED, shipment))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<Shipment>> {
    Ok(ApiResponse::ok(state.shipments.get(&user, &id).await?))
}

pub async fn workflow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<WorkflowView>> {
    Ok(ApiResponse::ok(state.shipments.workflow_view(&user, &id).await?))
}

pub async fn update_section(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<SectionRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .update_section(&user, &id, request.version, request.update)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn replace_documents(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<DocumentsRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .replace_documents(&user, &id, request.version, request.documents)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn upload_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UploadRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .upload_document(
            &user,
            &id,
            request.version,
            &request.document,
            &request.file_name,
            request.status.unwrap_or(DocumentStatus::Draft),
        )
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn verify_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .verify_document(&user, &id, request.version, &request.document)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn add_note(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .add_note(&user, &id, request.version, request.content)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn upsert_cargo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<CargoRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .upsert_cargo(&user, &id, request.version, request.item)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn delete_cargo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, cargo_id)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .delete_cargo(&user, &id, query.version, &cargo_id)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn set_computations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<ComputationsRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .set_computations(&user, &id, request.version, request.computations)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn add_fact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<FactRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .add_fact(&user, &id, request.version, request.fact)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn delete_fact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, event_id)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .delete_fact(&user, &id, query.version, &event_id)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn link_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<LinkRequest>,
) -> Result<ApiResponse<Shipment>> {
    let shipment = state
        .shipments
        .link_client(&user, &id, request.version, request.kind, &request.client_id)
        .await?;
    Ok(ApiResponse::ok(shipment))
}

pub async fn client_details_check(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ClientDetailsCheck>> {
    Ok(ApiResponse::ok(
        state.shipments.check_client_details(&user, &id).await?,
    ))
}

pub async fn complete_stage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<CompleteStageRequest>,
) -> Result<ApiResponse<StageCompletion>> {
    Ok(ApiResponse::ok(
        state
            .shipments
            .complete_stage(&user, &id, request.version)
            .await?,
    ))
}

/// Printable statement of facts
pub async fn statement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let shipment = state.shipments.get(&user, &id).await?;
    Ok(Html(render_statement(&shipment, Utc::now())))
}
