use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::extract::{AuthUser, Json, Path, Query},
    models::{
        client::{
            Consignee, ConsigneeDetail, ConsigneeForm, ConsigneePatch, Exporter, ExporterDetail,
            ExporterForm, ExporterPatch, NewConsigneeDocument,
        },
        response::{ApiResponse, with_status},
    },
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn list_consignees(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<ApiResponse<Vec<Consignee>>> {
    let consignees = state
        .clients
        .list_consignees(&user, query.q.as_deref())
        .await?;
    Ok(ApiResponse::ok(consignees))
}

pub async fn create_consignee(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(form): Json<ConsigneeForm>,
) -> Result<Response> {
    let consignee = state.clients.create_consignee(&user, form).await?;
    Ok(with_status(StatusCode::CREATED, consignee))
}

pub async fn get_consignee(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ConsigneeDetail>> {
    Ok(ApiResponse::ok(state.clients.get_consignee(&user, &id).await?))
}

pub async fn update_consignee(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<ConsigneePatch>,
) -> Result<ApiResponse<Consignee>> {
    Ok(ApiResponse::ok(
        state.clients.update_consignee(&user, &id, patch).await?,
    ))
}

pub async fn add_consignee_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(document): Json<NewConsigneeDocument>,
) -> Result<Response> {
    let document = state
        .clients
        .add_consignee_document(&user, &id, document)
        .await?;
    Ok(with_status(StatusCode::CREATED, document))
}

pub async fn list_exporters(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<ApiResponse<Vec<Exporter>>> {
    let exporters = state
        .clients
        .list_exporters(&user, query.q.as_deref())
        .await?;
    Ok(ApiResponse::ok(exporters))
}

pub async fn create_exporter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(form): Json<ExporterForm>,
) -> Result<Response> {
    let exporter = state.clients.create_exporter(&user, form).await?;
    Ok(with_status(StatusCode::CREATED, exporter))
}

pub async fn get_exporter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ExporterDetail>> {
    Ok(ApiResponse::ok(state.clients.get_exporter(&user, &id).await?))
}

pub async fn update_exporter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<ExporterPatch>,
) -> Result<ApiResponse<Exporter>> {
    Ok(ApiResponse::ok(
        state.clients.update_exporter(&user, &id, patch).await?,
    ))
}
