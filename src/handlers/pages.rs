//! Page view models. Every route here sits behind [`page_gate`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    handlers::extract::{AuthUser, Path, SESSION_COOKIE, removal_cookie},
    models::{
        client::{Consignee, Exporter},
        response::ApiResponse,
        shipment::ShipmentListItem,
        user::{Role, UserDto},
    },
    services::{
        access::{RouteDecision, SessionState, route_decision},
        dashboard::{ShipmentStats, shipment_stats},
        shipment_service::WorkflowView,
    },
    state::AppState,
};

/// Redirects requests for pages the session may not open.
pub async fn page_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|token| !token.is_empty());

    let session = match token {
        None => SessionState::Missing,
        Some(token) => match state.auth.authenticate(token).await {
            Ok(user) => SessionState::Valid(user.role),
            Err(_) => SessionState::Invalid,
        },
    };

    let path = request.uri().path().to_owned();
    match route_decision(&path, session) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::Redirect(to) => {
            tracing::debug!(%path, redirect = to, "page redirected");
            if session == SessionState::Invalid {
                (jar.remove(removal_cookie()), Redirect::to(to)).into_response()
            } else {
                Redirect::to(to).into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

fn field(name: &'static str, label: &'static str, kind: &'static str, required: bool) -> FormField {
    FormField {
        name,
        label,
        kind,
        required,
        options: Vec::new(),
    }
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    pub title: &'static str,
    pub action: &'static str,
    pub fields: Vec<FormField>,
}

pub async fn sign_in_page() -> ApiResponse<FormPage> {
    ApiResponse::ok(FormPage {
        title: "Sign in",
        action: "/api/auth/sign-in",
        fields: vec![
            field("email", "Email", "email", true),
            field("password", "Password", "password", true),
        ],
    })
}

pub async fn sign_up_page() -> ApiResponse<FormPage> {
    let mut role = field("role", "Account type", "select", true);
    role.options = vec![Role::Broker.as_str(), Role::Client.as_str()];

    ApiResponse::ok(FormPage {
        title: "Create an account",
        action: "/api/auth/sign-up",
        fields: vec![
            field("name", "Full name", "text", true),
            field("email", "Email", "email", true),
            field("password", "Password", "password", true),
            role,
            field("companyName", "Company name", "text", false),
            field("companyAddress", "Company address", "text", false),
            field("contactNumber", "Contact number", "tel", false),
        ],
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub user: UserDto,
    pub shipments: ShipmentStats,
    pub consignees: i64,
    pub exporters: i64,
    pub recent: Vec<ShipmentListItem>,
}

const RECENT_SHIPMENTS: usize = 5;

pub async fn admin_overview(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<AdminOverview>> {
    let shipments = state.shipments.visible(&user).await?;
    let stats = shipment_stats(&shipments);
    let (consignees, exporters) = state.clients.totals().await?;
    let mut recent = state.shipments.list(&user).await?;
    recent.truncate(RECENT_SHIPMENTS);

    Ok(ApiResponse::ok(AdminOverview {
        user: user.into(),
        shipments: stats,
        consignees,
        exporters,
        recent,
    }))
}

#[derive(Debug, Serialize)]
pub struct ClientsPage {
    pub consignees: Vec<Consignee>,
    pub exporters: Vec<Exporter>,
}

pub async fn admin_clients(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<ClientsPage>> {
    Ok(ApiResponse::ok(ClientsPage {
        consignees: state.clients.list_consignees(&user, None).await?,
        exporters: state.clients.list_exporters(&user, None).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct ImportsPage {
    pub active: Vec<ShipmentListItem>,
    pub historical: Vec<ShipmentListItem>,
}

pub async fn admin_imports(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<ImportsPage>> {
    let (historical, active) = state
        .shipments
        .list(&user)
        .await?
        .into_iter()
        .partition(|item| item.completion_date.is_some());

    Ok(ApiResponse::ok(ImportsPage { active, historical }))
}

pub async fn admin_import_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<WorkflowView>> {
    Ok(ApiResponse::ok(state.shipments.workflow_view(&user, &id).await?))
}

pub async fn superadmin_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Vec<UserDto>>> {
    if user.role != Role::SuperAdmin {
        return Err(AppError::Forbidden("super admin only".into()));
    }
    let users = state.users.get_all_users().await?;
    Ok(ApiResponse::ok(users.into_iter().map(UserDto::from).collect()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub user: UserDto,
    pub has_clients: bool,
    pub shipments: Vec<ShipmentListItem>,
}

pub async fn client_overview(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<ClientOverview>> {
    let has_clients = state.users.has_clients(&user.id).await?;
    let shipments = state.shipments.list(&user).await?;

    Ok(ApiResponse::ok(ClientOverview {
        user: user.into(),
        has_clients,
        shipments,
    }))
}
