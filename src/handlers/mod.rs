use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod clients;
pub mod extract;
pub mod pages;
pub mod shipments;

fn page_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(pages::sign_in_page))
        .route("/sign-up", get(pages::sign_up_page))
        .route("/admin/overview", get(pages::admin_overview))
        .route("/admin/clients", get(pages::admin_clients))
        .route("/admin/services/import", get(pages::admin_imports))
        .route("/admin/services/import/{id}", get(pages::admin_import_detail))
        .route("/admin/superadmin/users", get(pages::superadmin_users))
        .route("/client/overview", get(pages::client_overview))
        .route_layer(middleware::from_fn_with_state(state, pages::page_gate))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/me", get(auth::me))
        .route("/auth/setup", post(auth::setup))
        .route(
            "/consignees",
            get(clients::list_consignees).post(clients::create_consignee),
        )
        .route(
            "/consignees/{id}",
            get(clients::get_consignee).patch(clients::update_consignee),
        )
        .route(
            "/consignees/{id}/documents",
            post(clients::add_consignee_document),
        )
        .route(
            "/exporters",
            get(clients::list_exporters).post(clients::create_exporter),
        )
        .route(
            "/exporters/{id}",
            get(clients::get_exporter).patch(clients::update_exporter),
        )
        .route(
            "/shipments",
            get(shipments::list_shipments).post(shipments::create_shipment),
        )
        .route("/shipments/{id}", get(shipments::get_shipment))
        .route("/shipments/{id}/workflow", get(shipments::workflow))
        .route("/shipments/{id}/sections", put(shipments::update_section))
        .route("/shipments/{id}/documents", put(shipments::replace_documents))
        .route(
            "/shipments/{id}/documents/upload",
            post(shipments::upload_document),
        )
        .route(
            "/shipments/{id}/documents/verify",
            post(shipments::verify_document),
        )
        .route("/shipments/{id}/notes", post(shipments::add_note))
        .route("/shipments/{id}/cargo", put(shipments::upsert_cargo))
        .route(
            "/shipments/{id}/cargo/{cargo_id}",
            delete(shipments::delete_cargo),
        )
        .route(
            "/shipments/{id}/computations",
            put(shipments::set_computations),
        )
        .route("/shipments/{id}/facts", post(shipments::add_fact))
        .route(
            "/shipments/{id}/facts/{event_id}",
            delete(shipments::delete_fact),
        )
        .route("/shipments/{id}/link", post(shipments::link_client))
        .route(
            "/shipments/{id}/client-details",
            get(shipments::client_details_check),
        )
        .route(
            "/shipments/{id}/complete-stage",
            post(shipments::complete_stage),
        )
        .route("/shipments/{id}/statement", get(shipments::statement))
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "CLEX brokerage server is running." }))
        .merge(page_routes(state.clone()))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
