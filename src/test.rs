use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{
    config::test_config,
    db,
    error::AppError,
    handlers,
    models::{
        client::{ClientKind, ConsigneeForm, ConsigneePatch, ExporterForm},
        shipment::{
            Computations, ConsigneeSnapshot, DocumentStatus, ExporterSnapshot, FreightType,
            SectionUpdate, Shipment, ShipmentDetails,
        },
        user::{NewUser, Role, User},
    },
    services::shipment_service::{CargoInput, CreateShipment, FactInput},
    state::AppState,
    workflow::{Advance, Stage, StageStatus},
};

// Helper function to setup a fresh in-memory database and state
async fn setup_state() -> AppState {
    let config = test_config::config();
    let pool = db::init_db_pool(&config.database_url, config.max_connections)
        .await
        .expect("Failed to initialize database");
    AppState::new(config, pool)
}

// Helper function to create a test user without going through password hashing
async fn create_test_user(state: &AppState, email: &str, role: Role) -> User {
    state
        .users
        .create_user(NewUser {
            email: email.to_string(),
            name: format!("{} user", role.as_str()),
            role,
            password_hash: "unused".to_string(),
            company_name: None,
            company_address: None,
            contact_number: None,
        })
        .await
        .expect("Failed to create user")
}

fn complete_request(freight_type: FreightType) -> CreateShipment {
    CreateShipment {
        freight_type,
        consignee: ConsigneeSnapshot {
            name: "Acme Trading".into(),
            address: "12 Pier Rd, Manila".into(),
            tin: "123-456-789-000".into(),
            ..Default::default()
        },
        exporter: ExporterSnapshot {
            name: "Shenzhen Parts Co".into(),
            address: "88 Nanshan Ave".into(),
            ..Default::default()
        },
        shipment_details: ShipmentDetails {
            bl_number: "MSCU1234567".into(),
            flight_number: "PR301".into(),
            port_of_origin: "Shenzhen".into(),
            port_of_discharge: "Manila".into(),
            eta: "2024-03-15T08:00:00Z".into(),
            ..Default::default()
        },
    }
}

// Helper function to create a shipment owned by `user`
async fn create_test_shipment(state: &AppState, user: &User) -> Shipment {
    state
        .shipments
        .create(user, complete_request(FreightType::Sea))
        .await
        .expect("Failed to create shipment")
}

fn session_cookie(state: &AppState, user: &User) -> String {
    let token = state.auth.issue_token(user).expect("Failed to issue token");
    format!("session={token}")
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("Router failed")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod user_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let state = setup_state().await;
        create_test_user(&state, "dup@clex.test", Role::Broker).await;

        let err = state
            .users
            .create_user(NewUser {
                email: "dup@clex.test".into(),
                name: "Again".into(),
                role: Role::Client,
                password_hash: "x".into(),
                company_name: None,
                company_address: None,
                contact_number: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_has_clients_tracks_ownership() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        assert!(!state.users.has_clients(&broker.id).await.unwrap());

        state
            .clients
            .create_exporter(
                &broker,
                ExporterForm {
                    name: "Korea Trade Co.".into(),
                    business_address: "Seoul".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(state.users.has_clients(&broker.id).await.unwrap());
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;
    use crate::models::user::{SetupRequest, SignInRequest, SignUpRequest};

    #[tokio::test]
    async fn test_sign_up_with_company_creates_consignee() {
        let state = setup_state().await;
        let session = state
            .auth
            .sign_up(SignUpRequest {
                email: "Owner@Importer.test".into(),
                password: "longenough".into(),
                name: "Owner".into(),
                role: Role::Client,
                company_name: Some("Importer Inc.".into()),
                company_address: Some("Cebu".into()),
                contact_number: None,
            })
            .await
            .unwrap();

        assert_eq!(session.response.role, Role::Client);
        assert_eq!(session.response.redirect_to, "/client/overview");
        assert!(session.response.has_clients);
        assert_eq!(session.response.user.email, "owner@importer.test");

        let user = state.auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.name, "Owner");
    }

    #[tokio::test]
    async fn test_failed_company_insert_leaves_no_account() {
        let state = setup_state().await;
        sqlx::query("DROP TABLE consignees")
            .execute(&state.pool)
            .await
            .unwrap();

        let request = || SignUpRequest {
            email: "owner@importer.test".into(),
            password: "longenough".into(),
            name: "Owner".into(),
            role: Role::Client,
            company_name: Some("Importer Inc.".into()),
            company_address: None,
            contact_number: None,
        };
        let err = state.auth.sign_up(request()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        // nothing half-written, so the same email is still free
        assert!(
            state
                .users
                .find_by_email("owner@importer.test")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sign_up_cannot_claim_super_admin() {
        let state = setup_state().await;
        let err = state
            .auth
            .sign_up(SignUpRequest {
                email: "x@y.test".into(),
                password: "longenough".into(),
                name: "X".into(),
                role: Role::SuperAdmin,
                company_name: None,
                company_address: None,
                contact_number: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let state = setup_state().await;
        state
            .auth
            .setup_super_admin(SetupRequest {
                email: "root@clex.test".into(),
                password: "rootpassword".into(),
                name: "Root".into(),
            })
            .await
            .unwrap();

        let ok = state
            .auth
            .sign_in(SignInRequest {
                email: "root@clex.test".into(),
                password: "rootpassword".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.response.redirect_to, "/admin/overview");

        let err = state
            .auth
            .sign_in(SignInRequest {
                email: "root@clex.test".into(),
                password: "wrongpassword".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let again = state
            .auth
            .setup_super_admin(SetupRequest {
                email: "second@clex.test".into(),
                password: "rootpassword".into(),
                name: "Second".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_forged_token_is_rejected() {
        let state = setup_state().await;
        let err = state.auth.authenticate("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AppError::Token(_)));
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;

    fn consignee_form(name: &str, tin: &str) -> ConsigneeForm {
        ConsigneeForm {
            name: name.into(),
            business_address: "Makati City".into(),
            tin: tin.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_consignee_validation_and_duplicates() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;

        let bad_tin = state
            .clients
            .create_consignee(&broker, consignee_form("ABC", "123456789"))
            .await
            .unwrap_err();
        assert!(matches!(bad_tin, AppError::Validation(_)));

        let created = state
            .clients
            .create_consignee(&broker, consignee_form("ABC Manufacturing", "123-456-789-000"))
            .await
            .unwrap();
        assert_eq!(created.registered_name, "ABC Manufacturing");
        assert!(created.is_active);

        let same_tin = state
            .clients
            .create_consignee(&broker, consignee_form("Other Name", "123-456-789-000"))
            .await
            .unwrap_err();
        assert!(matches!(same_tin, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        for (name, tin) in [("ABC Manufacturing", "111-111-111"), ("XYZ Trading", "222-222-222")] {
            state
                .clients
                .create_consignee(&broker, consignee_form(name, tin))
                .await
                .unwrap();
        }

        let found = state
            .clients
            .list_consignees(&broker, Some("xyz"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "XYZ Trading");

        let by_tin = state
            .clients
            .list_consignees(&broker, Some("111-"))
            .await
            .unwrap();
        assert_eq!(by_tin[0].name, "ABC Manufacturing");
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        for name in ["ABC Manufacturing", "A_B Supplies", "100% Cotton Imports"] {
            state
                .clients
                .create_consignee(&broker, consignee_form(name, ""))
                .await
                .unwrap();
        }

        let underscore = state
            .clients
            .list_consignees(&broker, Some("_"))
            .await
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].name, "A_B Supplies");

        let percent = state
            .clients
            .list_consignees(&broker, Some("%"))
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "100% Cotton Imports");
    }

    #[tokio::test]
    async fn test_client_role_cannot_create_or_list() {
        let state = setup_state().await;
        let client = create_test_user(&state, "c@clex.test", Role::Client).await;

        let err = state
            .clients
            .create_consignee(&client, consignee_form("Mine", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = state.clients.list_exporters(&client, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_brokers_edit_only_their_own_records() {
        let state = setup_state().await;
        let owner = create_test_user(&state, "owner@clex.test", Role::Broker).await;
        let other = create_test_user(&state, "other@clex.test", Role::Broker).await;
        let client = create_test_user(&state, "c@clex.test", Role::Client).await;
        let consignee = state
            .clients
            .create_consignee(&owner, consignee_form("ABC", ""))
            .await
            .unwrap();

        let patch = || ConsigneePatch {
            contact_person: Some("Maria".into()),
            ..Default::default()
        };

        let err = state
            .clients
            .update_consignee(&other, &consignee.id, patch())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // clients do not learn that the record exists
        let err = state
            .clients
            .get_consignee(&client, &consignee.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = state
            .clients
            .update_consignee(&owner, &consignee.id, patch())
            .await
            .unwrap();
        assert_eq!(updated.contact_person, "Maria");
        assert_eq!(updated.name, "ABC");
    }
}

#[cfg(test)]
mod shipment_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_initializes_workflow() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;

        assert_eq!(shipment.status, Stage::ClientDetails);
        assert!(shipment.timeline.is_empty());
        assert_eq!(shipment.documents.len(), 9);
        assert_eq!(shipment.documents[0].name, "Bill of Lading");
        assert_eq!(shipment.version, 1);
        assert!(shipment.reference_number.starts_with("CLEX-IMS"));
        assert!(shipment.consignee_id.is_some());
        assert!(shipment.exporter_id.is_some());
        assert_eq!(shipment.consignee.id, shipment.consignee_id);

        let detail = state
            .clients
            .get_consignee(&broker, shipment.consignee_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(detail.shipments.len(), 1);
        assert_eq!(detail.shipments[0].reference_number, shipment.reference_number);
    }

    #[tokio::test]
    async fn test_create_reuses_existing_client_records() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let first = create_test_shipment(&state, &broker).await;
        let second = create_test_shipment(&state, &broker).await;

        assert_eq!(first.consignee_id, second.consignee_id);
        assert_eq!(first.exporter_id, second.exporter_id);
        assert_eq!(state.clients.totals().await.unwrap(), (1, 1));
    }

    #[tokio::test]
    async fn test_create_by_id_fills_snapshot_from_record() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let consignee = state
            .clients
            .create_consignee(
                &broker,
                ConsigneeForm {
                    name: "XYZ Trading Inc.".into(),
                    business_address: "Pasig City".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut request = complete_request(FreightType::Air);
        request.consignee = ConsigneeSnapshot {
            id: Some(consignee.id.clone()),
            ..Default::default()
        };
        let shipment = state.shipments.create(&broker, request).await.unwrap();

        assert_eq!(shipment.consignee.name, "XYZ Trading Inc.");
        assert_eq!(shipment.consignee.address, "Pasig City");
        assert_eq!(shipment.documents[0].name, "Airway Bill");
    }

    #[tokio::test]
    async fn test_snapshot_is_not_rewritten_by_record_edits() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;

        state
            .clients
            .update_consignee(
                &broker,
                shipment.consignee_id.as_deref().unwrap(),
                ConsigneePatch {
                    business_address: Some("New HQ, Taguig".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = state.shipments.get(&broker, &shipment.id).await.unwrap();
        assert_eq!(reloaded.consignee.address, "12 Pier Rd, Manila");
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;

        let updated = state
            .shipments
            .update_section(
                &broker,
                &shipment.id,
                shipment.version,
                SectionUpdate::Schedule {
                    eta: "2024-04-01".into(),
                    ata: String::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, shipment.version + 1);
        assert_eq!(updated.shipment_details.eta, "2024-04-01");
        // other sections untouched
        assert_eq!(updated.shipment_details.bl_number, "MSCU1234567");

        let err = state
            .shipments
            .add_note(&broker, &shipment.id, shipment.version, "late write".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let reloaded = state.shipments.get(&broker, &shipment.id).await.unwrap();
        assert!(reloaded.notes.is_empty());
    }

    #[tokio::test]
    async fn test_walk_to_delivered_and_stop() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let mut shipment = create_test_shipment(&state, &broker).await;

        for expected in Stage::ALL.iter().skip(1) {
            let done = state
                .shipments
                .complete_stage(&broker, &shipment.id, shipment.version)
                .await
                .unwrap();
            assert!(matches!(done.advance, Advance::Advanced { to, .. } if to == *expected));
            shipment = done.shipment;
            assert_eq!(shipment.status, *expected);
        }
        assert_eq!(shipment.timeline.len(), 8);
        assert!(shipment.completion_date.is_none());

        let finished = state
            .shipments
            .complete_stage(&broker, &shipment.id, shipment.version)
            .await
            .unwrap();
        assert_eq!(finished.advance, Advance::Finished);
        let shipment = finished.shipment;
        assert_eq!(shipment.status, Stage::Delivered);
        assert_eq!(shipment.timeline.len(), 9);
        assert!(shipment.completion_date.is_some());
        assert!(shipment.is_locked);

        let again = state
            .shipments
            .complete_stage(&broker, &shipment.id, shipment.version)
            .await
            .unwrap();
        assert_eq!(again.advance, Advance::AlreadyFinished);
        assert_eq!(again.shipment.timeline.len(), 9);
        assert_eq!(again.shipment.version, shipment.version);

        let view = state
            .shipments
            .workflow_view(&broker, &shipment.id)
            .await
            .unwrap();
        assert!(view.stages.iter().all(|c| c.status == StageStatus::Complete));

        let err = state
            .shipments
            .add_note(&broker, &shipment.id, shipment.version, "after close".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_upload_and_verify_documents() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;

        let err = state
            .shipments
            .verify_document(&broker, &shipment.id, shipment.version, "Packing List")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let uploaded = state
            .shipments
            .upload_document(
                &broker,
                &shipment.id,
                shipment.version,
                "Packing List",
                "packing.pdf",
                DocumentStatus::Draft,
            )
            .await
            .unwrap();
        let doc = uploaded
            .documents
            .iter()
            .find(|d| d.name == "Packing List")
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.files.len(), 1);
        assert!(
            doc.files[0].starts_with(&format!("/simulated-uploads/{}/Packing List-", shipment.id))
        );

        let verified = state
            .shipments
            .verify_document(&broker, &shipment.id, uploaded.version, "Packing List")
            .await
            .unwrap();
        assert!(
            verified
                .documents
                .iter()
                .find(|d| d.name == "Packing List")
                .unwrap()
                .is_verified
        );

        let err = state
            .shipments
            .upload_document(
                &broker,
                &shipment.id,
                verified.version,
                "Unknown Paper",
                "x.pdf",
                DocumentStatus::Draft,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cargo_computations_and_facts() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let s = create_test_shipment(&state, &broker).await;

        let s = state
            .shipments
            .upsert_cargo(
                &broker,
                &s.id,
                s.version,
                CargoInput {
                    id: None,
                    description: "Pump housings".into(),
                    invoice_value: 1500.0,
                    gross_weight: 200.0,
                    net_weight: 180.0,
                    quantity: 12.0,
                    hs_code: "8413.91".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(s.cargo.len(), 1);
        let cargo_id = s.cargo[0].id.clone();

        let s = state
            .shipments
            .upsert_cargo(
                &broker,
                &s.id,
                s.version,
                CargoInput {
                    id: Some(cargo_id.clone()),
                    description: "Pump housings, cast iron".into(),
                    invoice_value: 1600.0,
                    gross_weight: 200.0,
                    net_weight: 180.0,
                    quantity: 12.0,
                    hs_code: "8413.91".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(s.cargo.len(), 1);
        assert_eq!(s.cargo[0].invoice_value, 1600.0);

        let s = state
            .shipments
            .set_computations(
                &broker,
                &s.id,
                s.version,
                Computations {
                    dutiable_value: 1600.0,
                    customs_duty: 160.0,
                    vat: 211.2,
                    other_charges: 28.8,
                    total_payable: 0.0,
                },
            )
            .await
            .unwrap();
        let total = s.computations.as_ref().unwrap().total_payable;
        assert!((total - 400.0).abs() < 1e-9);

        let s = state
            .shipments
            .add_fact(
                &broker,
                &s.id,
                s.version,
                FactInput {
                    description: "Vessel berthed".into(),
                    documents: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(s.statement_of_facts.len(), 1);
        assert_eq!(s.statement_of_facts[0].created_by.id, broker.id);
        let event_id = s.statement_of_facts[0].id.clone();

        let s = state
            .shipments
            .delete_fact(&broker, &s.id, s.version, &event_id)
            .await
            .unwrap();
        assert!(s.statement_of_facts.is_empty());

        let s = state
            .shipments
            .delete_cargo(&broker, &s.id, s.version, &cargo_id)
            .await
            .unwrap();
        assert!(s.cargo.is_empty());

        let err = state
            .shipments
            .delete_cargo(&broker, &s.id, s.version, &cargo_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_link_client_keeps_populated_snapshot() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;
        let other = state
            .clients
            .create_consignee(
                &broker,
                ConsigneeForm {
                    name: "Other Importer".into(),
                    business_address: "Davao".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let linked = state
            .shipments
            .link_client(
                &broker,
                &shipment.id,
                shipment.version,
                ClientKind::Consignee,
                &other.id,
            )
            .await
            .unwrap();
        assert_eq!(linked.consignee_id.as_deref(), Some(other.id.as_str()));
        assert_eq!(linked.consignee.name, "Acme Trading");
    }

    #[tokio::test]
    async fn test_client_sees_only_own_shipments() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let client = create_test_user(&state, "c@clex.test", Role::Client).await;
        let shipment = create_test_shipment(&state, &broker).await;

        assert!(state.shipments.list(&client).await.unwrap().is_empty());
        let err = state.shipments.get(&client, &shipment.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = state
            .shipments
            .create(&client, complete_request(FreightType::Sea))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let listed = state.shipments.list(&broker).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].consignee, "Acme Trading");
        assert_eq!(listed[0].bl_number.as_deref(), Some("MSCU1234567"));
        assert_eq!(listed[0].created_by.as_ref().unwrap().id, broker.id);
    }

    #[tokio::test]
    async fn test_duplicate_reference_number_is_conflict() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let shipment = create_test_shipment(&state, &broker).await;

        let mut copy = shipment.clone();
        copy.id = uuid::Uuid::new_v4().to_string();
        copy.updated_at = Utc::now();

        let mut conn = state.pool.acquire().await.unwrap();
        let err = db::shipment_store::insert_shipment(&mut conn, &copy)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}

#[cfg(test)]
mod router_tests {
    use super::*;

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_sets_session_cookie() {
        let state = setup_state().await;
        let response = send(
            handlers::app(state.clone()),
            post_json(
                "/api/auth/sign-up",
                None,
                json!({
                    "email": "broker@clex.test",
                    "password": "brokerpass",
                    "name": "Rhea",
                    "role": "BROKER"
                }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["redirectTo"], "/admin/overview");
        assert_eq!(body["data"]["hasClients"], false);

        let token_pair = cookie.split(';').next().unwrap();
        let me = send(handlers::app(state), get("/api/auth/me", Some(token_pair))).await;
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(body_json(me).await["data"]["name"], "Rhea");
    }

    #[tokio::test]
    async fn test_api_without_session_is_unauthorized() {
        let state = setup_state().await;
        let response = send(handlers::app(state), get("/api/shipments", None)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_requests_keep_error_envelope() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let cookie = session_cookie(&state, &broker);

        let bad_variant = send(
            handlers::app(state.clone()),
            post_json("/api/shipments", Some(&cookie), json!({ "freightType": "boat" })),
        )
        .await;
        assert_eq!(bad_variant.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            bad_variant.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_json(bad_variant).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("freightType"));

        let not_json = Request::builder()
            .method("POST")
            .uri("/api/auth/sign-in")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let body = body_json(send(handlers::app(state.clone()), not_json).await).await;
        assert_eq!(body["success"], false);

        let bad_query = Request::builder()
            .method("DELETE")
            .uri("/api/shipments/some-id/cargo/c1?version=latest")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(handlers::app(state), bad_query).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_page_gate_redirects() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let client = create_test_user(&state, "c@clex.test", Role::Client).await;
        let broker_cookie = session_cookie(&state, &broker);
        let client_cookie = session_cookie(&state, &client);

        let anonymous = send(handlers::app(state.clone()), get("/admin/overview", None)).await;
        assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&anonymous), "/sign-in");

        let forged = send(
            handlers::app(state.clone()),
            get("/client/overview", Some("session=forged")),
        )
        .await;
        assert_eq!(location(&forged), "/sign-in");

        let broker_in_superadmin = send(
            handlers::app(state.clone()),
            get("/admin/superadmin/users", Some(&broker_cookie)),
        )
        .await;
        assert_eq!(location(&broker_in_superadmin), "/admin/overview");

        let client_on_sign_in = send(
            handlers::app(state.clone()),
            get("/sign-in", Some(&client_cookie)),
        )
        .await;
        assert_eq!(location(&client_on_sign_in), "/client/overview");

        let allowed = send(
            handlers::app(state),
            get("/admin/overview", Some(&broker_cookie)),
        )
        .await;
        assert_eq!(allowed.status(), StatusCode::OK);
        let body = body_json(allowed).await;
        assert_eq!(body["data"]["shipments"]["byStage"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_shipment_workflow_over_http() {
        let state = setup_state().await;
        let broker = create_test_user(&state, "b@clex.test", Role::Broker).await;
        let cookie = session_cookie(&state, &broker);

        let created = send(
            handlers::app(state.clone()),
            post_json(
                "/api/shipments",
                Some(&cookie),
                json!({
                    "freightType": "sea",
                    "consignee": { "name": "Acme Trading", "address": "12 Pier Rd" },
                    "exporter": { "name": "Shenzhen Parts Co", "address": "88 Nanshan Ave" },
                    "shipmentDetails": { "port_of_origin": "Shenzhen", "port_of_discharge": "Manila" }
                }),
            ),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body_json(created).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["status"], "CLIENT_DETAILS");
        assert_eq!(body["data"]["version"], 1);

        let check = send(
            handlers::app(state.clone()),
            get(&format!("/api/shipments/{id}/client-details"), Some(&cookie)),
        )
        .await;
        let check = body_json(check).await;
        assert_eq!(check["data"]["isComplete"], false);
        assert_eq!(check["data"]["missingFields"], json!(["shipmentDetails"]));

        let advanced = send(
            handlers::app(state.clone()),
            post_json(
                &format!("/api/shipments/{id}/complete-stage"),
                Some(&cookie),
                json!({ "version": 1 }),
            ),
        )
        .await;
        assert_eq!(advanced.status(), StatusCode::OK);
        let advanced = body_json(advanced).await;
        assert_eq!(advanced["data"]["outcome"], "advanced");
        assert_eq!(advanced["data"]["shipment"]["status"], "DOCUMENT_COLLECTION");

        let stale = send(
            handlers::app(state.clone()),
            post_json(
                &format!("/api/shipments/{id}/complete-stage"),
                Some(&cookie),
                json!({ "version": 1 }),
            ),
        )
        .await;
        assert_eq!(stale.status(), StatusCode::CONFLICT);

        let page = send(
            handlers::app(state.clone()),
            get(&format!("/admin/services/import/{id}"), Some(&cookie)),
        )
        .await;
        let page = body_json(page).await;
        assert_eq!(page["data"]["stageLabel"], "Document Collection & Verification");
        assert_eq!(page["data"]["stages"][0]["status"], "complete");
        assert_eq!(page["data"]["stages"][1]["status"], "in_progress");
        assert_eq!(page["data"]["documents"][0]["indicator"]["color"], "gray");

        let statement = send(
            handlers::app(state),
            get(&format!("/api/shipments/{id}/statement"), Some(&cookie)),
        )
        .await;
        assert_eq!(statement.status(), StatusCode::OK);
        let bytes = to_bytes(statement.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Statement of Facts"));
        assert!(html.contains("Acme Trading"));
    }

    #[tokio::test]
    async fn test_demo_seed_is_idempotent() {
        let state = setup_state().await;
        crate::services::seed::seed_demo_data(&state).await.unwrap();
        crate::services::seed::seed_demo_data(&state).await.unwrap();

        assert_eq!(state.clients.totals().await.unwrap(), (2, 2));
        let admin = state
            .users
            .find_by_email(crate::services::seed::DEMO_ADMIN_EMAIL)
            .await
            .unwrap()
            .unwrap();
        let shipments = state.shipments.list(&admin).await.unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].consignee, "ABC Manufacturing Co.");
    }
}
