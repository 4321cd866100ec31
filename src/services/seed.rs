use crate::{
    error::Result,
    models::{
        client::{ConsigneeForm, ExporterForm},
        shipment::{ConsigneeSnapshot, ExporterSnapshot, FreightType, ShipmentDetails},
        user::{NewUser, Role},
    },
    services::{auth_service::hash_password, shipment_service::CreateShipment},
    state::AppState,
};

pub const DEMO_ADMIN_EMAIL: &str = "admin@clexcb.com";
const DEMO_ADMIN_PASSWORD: &str = "admin123";

/// Load a broker account with a few clients and one sea shipment.
/// Does nothing when the demo broker already exists.
pub async fn seed_demo_data(state: &AppState) -> Result<()> {
    if state.users.find_by_email(DEMO_ADMIN_EMAIL).await?.is_some() {
        tracing::debug!("demo data already present");
        return Ok(());
    }

    let admin = state
        .users
        .create_user(NewUser {
            email: DEMO_ADMIN_EMAIL.into(),
            name: "Admin User".into(),
            role: Role::Broker,
            password_hash: hash_password(DEMO_ADMIN_PASSWORD)?,
            company_name: Some("CLEX Customs Brokerage".into()),
            company_address: Some("Manila, Philippines".into()),
            contact_number: Some("+63 123 456 7890".into()),
        })
        .await?;

    let abc = state
        .clients
        .create_consignee(
            &admin,
            ConsigneeForm {
                name: "ABC Manufacturing Co.".into(),
                registered_name: "ABC Manufacturing Corporation".into(),
                business_address: "Makati City, Philippines".into(),
                tin: "123-456-789-000".into(),
                brn: "BRN123456".into(),
                contact_person: "John Doe".into(),
                contact_number: "+63 987 654 3210".into(),
                email: "john@abcmfg.com".into(),
            },
        )
        .await?;
    state
        .clients
        .create_consignee(
            &admin,
            ConsigneeForm {
                name: "XYZ Trading Inc.".into(),
                registered_name: "XYZ Trading Incorporated".into(),
                business_address: "Pasig City, Philippines".into(),
                tin: "987-654-321-000".into(),
                brn: "BRN987654".into(),
                contact_person: "Jane Smith".into(),
                contact_number: "+63 912 345 6789".into(),
                email: "jane@xyztrading.com".into(),
            },
        )
        .await?;

    let china = state
        .clients
        .create_exporter(
            &admin,
            ExporterForm {
                name: "China Exports Ltd.".into(),
                business_address: "Shanghai, China".into(),
                contact_person: "Li Wei".into(),
                contact_number: "+86 123 4567 8900".into(),
                email: "li.wei@chinaexports.com".into(),
            },
        )
        .await?;
    state
        .clients
        .create_exporter(
            &admin,
            ExporterForm {
                name: "Korea Trade Co.".into(),
                business_address: "Seoul, South Korea".into(),
                contact_person: "Kim Min-ji".into(),
                contact_number: "+82 10 1234 5678".into(),
                email: "kim.minji@koreatrade.co.kr".into(),
            },
        )
        .await?;

    let shipment = state
        .shipments
        .create(
            &admin,
            CreateShipment {
                freight_type: FreightType::Sea,
                consignee: ConsigneeSnapshot {
                    id: Some(abc.id),
                    ..Default::default()
                },
                exporter: ExporterSnapshot {
                    id: Some(china.id),
                    ..Default::default()
                },
                shipment_details: ShipmentDetails {
                    bl_number: "BL123456789".into(),
                    vessel_name: "EVER GIVEN".into(),
                    registry_number: "REG123456".into(),
                    voyage_number: "V2024001".into(),
                    container_number: "CONT123456".into(),
                    port_of_origin: "Shanghai, China".into(),
                    port_of_discharge: "Manila, Philippines".into(),
                    eta: "2024-03-15T08:00:00Z".into(),
                    description_of_goods: "Industrial machinery parts".into(),
                    volume: "40ft container".into(),
                    ..Default::default()
                },
            },
        )
        .await?;

    tracing::info!(
        admin = DEMO_ADMIN_EMAIL,
        reference = %shipment.reference_number,
        "demo data seeded"
    );
    Ok(())
}
