use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::DbPool,
    error::{AppError, Result, conflict_on_unique},
    models::shipment::{Shipment, ShipmentRow, encode_column},
};

/// Encoded JSON columns of a shipment.
struct JsonColumns {
    consignee: String,
    exporter: String,
    details: String,
    documents: String,
    timeline: String,
    notes: String,
    cargo: String,
    computations: Option<String>,
    statement_of_facts: String,
}

impl JsonColumns {
    fn encode(shipment: &Shipment) -> Result<Self> {
        Ok(Self {
            consignee: encode_column(&shipment.consignee)?,
            exporter: encode_column(&shipment.exporter)?,
            details: encode_column(&shipment.shipment_details)?,
            documents: encode_column(&shipment.documents)?,
            timeline: encode_column(&shipment.timeline)?,
            notes: encode_column(&shipment.notes)?,
            cargo: encode_column(&shipment.cargo)?,
            computations: shipment
                .computations
                .as_ref()
                .map(encode_column)
                .transpose()?,
            statement_of_facts: encode_column(&shipment.statement_of_facts)?,
        })
    }
}

/// Shipment store; every write goes through the version check
#[derive(Clone)]
pub struct ShipmentStore {
    pool: DbPool,
}

impl ShipmentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a shipment by ID
    pub async fn get(&self, id: &str) -> Result<Shipment> {
        let row = sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Shipment".into()))?;

        Ok(Shipment::try_from(row)?)
    }

    /// List shipments newest first, optionally only those of one owner
    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<Shipment>> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query_as::<_, ShipmentRow>(
                    "SELECT * FROM shipments WHERE user_id = ? ORDER BY created_at DESC",
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(AppError::Database)?;

        rows.into_iter()
            .map(|row| Shipment::try_from(row).map_err(AppError::Json))
            .collect()
    }

    /// Persist `shipment` if nobody else wrote it since `shipment.version` was read.
    /// Returns the stored record with its new version.
    pub async fn save(&self, shipment: &Shipment) -> Result<Shipment> {
        let columns = JsonColumns::encode(shipment)?;

        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET status = ?, consignee_id = ?, exporter_id = ?,
                consignee_data = ?, exporter_data = ?, shipment_details = ?,
                documents_data = ?, timeline_data = ?, notes_data = ?, cargo_data = ?,
                computations = ?, statement_of_facts_data = ?,
                is_locked = ?, completion_date = ?,
                version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(shipment.status)
        .bind(&shipment.consignee_id)
        .bind(&shipment.exporter_id)
        .bind(&columns.consignee)
        .bind(&columns.exporter)
        .bind(&columns.details)
        .bind(&columns.documents)
        .bind(&columns.timeline)
        .bind(&columns.notes)
        .bind(&columns.cargo)
        .bind(&columns.computations)
        .bind(&columns.statement_of_facts)
        .bind(shipment.is_locked)
        .bind(shipment.completion_date)
        .bind(Utc::now())
        .bind(&shipment.id)
        .bind(shipment.version)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            // Either gone or someone else bumped the version first
            let current = self.get(&shipment.id).await?;
            tracing::warn!(
                shipment_id = %shipment.id,
                expected = shipment.version,
                found = current.version,
                "stale shipment write rejected"
            );
            return Err(AppError::Conflict(
                "Shipment was modified by someone else; reload and try again".into(),
            ));
        }

        self.get(&shipment.id).await
    }
}

/// Insert a new shipment row. A duplicate reference number is a conflict.
pub async fn insert_shipment(conn: &mut SqliteConnection, shipment: &Shipment) -> Result<()> {
    let columns = JsonColumns::encode(shipment)?;

    sqlx::query(
        r#"
        INSERT INTO shipments (id, reference_number, freight_type, status, user_id,
                               consignee_id, exporter_id, consignee_data, exporter_data,
                               shipment_details, documents_data, timeline_data, notes_data,
                               cargo_data, computations, statement_of_facts_data,
                               is_locked, completion_date, version, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&shipment.id)
    .bind(&shipment.reference_number)
    .bind(shipment.freight_type)
    .bind(shipment.status)
    .bind(&shipment.user_id)
    .bind(&shipment.consignee_id)
    .bind(&shipment.exporter_id)
    .bind(&columns.consignee)
    .bind(&columns.exporter)
    .bind(&columns.details)
    .bind(&columns.documents)
    .bind(&columns.timeline)
    .bind(&columns.notes)
    .bind(&columns.cargo)
    .bind(&columns.computations)
    .bind(&columns.statement_of_facts)
    .bind(shipment.is_locked)
    .bind(shipment.completion_date)
    .bind(shipment.version)
    .bind(shipment.created_at)
    .bind(shipment.updated_at)
    .execute(conn)
    .await
    .map_err(|e| conflict_on_unique(e, "Reference number already in use"))?;

    Ok(())
}
