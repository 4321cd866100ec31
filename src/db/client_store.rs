use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::client::{
        Consignee, ConsigneeDocument, ConsigneeForm, Exporter, ExporterForm,
        NewConsigneeDocument, ShipmentSummary,
    },
};

/// Consignee and exporter records
#[derive(Clone)]
pub struct ClientStore {
    pool: DbPool,
}

/// Substring pattern for `LIKE ... ESCAPE '\'`; wildcards typed by the user match literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::from("%");
    for c in search.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl ClientStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List consignees, optionally filtered by name or TIN
    pub async fn list_consignees(&self, search: Option<&str>) -> Result<Vec<Consignee>> {
        let consignees = match search.filter(|s| !s.trim().is_empty()) {
            Some(search) => {
                let pattern = like_pattern(search);
                sqlx::query_as::<_, Consignee>(
                    r#"
                    SELECT * FROM consignees
                    WHERE LOWER(name) LIKE ? ESCAPE '\' OR LOWER(tin) LIKE ? ESCAPE '\'
                    ORDER BY name
                    "#,
                )
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Consignee>("SELECT * FROM consignees ORDER BY name")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(consignees)
    }

    /// Get a consignee by ID
    pub async fn get_consignee(&self, id: &str) -> Result<Consignee> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        find_consignee(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Consignee".into()))
    }

    pub async fn consignee_taken(&self, owner: &str, name: &str, tin: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        Ok(find_consignee_by_identity(&mut conn, owner, tin, name)
            .await?
            .is_some())
    }

    pub async fn create_consignee(&self, owner: &str, form: &ConsigneeForm) -> Result<Consignee> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        insert_consignee(&mut conn, owner, form).await
    }

    /// Write back every editable column of a consignee
    pub async fn update_consignee(&self, consignee: &Consignee) -> Result<Consignee> {
        sqlx::query(
            r#"
            UPDATE consignees
            SET name = ?, registered_name = ?, business_address = ?, tin = ?, brn = ?,
                contact_person = ?, contact_number = ?, email = ?, is_active = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&consignee.name)
        .bind(&consignee.registered_name)
        .bind(&consignee.business_address)
        .bind(&consignee.tin)
        .bind(&consignee.brn)
        .bind(&consignee.contact_person)
        .bind(&consignee.contact_number)
        .bind(&consignee.email)
        .bind(consignee.is_active)
        .bind(Utc::now())
        .bind(&consignee.id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        self.get_consignee(&consignee.id).await
    }

    pub async fn consignee_documents(&self, consignee_id: &str) -> Result<Vec<ConsigneeDocument>> {
        let documents = sqlx::query_as::<_, ConsigneeDocument>(
            "SELECT * FROM consignee_documents WHERE consignee_id = ? ORDER BY uploaded_at",
        )
        .bind(consignee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(documents)
    }

    pub async fn add_consignee_document(
        &self,
        consignee_id: &str,
        document: &NewConsigneeDocument,
    ) -> Result<ConsigneeDocument> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO consignee_documents (id, consignee_id, name, file_url, uploaded_at, is_verified)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&id)
        .bind(consignee_id)
        .bind(&document.name)
        .bind(&document.file_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        sqlx::query_as::<_, ConsigneeDocument>("SELECT * FROM consignee_documents WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    /// List exporters, optionally filtered by name or email
    pub async fn list_exporters(&self, search: Option<&str>) -> Result<Vec<Exporter>> {
        let exporters = match search.filter(|s| !s.trim().is_empty()) {
            Some(search) => {
                let pattern = like_pattern(search);
                sqlx::query_as::<_, Exporter>(
                    r#"
                    SELECT * FROM exporters
                    WHERE LOWER(name) LIKE ? ESCAPE '\' OR LOWER(email) LIKE ? ESCAPE '\'
                    ORDER BY name
                    "#,
                )
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Exporter>("SELECT * FROM exporters ORDER BY name")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(exporters)
    }

    /// Get an exporter by ID
    pub async fn get_exporter(&self, id: &str) -> Result<Exporter> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        find_exporter(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exporter".into()))
    }

    pub async fn exporter_taken(&self, owner: &str, name: &str, email: &str) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM exporters
            WHERE user_id = ? AND (LOWER(name) = LOWER(?) OR (? <> '' AND LOWER(email) = LOWER(?)))
            "#,
        )
        .bind(owner)
        .bind(name.trim())
        .bind(email.trim())
        .bind(email.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    pub async fn create_exporter(&self, owner: &str, form: &ExporterForm) -> Result<Exporter> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        insert_exporter(&mut conn, owner, form).await
    }

    pub async fn update_exporter(&self, exporter: &Exporter) -> Result<Exporter> {
        sqlx::query(
            r#"
            UPDATE exporters
            SET name = ?, business_address = ?, contact_person = ?, contact_number = ?,
                email = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&exporter.name)
        .bind(&exporter.business_address)
        .bind(&exporter.contact_person)
        .bind(&exporter.contact_number)
        .bind(&exporter.email)
        .bind(exporter.is_active)
        .bind(Utc::now())
        .bind(&exporter.id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        self.get_exporter(&exporter.id).await
    }

    /// Shipments linked to a consignee, newest first
    pub async fn consignee_shipments(&self, consignee_id: &str) -> Result<Vec<ShipmentSummary>> {
        sqlx::query_as::<_, ShipmentSummary>(
            r#"
            SELECT id, reference_number, status, created_at FROM shipments
            WHERE consignee_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(consignee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Shipments linked to an exporter, newest first
    pub async fn exporter_shipments(&self, exporter_id: &str) -> Result<Vec<ShipmentSummary>> {
        sqlx::query_as::<_, ShipmentSummary>(
            r#"
            SELECT id, reference_number, status, created_at FROM shipments
            WHERE exporter_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(exporter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn totals(&self) -> Result<(i64, i64)> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM consignees), (SELECT COUNT(*) FROM exporters)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(totals)
    }
}

// Connection-level helpers, shared by the pool methods above and the
// shipment creation transaction.

pub async fn find_consignee(conn: &mut SqliteConnection, id: &str) -> Result<Option<Consignee>> {
    sqlx::query_as::<_, Consignee>("SELECT * FROM consignees WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)
}

/// Owner's consignee with the same TIN (when given) or the same name.
pub async fn find_consignee_by_identity(
    conn: &mut SqliteConnection,
    owner: &str,
    tin: &str,
    name: &str,
) -> Result<Option<Consignee>> {
    sqlx::query_as::<_, Consignee>(
        r#"
        SELECT * FROM consignees
        WHERE user_id = ? AND ((? <> '' AND tin = ?) OR LOWER(name) = LOWER(?))
        ORDER BY (tin = ?) DESC
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(tin.trim())
    .bind(tin.trim())
    .bind(name.trim())
    .bind(tin.trim())
    .fetch_optional(conn)
    .await
    .map_err(AppError::Database)
}

pub async fn insert_consignee(
    conn: &mut SqliteConnection,
    owner: &str,
    form: &ConsigneeForm,
) -> Result<Consignee> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let registered_name = if form.registered_name.trim().is_empty() {
        form.name.trim()
    } else {
        form.registered_name.trim()
    };

    sqlx::query(
        r#"
        INSERT INTO consignees (id, name, registered_name, business_address, tin, brn,
                                contact_person, contact_number, email, is_active, user_id,
                                created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(form.name.trim())
    .bind(registered_name)
    .bind(form.business_address.trim())
    .bind(form.tin.trim())
    .bind(form.brn.trim())
    .bind(form.contact_person.trim())
    .bind(form.contact_number.trim())
    .bind(form.email.trim())
    .bind(owner)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    find_consignee(conn, &id)
        .await?
        .ok_or_else(|| AppError::Internal("inserted consignee vanished".into()))
}

pub async fn find_exporter(conn: &mut SqliteConnection, id: &str) -> Result<Option<Exporter>> {
    sqlx::query_as::<_, Exporter>("SELECT * FROM exporters WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)
}

/// Owner's exporter with the same name and address.
pub async fn find_exporter_by_identity(
    conn: &mut SqliteConnection,
    owner: &str,
    name: &str,
    address: &str,
) -> Result<Option<Exporter>> {
    sqlx::query_as::<_, Exporter>(
        r#"
        SELECT * FROM exporters
        WHERE user_id = ? AND LOWER(name) = LOWER(?) AND LOWER(business_address) = LOWER(?)
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(name.trim())
    .bind(address.trim())
    .fetch_optional(conn)
    .await
    .map_err(AppError::Database)
}

pub async fn insert_exporter(
    conn: &mut SqliteConnection,
    owner: &str,
    form: &ExporterForm,
) -> Result<Exporter> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO exporters (id, name, business_address, contact_person, contact_number,
                               email, is_active, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(form.name.trim())
    .bind(form.business_address.trim())
    .bind(form.contact_person.trim())
    .bind(form.contact_number.trim())
    .bind(form.email.trim())
    .bind(owner)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    find_exporter(conn, &id)
        .await?
        .ok_or_else(|| AppError::Internal("inserted exporter vanished".into()))
}
