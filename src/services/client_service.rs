use crate::{
    db::client_store::ClientStore,
    error::{AppError, Result},
    models::{
        client::{
            Consignee, ConsigneeDetail, ConsigneeDocument, ConsigneeForm, ConsigneePatch,
            Exporter, ExporterDetail, ExporterForm, ExporterPatch, NewConsigneeDocument,
            is_valid_tin,
        },
        user::User,
    },
    services::access::{ensure_create, ensure_edit, ensure_staff, ensure_view},
};

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_tin(tin: &str) -> Result<()> {
    let tin = tin.trim();
    if !tin.is_empty() && !is_valid_tin(tin) {
        return Err(AppError::Validation(
            "TIN must look like 000-000-000 or 000-000-000-000".into(),
        ));
    }
    Ok(())
}

/// Consignee and exporter records, scoped by role and ownership
#[derive(Clone)]
pub struct ClientService {
    clients: ClientStore,
}

impl ClientService {
    pub fn new(clients: ClientStore) -> Self {
        Self { clients }
    }

    pub async fn create_consignee(&self, actor: &User, form: ConsigneeForm) -> Result<Consignee> {
        ensure_create(actor, "consignee")?;
        require(&form.name, "Name")?;
        require(&form.business_address, "Business address")?;
        check_tin(&form.tin)?;

        if self
            .clients
            .consignee_taken(&actor.id, &form.name, &form.tin)
            .await?
        {
            return Err(AppError::Conflict(
                "A consignee with this TIN or name already exists".into(),
            ));
        }

        let consignee = self.clients.create_consignee(&actor.id, &form).await?;
        tracing::info!(consignee_id = %consignee.id, user_id = %actor.id, "consignee created");
        Ok(consignee)
    }

    pub async fn list_consignees(&self, actor: &User, search: Option<&str>) -> Result<Vec<Consignee>> {
        ensure_staff(actor)?;
        self.clients.list_consignees(search).await
    }

    pub async fn get_consignee(&self, actor: &User, id: &str) -> Result<ConsigneeDetail> {
        let consignee = self.clients.get_consignee(id).await?;
        ensure_view(actor, &consignee.user_id, "Consignee")?;

        let documents = self.clients.consignee_documents(id).await?;
        let shipments = self.clients.consignee_shipments(id).await?;
        Ok(ConsigneeDetail {
            consignee,
            documents,
            shipments,
        })
    }

    pub async fn update_consignee(
        &self,
        actor: &User,
        id: &str,
        patch: ConsigneePatch,
    ) -> Result<Consignee> {
        let mut consignee = self.clients.get_consignee(id).await?;
        ensure_edit(actor, &consignee.user_id, "Consignee")?;

        patch.apply(&mut consignee);
        require(&consignee.name, "Name")?;
        require(&consignee.business_address, "Business address")?;
        check_tin(&consignee.tin)?;

        let updated = self.clients.update_consignee(&consignee).await?;
        tracing::info!(consignee_id = %id, user_id = %actor.id, "consignee updated");
        Ok(updated)
    }

    pub async fn add_consignee_document(
        &self,
        actor: &User,
        id: &str,
        document: NewConsigneeDocument,
    ) -> Result<ConsigneeDocument> {
        let consignee = self.clients.get_consignee(id).await?;
        ensure_edit(actor, &consignee.user_id, "Consignee")?;
        require(&document.name, "Document name")?;
        require(&document.file_url, "File URL")?;

        self.clients.add_consignee_document(id, &document).await
    }

    pub async fn create_exporter(&self, actor: &User, form: ExporterForm) -> Result<Exporter> {
        ensure_create(actor, "exporter")?;
        require(&form.name, "Name")?;
        require(&form.business_address, "Business address")?;

        if self
            .clients
            .exporter_taken(&actor.id, &form.name, &form.email)
            .await?
        {
            return Err(AppError::Conflict(
                "An exporter with this email or name already exists".into(),
            ));
        }

        let exporter = self.clients.create_exporter(&actor.id, &form).await?;
        tracing::info!(exporter_id = %exporter.id, user_id = %actor.id, "exporter created");
        Ok(exporter)
    }

    pub async fn list_exporters(&self, actor: &User, search: Option<&str>) -> Result<Vec<Exporter>> {
        ensure_staff(actor)?;
        self.clients.list_exporters(search).await
    }

    pub async fn get_exporter(&self, actor: &User, id: &str) -> Result<ExporterDetail> {
        let exporter = self.clients.get_exporter(id).await?;
        ensure_view(actor, &exporter.user_id, "Exporter")?;

        let shipments = self.clients.exporter_shipments(id).await?;
        Ok(ExporterDetail { exporter, shipments })
    }

    pub async fn update_exporter(
        &self,
        actor: &User,
        id: &str,
        patch: ExporterPatch,
    ) -> Result<Exporter> {
        let mut exporter = self.clients.get_exporter(id).await?;
        ensure_edit(actor, &exporter.user_id, "Exporter")?;

        patch.apply(&mut exporter);
        require(&exporter.name, "Name")?;
        require(&exporter.business_address, "Business address")?;

        let updated = self.clients.update_exporter(&exporter).await?;
        tracing::info!(exporter_id = %id, user_id = %actor.id, "exporter updated");
        Ok(updated)
    }

    pub async fn totals(&self) -> Result<(i64, i64)> {
        self.clients.totals().await
    }
}
