//! Application wiring: backend client, catalog and form factories.

use crate::config::CostingConfig;
use crate::forms::{FormulationEditor, SettlementForm};
use crate::models::{Catalog, SettlementKind};
use crate::services::{init_metrics, BackendClient, CatalogSource, FormulationStore};
use service_core::error::AppError;
use std::sync::Arc;

pub struct Application {
    config: CostingConfig,
    backend: Arc<BackendClient>,
    catalog: Catalog,
}

impl Application {
    /// Build the backend client and fetch the catalog.
    pub async fn build(config: CostingConfig) -> Result<Self, AppError> {
        init_metrics();

        tracing::info!(
            service_name = %config.common.service_name,
            backend_url = %config.backend.base_url,
            timeout_secs = config.backend.timeout.as_secs(),
            authenticated = config.backend.api_token.is_some(),
            "Configuration loaded"
        );

        let backend = Arc::new(BackendClient::new(config.backend.clone()));
        let catalog = fetch_catalog(backend.as_ref()).await?;

        Ok(Self {
            config,
            backend,
            catalog,
        })
    }

    pub fn backend(&self) -> Arc<BackendClient> {
        Arc::clone(&self.backend)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &CostingConfig {
        &self.config
    }

    /// Re-fetch the catalog. Editors already handed out keep their copy
    /// until given the new one via `refresh_catalog`.
    pub async fn refresh_catalog(&mut self) -> Result<&Catalog, AppError> {
        self.catalog = fetch_catalog(self.backend.as_ref()).await?;
        Ok(&self.catalog)
    }

    pub fn new_formulation(&self) -> FormulationEditor {
        FormulationEditor::new(self.catalog.clone(), self.config.formulation)
    }

    pub async fn open_formulation(&self, id: i64) -> Result<FormulationEditor, AppError> {
        let source = self.backend.get_formulation(id).await?;
        let mut editor = self.new_formulation();
        editor.load(&source);
        Ok(editor)
    }

    pub fn new_settlement(&self, kind: SettlementKind) -> SettlementForm {
        SettlementForm::new(kind)
    }

    pub async fn open_settlement(&self, kind: SettlementKind, id: i64) -> Result<SettlementForm, AppError> {
        SettlementForm::load_existing(self.backend.as_ref(), kind, id).await
    }
}

async fn fetch_catalog(source: &dyn CatalogSource) -> Result<Catalog, AppError> {
    let (inventory_items, expense_accounts) =
        tokio::try_join!(source.inventory_items(), source.expense_accounts())?;

    tracing::info!(
        inventory_items = inventory_items.len(),
        expense_accounts = expense_accounts.len(),
        "Catalog loaded"
    );
    Ok(Catalog::new(inventory_items, expense_accounts))
}
