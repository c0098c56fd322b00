//! Formulation editor: binds user edits to the cost engine and publishes the
//! recomputed totals to the owning form.

use crate::config::FormulationDefaults;
use crate::models::{
    Catalog, FormulationAck, FormulationSource, FormulationTotals, LineCollection, LineField,
    LineKind, SourceIdentity,
};
use crate::services::backend::FormulationStore;
use crate::services::formulation::Formulation;
use crate::services::metrics::{record_recomputation, record_submission};
use crate::services::payload::{build_formulation_payload, FormulationPayload};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

type ChangeListener = Box<dyn FnMut(&FormulationTotals) + Send>;

pub struct FormulationEditor {
    formulation: Formulation,
    catalog: Catalog,
    defaults: FormulationDefaults,
    loaded: Option<SourceIdentity>,
    record_id: Option<i64>,
    code: String,
    name: String,
    on_change: Option<ChangeListener>,
}

impl FormulationEditor {
    pub fn new(catalog: Catalog, defaults: FormulationDefaults) -> Self {
        Self {
            formulation: Formulation::new(defaults.rm_factor, defaults.batch_size),
            catalog,
            defaults,
            loaded: None,
            record_id: None,
            code: String::new(),
            name: String::new(),
            on_change: None,
        }
    }

    /// Register the callback that receives totals after every recomputation.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&FormulationTotals) + Send + 'static,
    {
        self.on_change = Some(Box::new(listener));
    }

    /// Load a persisted record into the editor.
    ///
    /// A record is loaded at most once per identity: loading the same `id`
    /// (or `code`) again is ignored so edits in progress survive catalog
    /// refreshes. Returns whether the source was applied.
    pub fn load(&mut self, source: &FormulationSource) -> bool {
        let identity = source.identity();
        if identity.is_some() && identity == self.loaded {
            tracing::debug!(identity = ?identity, "Formulation already loaded; keeping edits");
            return false;
        }

        self.formulation = Formulation::initialize(
            source,
            &self.catalog,
            self.defaults.rm_factor,
            self.defaults.batch_size,
        );
        self.loaded = identity;
        self.record_id = source.id;
        self.code = source.code.clone().unwrap_or_default();
        self.name = source.name.clone().unwrap_or_default();

        tracing::info!(
            formulation_id = ?source.id,
            formulation_code = %self.code,
            products = self.formulation.finished_goods.len(),
            ingredients = self.formulation.ingredients.len(),
            expenses = self.formulation.expenses.len(),
            "Formulation loaded"
        );
        self.publish("load");
        true
    }

    /// Swap the catalog used for later item selections. Existing lines keep
    /// their metadata.
    pub fn refresh_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_rm_factor(&mut self, rm_factor: Decimal) {
        let batch_size = self.formulation.batch_size;
        self.formulation
            .recalculate_on_factor_or_batch_change(rm_factor, batch_size);
        self.publish("rm_factor");
    }

    pub fn set_batch_size(&mut self, batch_size: Decimal) {
        let rm_factor = self.formulation.rm_factor;
        self.formulation
            .recalculate_on_factor_or_batch_change(rm_factor, batch_size);
        self.publish("batch_size");
    }

    pub fn edit_line(&mut self, line_id: Uuid, field: LineField) -> bool {
        let applied = self.formulation.edit_line(line_id, field);
        if applied {
            self.publish("row_edit");
        }
        applied
    }

    pub fn handle_row_edit(&mut self, updated: LineCollection) {
        let kind = updated.kind();
        self.formulation.handle_row_edit(updated);
        tracing::debug!(line_kind = kind.as_str(), "Row edit applied");
        self.publish("row_edit");
    }

    pub fn select_item(&mut self, line_id: Uuid, catalog_item_id: i64) -> bool {
        let selected = self
            .formulation
            .select_item_for_line(line_id, catalog_item_id, &self.catalog);
        if selected {
            self.publish("item_selected");
        } else {
            tracing::warn!(%line_id, catalog_item_id, "Item selection did not match a line or catalog entry");
        }
        selected
    }

    pub fn add_line(&mut self, kind: LineKind) -> Uuid {
        let line_id = self.formulation.add_line(kind);
        self.publish("line_added");
        line_id
    }

    pub fn remove_line(&mut self, line_id: Uuid) -> bool {
        let removed = self.formulation.remove_line(line_id);
        if removed {
            self.publish("line_removed");
        }
        removed
    }

    pub fn formulation(&self) -> &Formulation {
        &self.formulation
    }

    pub fn totals(&self) -> FormulationTotals {
        self.formulation.compute_totals()
    }

    pub fn payload(&self) -> FormulationPayload {
        build_formulation_payload(&self.code, &self.name, &self.formulation)
    }

    /// Persist the formulation: PUT when it was loaded from a saved record,
    /// POST otherwise. In-memory state is left untouched on failure.
    pub async fn save(&mut self, store: &dyn FormulationStore) -> Result<FormulationAck, AppError> {
        let payload = self.payload();
        let result = match self.record_id {
            Some(id) => store.update_formulation(id, &payload).await,
            None => store.create_formulation(&payload).await,
        };

        match result {
            Ok(ack) => {
                record_submission("formulation", "success");
                tracing::info!(formulation_id = ack.id, formulation_code = %self.code, "Formulation saved");
                self.record_id = Some(ack.id);
                self.loaded = Some(SourceIdentity::Id(ack.id));
                Ok(ack)
            }
            Err(e) => {
                record_submission("formulation", e.kind());
                tracing::error!(formulation_code = %self.code, error = %e, "Failed to save formulation");
                Err(e)
            }
        }
    }

    fn publish(&mut self, trigger: &str) {
        record_recomputation("formulation", trigger);
        if let Some(listener) = self.on_change.as_mut() {
            let totals = self.formulation.compute_totals();
            listener(&totals);
        }
    }
}
