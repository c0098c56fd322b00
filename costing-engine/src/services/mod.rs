//! Services module for costing-engine.

pub mod backend;
pub mod formulation;
pub mod metrics;
pub mod payload;
pub mod settlement;

pub use backend::{BackendClient, CatalogSource, FormulationStore, SettlementBackend};
pub use formulation::Formulation;
pub use metrics::{get_metrics, init_metrics};
pub use payload::{build_formulation_payload, build_submission_payload, FormulationPayload};
