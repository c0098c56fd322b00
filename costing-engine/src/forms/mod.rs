//! Stateful form shells over the calculation engines.

mod formulation_editor;
mod settlement_form;

pub use formulation_editor::FormulationEditor;
pub use settlement_form::{FormMode, LoadTicket, Selection, SettlementForm};
