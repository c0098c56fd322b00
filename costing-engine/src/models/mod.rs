//! Domain models for costing-engine.

mod catalog;
mod formulation;
mod settlement;

pub use catalog::{Catalog, ExpenseAccount, InventoryItem, ItemMeta};
pub use formulation::{
    ExpenseLine, ExpenseRecord, FinishedGoodLine, FormulationAck, FormulationSource, FormulationTotals,
    IngredientLine, IngredientRecord, LineCollection, LineField, LineKind, ProductRecord,
    ScaledLine, SourceIdentity,
};
pub use settlement::{
    AllocationMode, ExistingAllocation, ExistingSettlement, OpenTransaction,
    OverAllocationWarning, ReceiptEdit, SettlementAck, SettlementHeader, SettlementKind,
    SettlementPayload, SettlementSummary, SettlementTransaction, TransactionAllocation,
};
