//! Formulation line models.

use crate::models::catalog::ItemMeta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which collection a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    FinishedGood,
    Ingredient,
    Expense,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::FinishedGood => "finished_good",
            LineKind::Ingredient => "ingredient",
            LineKind::Expense => "expense",
        }
    }
}

/// Output product of a formulation, quantified by percentage share.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGoodLine {
    pub line_id: Uuid,
    pub item_id: Option<i64>,
    /// Persisted product reference; wins over `item_id` in payloads.
    pub product_id: Option<i64>,
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub description: Option<String>,
    pub qty_fi_percent: Option<Decimal>,
    pub quantity: Decimal,
    pub base_quantity: Decimal,
    pub cost_fi_percent: Decimal,
}

impl FinishedGoodLine {
    pub fn new() -> Self {
        Self {
            line_id: Uuid::new_v4(),
            item_id: None,
            product_id: None,
            meta: ItemMeta::default(),
            description: None,
            qty_fi_percent: None,
            quantity: Decimal::ZERO,
            base_quantity: Decimal::ZERO,
            cost_fi_percent: Decimal::ZERO,
        }
    }
}

impl Default for FinishedGoodLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw material consumed per unit of the RM factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    pub line_id: Uuid,
    pub item_id: Option<i64>,
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub description: Option<String>,
    pub per_unit: Option<Decimal>,
    pub qty_required: Decimal,
    /// Stock on hand reported alongside the line.
    pub available_quantity: Decimal,
}

impl IngredientLine {
    pub fn new() -> Self {
        Self {
            line_id: Uuid::new_v4(),
            item_id: None,
            meta: ItemMeta::default(),
            description: None,
            per_unit: None,
            qty_required: Decimal::ZERO,
            available_quantity: Decimal::ZERO,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.qty_required.saturating_mul(self.meta.base_rate)
    }
}

impl Default for IngredientLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Expense booked against an expense account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLine {
    pub line_id: Uuid,
    pub expense_account_id: Option<i64>,
    pub name: String,
    pub details: Option<String>,
    pub per_unit: Option<Decimal>,
    pub rate: Decimal,
    pub qty_required: Decimal,
}

impl ExpenseLine {
    pub fn new() -> Self {
        Self {
            line_id: Uuid::new_v4(),
            expense_account_id: None,
            name: String::new(),
            details: None,
            per_unit: None,
            rate: Decimal::ZERO,
            qty_required: Decimal::ZERO,
        }
    }

    /// Contribution to the formulation's total cost.
    pub fn cost(&self) -> Decimal {
        self.per_unit
            .unwrap_or(Decimal::ZERO)
            .saturating_mul(self.rate)
            .saturating_mul(self.qty_required)
    }

    /// Amount as persisted with the expense row.
    pub fn amount(&self) -> Decimal {
        self.rate.saturating_mul(self.qty_required)
    }
}

impl Default for ExpenseLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lines whose absolute quantity scales with the RM factor.
pub trait ScaledLine {
    fn line_id(&self) -> Uuid;
    fn per_unit(&self) -> Option<Decimal>;
    fn set_per_unit(&mut self, per_unit: Option<Decimal>);
    fn qty_required(&self) -> Decimal;
    fn set_qty_required(&mut self, qty: Decimal);
}

macro_rules! impl_scaled_line {
    ($ty:ty) => {
        impl ScaledLine for $ty {
            fn line_id(&self) -> Uuid {
                self.line_id
            }

            fn per_unit(&self) -> Option<Decimal> {
                self.per_unit
            }

            fn set_per_unit(&mut self, per_unit: Option<Decimal>) {
                self.per_unit = per_unit;
            }

            fn qty_required(&self) -> Decimal {
                self.qty_required
            }

            fn set_qty_required(&mut self, qty: Decimal) {
                self.qty_required = qty;
            }
        }
    };
}

impl_scaled_line!(IngredientLine);
impl_scaled_line!(ExpenseLine);

/// One of the three line collections, used to route whole-collection edits.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCollection {
    FinishedGoods(Vec<FinishedGoodLine>),
    Ingredients(Vec<IngredientLine>),
    Expenses(Vec<ExpenseLine>),
}

impl LineCollection {
    pub fn kind(&self) -> LineKind {
        match self {
            LineCollection::FinishedGoods(_) => LineKind::FinishedGood,
            LineCollection::Ingredients(_) => LineKind::Ingredient,
            LineCollection::Expenses(_) => LineKind::Expense,
        }
    }
}

/// A single-field edit on one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineField {
    PerUnit(Decimal),
    QtyRequired(Decimal),
    QtyFiPercent(Decimal),
    Quantity(Decimal),
    Rate(Decimal),
    Unit(String),
    Description(String),
    AvailableQuantity(Decimal),
}

/// Aggregate published to the owning form after every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationTotals {
    pub finished_goods: Vec<FinishedGoodLine>,
    pub ingredients: Vec<IngredientLine>,
    pub expenses: Vec<ExpenseLine>,
    pub total_cost: Decimal,
    pub rm_factor: Decimal,
}

// ============================================================================
// Persisted record shapes
// ============================================================================

/// Identity used to decide whether a source was already loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentity {
    Id(i64),
    Code(String),
}

/// Formulation or production record as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationSource {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rm_factor: Option<Decimal>,
    #[serde(default)]
    pub batch_size: Option<Decimal>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub ingredients: Vec<IngredientRecord>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
}

impl FormulationSource {
    pub fn identity(&self) -> Option<SourceIdentity> {
        match (&self.id, &self.code) {
            (Some(id), _) => Some(SourceIdentity::Id(*id)),
            (None, Some(code)) => Some(SourceIdentity::Code(code.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(rename = "product_id", default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub qty_fi_percent: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_fi_percent: Option<Decimal>,
    #[serde(default)]
    pub base_quantity: Option<Decimal>,
    #[serde(default)]
    pub quantity_required: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRecord {
    #[serde(rename = "inventory_item_id", default)]
    pub inventory_item_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity_required: Option<Decimal>,
    #[serde(default)]
    pub per_unit: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub available_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    #[serde(rename = "expense_account_id", default)]
    pub expense_account_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity_required: Option<Decimal>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub per_unit: Option<Decimal>,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

/// Backend acknowledgement of a saved formulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationAck {
    pub id: i64,
    #[serde(default)]
    pub code: Option<String>,
}
