//! Catalog models fetched from the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inventory item as served by the catalog endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub base_unit: Option<String>,
    #[serde(default)]
    pub base_rate: Decimal,
    #[serde(default)]
    pub selling_rate: Option<Decimal>,
    /// Conversion multipliers from a unit name into the base unit.
    #[serde(default)]
    pub multi_units: HashMap<String, Decimal>,
}

/// Expense account as served by the catalog endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseAccount {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Everything a formulation needs to hydrate its lines.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub inventory_items: Vec<InventoryItem>,
    pub expense_accounts: Vec<ExpenseAccount>,
}

impl Catalog {
    pub fn new(inventory_items: Vec<InventoryItem>, expense_accounts: Vec<ExpenseAccount>) -> Self {
        Self {
            inventory_items,
            expense_accounts,
        }
    }

    pub fn inventory_item(&self, id: i64) -> Option<&InventoryItem> {
        self.inventory_items.iter().find(|item| item.id == id)
    }

    pub fn expense_account(&self, id: i64) -> Option<&ExpenseAccount> {
        self.expense_accounts.iter().find(|account| account.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.inventory_items.is_empty() && self.expense_accounts.is_empty()
    }
}

/// Item metadata copied onto a formulation line from the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMeta {
    pub name: String,
    pub unit: Option<String>,
    pub base_rate: Decimal,
    pub multi_units: HashMap<String, Decimal>,
}

impl ItemMeta {
    /// Multiplier into the base unit; 1 when the unit or its entry is missing.
    pub fn unit_multiplier(&self) -> Decimal {
        self.unit
            .as_ref()
            .and_then(|unit| self.multi_units.get(unit))
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}

impl From<&InventoryItem> for ItemMeta {
    fn from(item: &InventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            unit: item.base_unit.clone(),
            base_rate: item.base_rate,
            multi_units: item.multi_units.clone(),
        }
    }
}
