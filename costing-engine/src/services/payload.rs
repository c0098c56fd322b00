//! Request bodies sent to the backend.

use crate::models::{
    ExpenseLine, FinishedGoodLine, IngredientLine, SettlementHeader, SettlementKind,
    SettlementPayload, SettlementTransaction, TransactionAllocation,
};
use crate::services::formulation::Formulation;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[serde(rename = "product_id")]
    pub product_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub qty_fi_percent: Decimal,
    pub unit: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_fi_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_required: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientPayload {
    #[serde(rename = "inventory_item_id")]
    pub inventory_item_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_required: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub per_unit: Option<Decimal>,
    pub unit: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub available_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePayload {
    #[serde(rename = "expense_account_id")]
    pub expense_account_id: Option<i64>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_required: Decimal,
    pub details: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub per_unit: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Body of `POST /formulations` and `PUT /formulations/:id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationPayload {
    pub code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub rm_factor: Decimal,
    pub products: Vec<ProductPayload>,
    pub ingredients: Vec<IngredientPayload>,
    pub expenses: Vec<ExpensePayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
}

pub fn build_products_payload(lines: &[FinishedGoodLine]) -> Vec<ProductPayload> {
    lines
        .iter()
        .map(|line| ProductPayload {
            product_id: line.product_id.or(line.item_id),
            name: line.meta.name.clone(),
            description: line.description.clone(),
            qty_fi_percent: line.qty_fi_percent.unwrap_or(Decimal::ZERO),
            unit: line.meta.unit.clone(),
            cost_fi_percent: line.cost_fi_percent,
            base_quantity: line.base_quantity,
            quantity_required: line.quantity,
        })
        .collect()
}

pub fn build_ingredients_payload(lines: &[IngredientLine]) -> Vec<IngredientPayload> {
    lines
        .iter()
        .map(|line| IngredientPayload {
            inventory_item_id: line.item_id,
            name: line.meta.name.clone(),
            description: line.description.clone(),
            quantity_required: line.qty_required,
            per_unit: line.per_unit,
            unit: line.meta.unit.clone(),
            available_quantity: line.available_quantity,
            amount: line.amount(),
        })
        .collect()
}

pub fn build_expenses_payload(lines: &[ExpenseLine]) -> Vec<ExpensePayload> {
    lines
        .iter()
        .map(|line| ExpensePayload {
            expense_account_id: line.expense_account_id,
            name: line.name.clone(),
            quantity_required: line.qty_required,
            details: line.details.clone(),
            per_unit: line.per_unit,
            rate: line.rate,
            amount: line.amount(),
        })
        .collect()
}

pub fn build_formulation_payload(code: &str, name: &str, formulation: &Formulation) -> FormulationPayload {
    FormulationPayload {
        code: code.to_string(),
        name: name.to_string(),
        rm_factor: formulation.rm_factor,
        products: build_products_payload(&formulation.finished_goods),
        ingredients: build_ingredients_payload(&formulation.ingredients),
        expenses: build_expenses_payload(&formulation.expenses),
        total_cost: formulation.total_cost(),
    }
}

/// Settlement body: only rows with a receipt or discount are sent, and the
/// `transactions` key is omitted when none qualify.
pub fn build_submission_payload(
    kind: SettlementKind,
    counterparty_id: i64,
    header: &SettlementHeader,
    amount: Decimal,
    transactions: &[SettlementTransaction],
) -> SettlementPayload {
    let allocations: Vec<TransactionAllocation> = transactions
        .iter()
        .filter(|row| row.receipt > Decimal::ZERO || row.discount > Decimal::ZERO)
        .map(|row| TransactionAllocation {
            id: row.id,
            amount: row.receipt,
            discount: row.discount,
        })
        .collect();

    let (customer_id, vendor_id) = match kind {
        SettlementKind::Receipt => (Some(counterparty_id), None),
        SettlementKind::Payment => (None, Some(counterparty_id)),
    };

    SettlementPayload {
        reference: header.reference.clone(),
        date: header.date,
        notes: header.notes.clone(),
        payment_type: header.payment_type.clone(),
        bank_id: header.bank_id,
        amount: amount.max(Decimal::ZERO),
        customer_id,
        vendor_id,
        transactions: (!allocations.is_empty()).then_some(allocations),
    }
}
