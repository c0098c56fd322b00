//! Settlement (receipt/payment) models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Direction of the settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// Money received from a customer against invoices.
    Receipt,
    /// Money paid to a vendor against bills.
    Payment,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::Receipt => "receipt",
            SettlementKind::Payment => "payment",
        }
    }

    /// Collection path on the backend.
    pub fn resource(&self) -> &'static str {
        match self {
            SettlementKind::Receipt => "receipts",
            SettlementKind::Payment => "payments",
        }
    }

    /// Path of the counterparty's outstanding documents.
    pub fn outstanding_path(&self, counterparty_id: i64) -> String {
        match self {
            SettlementKind::Receipt => format!("customers/{}/outstanding-invoices", counterparty_id),
            SettlementKind::Payment => format!("vendors/{}/outstanding-bills", counterparty_id),
        }
    }
}

/// Open invoice or bill as fetched for a counterparty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTransaction {
    pub id: i64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub outstanding_balance: Decimal,
}

/// Working row of the allocation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTransaction {
    pub id: i64,
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    /// Fixed for the session.
    pub outstanding_balance: Decimal,
    pub discount: Decimal,
    pub receipt: Decimal,
    /// Either the settled amount or the balance still owed, depending on
    /// which operation last touched the row.
    pub total: Decimal,
}

impl From<OpenTransaction> for SettlementTransaction {
    fn from(open: OpenTransaction) -> Self {
        let outstanding_balance = open.outstanding_balance.max(Decimal::ZERO);
        Self {
            id: open.id,
            number: open.number,
            date: open.date,
            outstanding_balance,
            discount: Decimal::ZERO,
            receipt: Decimal::ZERO,
            total: outstanding_balance,
        }
    }
}

/// Whether the allocation table may be redistributed wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Reset every row and walk the amount down the list.
    Automatic,
    /// The user is editing a specific cell; leave other rows alone.
    Manual,
}

/// Non-blocking notice raised when a requested receipt had to be reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct OverAllocationWarning {
    pub row_id: i64,
    pub requested: Decimal,
    pub allowed: Decimal,
}

impl std::fmt::Display for OverAllocationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Receipt of {} exceeds the remaining amount; only {} can be allocated",
            self.requested, self.allowed
        )
    }
}

/// Result of a manual receipt edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptEdit {
    pub receipt: Decimal,
    pub unallocated_balance: Decimal,
    pub warning: Option<OverAllocationWarning>,
}

/// Aggregate view of the allocation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub total_outstanding: Decimal,
    pub total_receipt: Decimal,
    pub total_discount: Decimal,
    pub unallocated_balance: Decimal,
}

/// Header fields entered on the settlement form.
#[derive(Debug, Clone, Default, Validate)]
pub struct SettlementHeader {
    #[validate(length(max = 64, message = "Reference must be at most 64 characters"))]
    pub reference: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "Payment mode is required"))]
    pub payment_type: String,
    pub bank_id: Option<i64>,
}

/// One allocation row in the submitted payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAllocation {
    pub id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
}

/// Body of `POST /receipts` or `POST /payments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPayload {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub payment_type: String,
    pub bank_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionAllocation>>,
}

/// A persisted settlement loaded for editing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingSettlement {
    pub id: i64,
    pub counterparty_id: i64,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub bank_id: Option<i64>,
    pub amount: Decimal,
    #[serde(default)]
    pub transactions: Vec<ExistingAllocation>,
}

/// Row of an existing settlement with its saved allocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAllocation {
    pub id: i64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub outstanding_balance: Decimal,
    #[serde(default)]
    pub receipt: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

/// Backend acknowledgement of a submitted settlement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementAck {
    pub id: i64,
    #[serde(default)]
    pub reference: Option<String>,
}
