//! Settlement allocation engine.
//!
//! Distributes a cash amount over a counterparty's outstanding invoices or
//! bills. Rows are served strictly in list order. Manual discount and receipt
//! edits only ever touch the edited row. Negative input is clamped to zero;
//! nothing here fails.
//!
//! A row's `total` has two meanings. Automatic distribution and discount
//! edits store the settled amount (`receipt − discount`, floored at zero).
//! Receipt edits store the balance still owed
//! (`outstanding_balance − discount − receipt`).

use crate::models::{
    AllocationMode, OpenTransaction, OverAllocationWarning, ReceiptEdit, SettlementSummary,
    SettlementTransaction,
};
use rust_decimal::Decimal;

/// Fresh working rows for a counterparty's open documents.
pub fn init_transactions(open: Vec<OpenTransaction>) -> Vec<SettlementTransaction> {
    open.into_iter().map(SettlementTransaction::from).collect()
}

/// Walk `amount` down the rows in order.
///
/// In manual mode nothing is reset or reallocated. Returns the unallocated
/// balance in either mode.
pub fn distribute_amount(
    amount: Decimal,
    transactions: &mut [SettlementTransaction],
    mode: AllocationMode,
) -> Decimal {
    let amount = non_negative(amount);
    if mode == AllocationMode::Manual {
        return unallocated_balance(amount, transactions);
    }

    for row in transactions.iter_mut() {
        row.discount = Decimal::ZERO;
        row.receipt = Decimal::ZERO;
    }

    let mut remaining = amount;
    for row in transactions.iter_mut() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let allocatable = non_negative(row.outstanding_balance - row.discount);
        let allocation = remaining.min(allocatable);
        row.receipt = allocation;
        remaining -= allocation;
    }

    for row in transactions.iter_mut() {
        row.total = settled_total(row);
    }

    remaining
}

/// Set one row's discount, bounded by what its receipt leaves of the balance.
/// Returns the applied discount, or `None` when the row does not exist.
pub fn handle_discount_edit(
    row_id: i64,
    new_discount: Decimal,
    transactions: &mut [SettlementTransaction],
) -> Option<Decimal> {
    let row = transactions.iter_mut().find(|row| row.id == row_id)?;

    let ceiling = non_negative(row.outstanding_balance - row.receipt);
    row.discount = non_negative(new_discount).min(ceiling);
    row.total = settled_total(row);

    Some(row.discount)
}

/// Set one row's receipt, bounded by its balance after discount and by what
/// the other rows leave of `amount`.
///
/// A request above the amount still available produces a warning; the
/// clamped value is applied regardless.
pub fn handle_receipt_edit(
    row_id: i64,
    new_receipt: Decimal,
    transactions: &mut [SettlementTransaction],
    amount: Decimal,
) -> Option<ReceiptEdit> {
    let amount = non_negative(amount);
    let other_receipts = saturating_sum(
        transactions
            .iter()
            .filter(|row| row.id != row_id)
            .map(|row| row.receipt),
    );

    let row = transactions.iter_mut().find(|row| row.id == row_id)?;

    let max_by_amount = non_negative(amount - other_receipts);
    let max_by_balance = non_negative(row.outstanding_balance - row.discount);
    let requested = non_negative(new_receipt);

    row.receipt = requested.min(max_by_balance).min(max_by_amount);
    row.total = non_negative(
        row.outstanding_balance
            .saturating_sub(row.discount)
            .saturating_sub(row.receipt),
    );
    let receipt = row.receipt;

    let warning = (requested > max_by_amount).then(|| OverAllocationWarning {
        row_id,
        requested,
        allowed: max_by_amount,
    });

    Some(ReceiptEdit {
        receipt,
        unallocated_balance: unallocated_balance(amount, transactions),
        warning,
    })
}

/// React to a new lump amount: redistribute when there are rows, otherwise
/// the whole amount is unallocated.
pub fn handle_amount_edit(new_amount: Decimal, transactions: &mut [SettlementTransaction]) -> Decimal {
    if transactions.is_empty() {
        non_negative(new_amount)
    } else {
        distribute_amount(new_amount, transactions, AllocationMode::Automatic)
    }
}

/// `max(0, amount − Σ receipt)`.
pub fn unallocated_balance(amount: Decimal, transactions: &[SettlementTransaction]) -> Decimal {
    let allocated = saturating_sum(transactions.iter().map(|row| row.receipt));
    non_negative(amount - allocated)
}

pub fn summarize(amount: Decimal, transactions: &[SettlementTransaction]) -> SettlementSummary {
    SettlementSummary {
        total_outstanding: saturating_sum(transactions.iter().map(|row| row.outstanding_balance)),
        total_receipt: saturating_sum(transactions.iter().map(|row| row.receipt)),
        total_discount: saturating_sum(transactions.iter().map(|row| row.discount)),
        unallocated_balance: unallocated_balance(non_negative(amount), transactions),
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

fn settled_total(row: &SettlementTransaction) -> Decimal {
    non_negative(row.receipt - row.discount)
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
