//! Receipt/payment form: owns the per-counterparty allocation tables and
//! routes amount, discount and receipt edits through the allocation engine.

use crate::models::{
    AllocationMode, ExistingSettlement, OpenTransaction, ReceiptEdit, SettlementAck,
    SettlementHeader, SettlementKind, SettlementPayload, SettlementSummary,
    SettlementTransaction,
};
use crate::services::backend::SettlementBackend;
use crate::services::metrics::{record_clamp_warning, record_recomputation, record_submission};
use crate::services::payload::build_submission_payload;
use crate::services::settlement::{
    distribute_amount, handle_amount_edit, handle_discount_edit, handle_receipt_edit,
    init_transactions, summarize,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use validator::Validate;

/// Whether the form creates a new settlement or edits a saved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { settlement_id: i64 },
}

/// Ticket for an in-flight counterparty fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub counterparty_id: i64,
    generation: u64,
}

/// Outcome of selecting a counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Rows were already cached and are now active.
    Cached,
    /// Rows must be fetched; complete with [`SettlementForm::complete_load`].
    Pending(LoadTicket),
}

pub struct SettlementForm {
    kind: SettlementKind,
    mode: FormMode,
    header: SettlementHeader,
    amount: Decimal,
    unallocated_balance: Decimal,
    counterparty_id: Option<i64>,
    /// Working rows per counterparty seen in this session.
    transactions: HashMap<i64, Vec<SettlementTransaction>>,
    generation: u64,
}

impl SettlementForm {
    pub fn new(kind: SettlementKind) -> Self {
        Self {
            kind,
            mode: FormMode::Create,
            header: SettlementHeader::default(),
            amount: Decimal::ZERO,
            unallocated_balance: Decimal::ZERO,
            counterparty_id: None,
            transactions: HashMap::new(),
            generation: 0,
        }
    }

    /// Open a saved settlement with its stored allocations and amount.
    pub fn for_existing(kind: SettlementKind, existing: ExistingSettlement) -> Self {
        let rows: Vec<SettlementTransaction> = existing
            .transactions
            .into_iter()
            .map(|saved| {
                let mut row = SettlementTransaction::from(OpenTransaction {
                    id: saved.id,
                    number: saved.number,
                    date: saved.date,
                    outstanding_balance: saved.outstanding_balance,
                });
                row.discount = saved.discount.max(Decimal::ZERO);
                row.receipt = saved.receipt.max(Decimal::ZERO);
                row.total = row
                    .outstanding_balance
                    .saturating_sub(row.discount)
                    .saturating_sub(row.receipt)
                    .max(Decimal::ZERO);
                row
            })
            .collect();

        let amount = existing.amount.max(Decimal::ZERO);
        let mut transactions = HashMap::new();
        transactions.insert(existing.counterparty_id, rows);

        let mut form = Self {
            kind,
            mode: FormMode::Edit {
                settlement_id: existing.id,
            },
            header: SettlementHeader {
                reference: existing.reference,
                date: existing.date,
                notes: existing.notes,
                payment_type: existing.payment_type,
                bank_id: existing.bank_id,
            },
            amount,
            unallocated_balance: Decimal::ZERO,
            counterparty_id: Some(existing.counterparty_id),
            transactions,
            generation: 0,
        };
        form.unallocated_balance = summarize(amount, form.transactions()).unallocated_balance;

        tracing::info!(
            settlement_id = existing.id,
            kind = kind.as_str(),
            counterparty_id = existing.counterparty_id,
            amount = %amount,
            "Settlement opened for editing"
        );
        form
    }

    /// Load a saved settlement through the backend.
    pub async fn load_existing(
        backend: &dyn SettlementBackend,
        kind: SettlementKind,
        settlement_id: i64,
    ) -> Result<Self, AppError> {
        let existing = backend.get_settlement(kind, settlement_id).await?;
        Ok(Self::for_existing(kind, existing))
    }

    pub fn kind(&self) -> SettlementKind {
        self.kind
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn unallocated_balance(&self) -> Decimal {
        self.unallocated_balance
    }

    pub fn counterparty_id(&self) -> Option<i64> {
        self.counterparty_id
    }

    pub fn header(&self) -> &SettlementHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut SettlementHeader {
        &mut self.header
    }

    /// Rows of the selected counterparty.
    pub fn transactions(&self) -> &[SettlementTransaction] {
        self.counterparty_id
            .and_then(|id| self.transactions.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn summary(&self) -> SettlementSummary {
        summarize(self.amount, self.transactions())
    }

    /// Switch to another counterparty.
    ///
    /// Creating a settlement resets the amount to zero; editing keeps the
    /// loaded amount and redistributes it over the newly selected rows.
    /// Any earlier in-flight fetch becomes stale. Re-selecting the current
    /// counterparty changes nothing and keeps its pending fetch valid.
    pub fn begin_selection(&mut self, counterparty_id: i64) -> Selection {
        if self.counterparty_id == Some(counterparty_id) {
            return if self.transactions.contains_key(&counterparty_id) {
                Selection::Cached
            } else {
                Selection::Pending(LoadTicket {
                    counterparty_id,
                    generation: self.generation,
                })
            };
        }

        self.generation += 1;
        self.counterparty_id = Some(counterparty_id);

        if self.mode == FormMode::Create && self.amount > Decimal::ZERO {
            tracing::debug!(counterparty_id, "Counterparty changed; resetting amount");
            self.amount = Decimal::ZERO;
            self.unallocated_balance = Decimal::ZERO;
        }

        if self.transactions.contains_key(&counterparty_id) {
            self.redistribute("counterparty_cached");
            Selection::Cached
        } else {
            self.unallocated_balance = self.amount;
            Selection::Pending(LoadTicket {
                counterparty_id,
                generation: self.generation,
            })
        }
    }

    /// Apply the result of a counterparty fetch.
    ///
    /// Returns `Ok(false)` when the ticket was superseded by a later
    /// selection; the response is then discarded. Fetch errors leave the form
    /// unchanged.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<OpenTransaction>, AppError>,
    ) -> Result<bool, AppError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                counterparty_id = ticket.counterparty_id,
                "Discarding stale counterparty response"
            );
            return Ok(false);
        }

        let open = result.map_err(|e| {
            tracing::error!(counterparty_id = ticket.counterparty_id, error = %e, "Failed to load outstanding transactions");
            e
        })?;

        tracing::info!(
            counterparty_id = ticket.counterparty_id,
            kind = self.kind.as_str(),
            rows = open.len(),
            "Outstanding transactions loaded"
        );
        self.transactions
            .insert(ticket.counterparty_id, init_transactions(open));
        self.redistribute("counterparty_loaded");
        Ok(true)
    }

    /// Select a counterparty and fetch its rows when they are not cached.
    pub async fn select_counterparty(
        &mut self,
        backend: &dyn SettlementBackend,
        counterparty_id: i64,
    ) -> Result<(), AppError> {
        match self.begin_selection(counterparty_id) {
            Selection::Cached => Ok(()),
            Selection::Pending(ticket) => {
                let result = backend
                    .outstanding_transactions(self.kind, counterparty_id)
                    .await;
                self.complete_load(ticket, result).map(|_| ())
            }
        }
    }

    /// New lump amount; rows are redistributed from scratch.
    pub fn set_amount(&mut self, amount: Decimal) {
        self.amount = amount.max(Decimal::ZERO);
        let amount = self.amount;
        self.unallocated_balance = match self.active_rows_mut() {
            Some(rows) => handle_amount_edit(amount, rows),
            None => amount,
        };
        record_recomputation("settlement", "amount");
    }

    pub fn edit_discount(&mut self, row_id: i64, discount: Decimal) -> Option<Decimal> {
        let applied = self
            .active_rows_mut()
            .and_then(|rows| handle_discount_edit(row_id, discount, rows))?;
        record_recomputation("settlement", "discount");
        Some(applied)
    }

    pub fn edit_receipt(&mut self, row_id: i64, receipt: Decimal) -> Option<ReceiptEdit> {
        let amount = self.amount;
        let edit = self
            .active_rows_mut()
            .and_then(|rows| handle_receipt_edit(row_id, receipt, rows, amount))?;

        self.unallocated_balance = edit.unallocated_balance;
        record_recomputation("settlement", "receipt");
        if let Some(warning) = &edit.warning {
            record_clamp_warning(self.kind.as_str());
            tracing::warn!(
                row_id,
                requested = %warning.requested,
                allowed = %warning.allowed,
                "{}",
                warning
            );
        }
        Some(edit)
    }

    /// Validate the header and build the request body.
    pub fn payload(&self) -> Result<SettlementPayload, AppError> {
        self.header.validate()?;

        let counterparty_id = self.counterparty_id.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("A counterparty must be selected"))
        })?;

        let rows = self.transactions();
        let discounted = rows.iter().any(|row| row.discount > Decimal::ZERO);
        if self.amount <= Decimal::ZERO && !discounted {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Amount must be greater than zero"
            )));
        }

        Ok(build_submission_payload(
            self.kind,
            counterparty_id,
            &self.header,
            self.amount,
            rows,
        ))
    }

    /// Submit the settlement. Failures leave the form editable and unchanged.
    pub async fn submit(&self, backend: &dyn SettlementBackend) -> Result<SettlementAck, AppError> {
        let payload = self.payload()?;
        let existing_id = match self.mode {
            FormMode::Edit { settlement_id } => Some(settlement_id),
            FormMode::Create => None,
        };

        match backend
            .submit_settlement(self.kind, existing_id, &payload)
            .await
        {
            Ok(ack) => {
                record_submission(self.kind.as_str(), "success");
                tracing::info!(
                    settlement_id = ack.id,
                    kind = self.kind.as_str(),
                    amount = %self.amount,
                    allocations = payload.transactions.as_ref().map_or(0, Vec::len),
                    "Settlement submitted"
                );
                Ok(ack)
            }
            Err(e) => {
                record_submission(self.kind.as_str(), e.kind());
                tracing::error!(kind = self.kind.as_str(), error = %e, "Failed to submit settlement");
                Err(e)
            }
        }
    }

    fn active_rows_mut(&mut self) -> Option<&mut Vec<SettlementTransaction>> {
        let id = self.counterparty_id?;
        self.transactions.get_mut(&id)
    }

    fn redistribute(&mut self, trigger: &str) {
        let amount = self.amount;
        self.unallocated_balance = match self.active_rows_mut() {
            Some(rows) => distribute_amount(amount, rows, AllocationMode::Automatic),
            None => amount,
        };
        record_recomputation("settlement", trigger);
    }
}
