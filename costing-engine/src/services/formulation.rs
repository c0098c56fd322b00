//! Formulation cost engine.
//!
//! Keeps the finished-good, ingredient and expense collections consistent
//! with one shared RM factor and batch size. Every mutating method leaves the
//! formulation fully recomputed; nothing here performs I/O or returns errors.
//! Out-of-range numeric input is clamped and zero denominators yield zero.

use crate::models::{
    Catalog, ExpenseLine, FinishedGoodLine, FormulationSource, FormulationTotals, IngredientLine,
    ItemMeta, LineCollection, LineField, LineKind, ScaledLine,
};
use rust_decimal::Decimal;
use uuid::Uuid;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Working state of a formulation or production costing.
#[derive(Debug, Clone, PartialEq)]
pub struct Formulation {
    pub rm_factor: Decimal,
    pub batch_size: Decimal,
    pub finished_goods: Vec<FinishedGoodLine>,
    pub ingredients: Vec<IngredientLine>,
    pub expenses: Vec<ExpenseLine>,
}

impl Formulation {
    pub fn new(rm_factor: Decimal, batch_size: Decimal) -> Self {
        Self {
            rm_factor: non_negative(rm_factor),
            batch_size: non_negative(batch_size),
            finished_goods: Vec::new(),
            ingredients: Vec::new(),
            expenses: Vec::new(),
        }
    }

    /// Build working lines from a persisted record, hydrating item metadata
    /// from the catalog by ID. Lines whose item is missing from the catalog
    /// keep the name and unit stored on the record.
    pub fn initialize(
        source: &FormulationSource,
        catalog: &Catalog,
        default_rm_factor: Decimal,
        default_batch_size: Decimal,
    ) -> Self {
        let mut formulation = Self::new(
            source.rm_factor.unwrap_or(default_rm_factor),
            source.batch_size.unwrap_or(default_batch_size),
        );

        formulation.finished_goods = source
            .products
            .iter()
            .map(|record| {
                let mut line = FinishedGoodLine::new();
                line.item_id = record.product_id;
                line.product_id = record.product_id;
                line.meta = hydrate(catalog, record.product_id, record.name.as_deref());
                if record.unit.is_some() {
                    line.meta.unit = record.unit.clone();
                }
                line.description = record.description.clone();
                line.qty_fi_percent = record.qty_fi_percent;
                line.quantity = record.quantity_required.unwrap_or(Decimal::ZERO);
                line.base_quantity = record.base_quantity.unwrap_or(Decimal::ZERO);
                line.cost_fi_percent = record.cost_fi_percent.unwrap_or(Decimal::ZERO);
                line
            })
            .collect();

        formulation.ingredients = source
            .ingredients
            .iter()
            .map(|record| {
                let mut line = IngredientLine::new();
                line.item_id = record.inventory_item_id;
                line.meta = hydrate(catalog, record.inventory_item_id, record.name.as_deref());
                if record.unit.is_some() {
                    line.meta.unit = record.unit.clone();
                }
                line.description = record.description.clone();
                line.per_unit = record.per_unit;
                line.qty_required = record.quantity_required.unwrap_or(Decimal::ZERO);
                line.available_quantity = record.available_quantity.unwrap_or(Decimal::ZERO);
                line
            })
            .collect();

        formulation.expenses = source
            .expenses
            .iter()
            .map(|record| {
                let mut line = ExpenseLine::new();
                line.expense_account_id = record.expense_account_id;
                line.name = record
                    .expense_account_id
                    .and_then(|id| catalog.expense_account(id))
                    .map(|account| account.name.clone())
                    .or_else(|| record.name.clone())
                    .unwrap_or_default();
                line.details = record.details.clone();
                line.per_unit = record.per_unit;
                line.rate = record.rate.unwrap_or(Decimal::ZERO);
                line.qty_required = record.quantity_required.unwrap_or(Decimal::ZERO);
                line
            })
            .collect();

        let (rm_factor, batch_size) = (formulation.rm_factor, formulation.batch_size);
        formulation.recalculate_on_factor_or_batch_change(rm_factor, batch_size);
        formulation
    }

    /// Apply a new RM factor and batch size to every line.
    ///
    /// Ingredients and expenses without a per-unit ratio keep their quantity.
    /// Finished-good shares are taken from the quantities computed in this
    /// same pass.
    pub fn recalculate_on_factor_or_batch_change(&mut self, rm_factor: Decimal, batch_size: Decimal) {
        self.rm_factor = non_negative(rm_factor);
        self.batch_size = non_negative(batch_size);

        let (rm_factor, batch_size) = (self.rm_factor, self.batch_size);
        for line in &mut self.ingredients {
            if let Some(per_unit) = line.per_unit {
                line.qty_required = scaled_quantity(per_unit, rm_factor, batch_size);
            }
        }
        for line in &mut self.expenses {
            if let Some(per_unit) = line.per_unit {
                line.qty_required = scaled_quantity(per_unit, rm_factor, batch_size);
            }
        }

        self.refresh_finished_goods();
    }

    /// Replace one collection after a row edit and re-derive the dependent
    /// fields of every line in it.
    ///
    /// For ingredient and expense lines the field that was not edited is
    /// derived from the one that was: a new `per_unit` drives `qty_required`,
    /// a new `qty_required` back-derives `per_unit`. When both or neither
    /// changed, `qty_required` is computed forward from `per_unit`.
    pub fn handle_row_edit(&mut self, updated: LineCollection) {
        let (rm_factor, batch_size) = (self.rm_factor, self.batch_size);
        match updated {
            LineCollection::FinishedGoods(lines) => {
                self.finished_goods = lines;
            }
            LineCollection::Ingredients(lines) => {
                self.ingredients = rederive_scaled(&self.ingredients, lines, rm_factor, batch_size);
            }
            LineCollection::Expenses(lines) => {
                self.expenses = rederive_scaled(&self.expenses, lines, rm_factor, batch_size);
            }
        }

        self.refresh_finished_goods();
    }

    /// Edit a single field of one line. Returns false when the line does not
    /// exist or the field does not apply to its kind.
    pub fn edit_line(&mut self, line_id: Uuid, field: LineField) -> bool {
        match self.line_kind(line_id) {
            Some(LineKind::FinishedGood) => {
                let mut lines = self.finished_goods.clone();
                let applied = lines
                    .iter_mut()
                    .find(|line| line.line_id == line_id)
                    .is_some_and(|line| apply_finished_good_field(line, field));
                if applied {
                    self.handle_row_edit(LineCollection::FinishedGoods(lines));
                }
                applied
            }
            Some(LineKind::Ingredient) => {
                let mut lines = self.ingredients.clone();
                let applied = lines
                    .iter_mut()
                    .find(|line| line.line_id == line_id)
                    .is_some_and(|line| apply_ingredient_field(line, field));
                if applied {
                    self.handle_row_edit(LineCollection::Ingredients(lines));
                }
                applied
            }
            Some(LineKind::Expense) => {
                let mut lines = self.expenses.clone();
                let applied = lines
                    .iter_mut()
                    .find(|line| line.line_id == line_id)
                    .is_some_and(|line| apply_expense_field(line, field));
                if applied {
                    self.handle_row_edit(LineCollection::Expenses(lines));
                }
                applied
            }
            None => false,
        }
    }

    /// Point a line at another catalog entry, replacing its hydrated metadata
    /// while keeping every quantity the user entered.
    pub fn select_item_for_line(&mut self, line_id: Uuid, catalog_item_id: i64, catalog: &Catalog) -> bool {
        let selected = match self.line_kind(line_id) {
            Some(LineKind::FinishedGood) => {
                match (
                    catalog.inventory_item(catalog_item_id),
                    self.finished_goods.iter_mut().find(|l| l.line_id == line_id),
                ) {
                    (Some(item), Some(line)) => {
                        line.item_id = Some(item.id);
                        line.product_id = None;
                        line.meta = ItemMeta::from(item);
                        true
                    }
                    _ => false,
                }
            }
            Some(LineKind::Ingredient) => {
                match (
                    catalog.inventory_item(catalog_item_id),
                    self.ingredients.iter_mut().find(|l| l.line_id == line_id),
                ) {
                    (Some(item), Some(line)) => {
                        line.item_id = Some(item.id);
                        line.meta = ItemMeta::from(item);
                        true
                    }
                    _ => false,
                }
            }
            Some(LineKind::Expense) => {
                match (
                    catalog.expense_account(catalog_item_id),
                    self.expenses.iter_mut().find(|l| l.line_id == line_id),
                ) {
                    (Some(account), Some(line)) => {
                        line.expense_account_id = Some(account.id);
                        line.name = account.name.clone();
                        true
                    }
                    _ => false,
                }
            }
            None => false,
        };

        if selected {
            self.refresh_finished_goods();
        }
        selected
    }

    /// Append an empty line and return its ID.
    pub fn add_line(&mut self, kind: LineKind) -> Uuid {
        match kind {
            LineKind::FinishedGood => {
                let line = FinishedGoodLine::new();
                let id = line.line_id;
                self.finished_goods.push(line);
                self.refresh_finished_goods();
                id
            }
            LineKind::Ingredient => {
                let line = IngredientLine::new();
                let id = line.line_id;
                self.ingredients.push(line);
                id
            }
            LineKind::Expense => {
                let line = ExpenseLine::new();
                let id = line.line_id;
                self.expenses.push(line);
                id
            }
        }
    }

    pub fn remove_line(&mut self, line_id: Uuid) -> bool {
        let before = self.line_count();
        self.finished_goods.retain(|line| line.line_id != line_id);
        self.ingredients.retain(|line| line.line_id != line_id);
        self.expenses.retain(|line| line.line_id != line_id);

        let removed = self.line_count() != before;
        if removed {
            self.refresh_finished_goods();
        }
        removed
    }

    pub fn line_kind(&self, line_id: Uuid) -> Option<LineKind> {
        if self.finished_goods.iter().any(|l| l.line_id == line_id) {
            Some(LineKind::FinishedGood)
        } else if self.ingredients.iter().any(|l| l.line_id == line_id) {
            Some(LineKind::Ingredient)
        } else if self.expenses.iter().any(|l| l.line_id == line_id) {
            Some(LineKind::Expense)
        } else {
            None
        }
    }

    /// Total cost: ingredient `qty_required × base_rate` plus expense
    /// `per_unit × rate × qty_required`.
    pub fn total_cost(&self) -> Decimal {
        let ingredients = self
            .ingredients
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.amount()));
        let expenses = self
            .expenses
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.cost()));
        ingredients.saturating_add(expenses)
    }

    pub fn compute_totals(&self) -> FormulationTotals {
        FormulationTotals {
            finished_goods: self.finished_goods.clone(),
            ingredients: self.ingredients.clone(),
            expenses: self.expenses.clone(),
            total_cost: self.total_cost(),
            rm_factor: self.rm_factor,
        }
    }

    fn line_count(&self) -> usize {
        self.finished_goods.len() + self.ingredients.len() + self.expenses.len()
    }

    /// Recompute quantity, base quantity and cost share of every finished good.
    fn refresh_finished_goods(&mut self) {
        let (rm_factor, batch_size) = (self.rm_factor, self.batch_size);
        for line in &mut self.finished_goods {
            if let Some(percent) = line.qty_fi_percent {
                line.quantity = finished_good_quantity(percent, rm_factor, batch_size);
            }
            line.base_quantity = line.quantity.saturating_mul(line.meta.unit_multiplier());
        }

        let total = self
            .finished_goods
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.quantity));
        for line in &mut self.finished_goods {
            line.cost_fi_percent = share_percent(line.quantity, total);
        }
    }
}

/// `rm_factor × per_unit × batch_size`.
pub fn scaled_quantity(per_unit: Decimal, rm_factor: Decimal, batch_size: Decimal) -> Decimal {
    rm_factor.saturating_mul(per_unit).saturating_mul(batch_size)
}

/// `(qty_fi_percent / 100) × rm_factor × batch_size`.
pub fn finished_good_quantity(qty_fi_percent: Decimal, rm_factor: Decimal, batch_size: Decimal) -> Decimal {
    (qty_fi_percent / HUNDRED)
        .saturating_mul(rm_factor)
        .saturating_mul(batch_size)
}

/// `quantity / total × 100`, or zero when the total is not positive.
pub fn share_percent(quantity: Decimal, total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    quantity
        .checked_div(total)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Back-derive `per_unit` from a directly edited quantity. A zero factor is
/// treated as 1 so the quantity itself is kept as the ratio.
pub fn per_unit_from_quantity(qty_required: Decimal, rm_factor: Decimal) -> Decimal {
    let divisor = if rm_factor.is_zero() { Decimal::ONE } else { rm_factor };
    qty_required.checked_div(divisor).unwrap_or(qty_required)
}

fn rederive_scaled<L: ScaledLine>(
    previous: &[L],
    updated: Vec<L>,
    rm_factor: Decimal,
    batch_size: Decimal,
) -> Vec<L> {
    updated
        .into_iter()
        .map(|mut line| {
            let before = previous.iter().find(|p| p.line_id() == line.line_id());
            let per_unit_changed = before.is_some_and(|p| p.per_unit() != line.per_unit());
            let qty_changed = before.is_some_and(|p| p.qty_required() != line.qty_required());

            if qty_changed && !per_unit_changed {
                line.set_per_unit(Some(per_unit_from_quantity(line.qty_required(), rm_factor)));
            } else if let Some(per_unit) = line.per_unit() {
                line.set_qty_required(scaled_quantity(per_unit, rm_factor, batch_size));
            }
            line
        })
        .collect()
}

fn hydrate(catalog: &Catalog, item_id: Option<i64>, fallback_name: Option<&str>) -> ItemMeta {
    match item_id.and_then(|id| catalog.inventory_item(id)) {
        Some(item) => ItemMeta::from(item),
        None => ItemMeta {
            name: fallback_name.unwrap_or_default().to_string(),
            ..ItemMeta::default()
        },
    }
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

fn apply_finished_good_field(line: &mut FinishedGoodLine, field: LineField) -> bool {
    match field {
        LineField::QtyFiPercent(value) => line.qty_fi_percent = Some(non_negative(value)),
        LineField::Quantity(value) => {
            line.qty_fi_percent = None;
            line.quantity = non_negative(value);
        }
        LineField::Unit(unit) => line.meta.unit = Some(unit),
        LineField::Description(text) => line.description = Some(text),
        _ => return false,
    }
    true
}

fn apply_ingredient_field(line: &mut IngredientLine, field: LineField) -> bool {
    match field {
        LineField::PerUnit(value) => line.per_unit = Some(non_negative(value)),
        LineField::QtyRequired(value) => line.qty_required = non_negative(value),
        LineField::Rate(value) => line.meta.base_rate = non_negative(value),
        LineField::Unit(unit) => line.meta.unit = Some(unit),
        LineField::Description(text) => line.description = Some(text),
        LineField::AvailableQuantity(value) => line.available_quantity = non_negative(value),
        _ => return false,
    }
    true
}

fn apply_expense_field(line: &mut ExpenseLine, field: LineField) -> bool {
    match field {
        LineField::PerUnit(value) => line.per_unit = Some(non_negative(value)),
        LineField::QtyRequired(value) => line.qty_required = non_negative(value),
        LineField::Rate(value) => line.rate = non_negative(value),
        LineField::Description(text) => line.details = Some(text),
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ingredient(per_unit: Decimal, base_rate: Decimal) -> IngredientLine {
        let mut line = IngredientLine::new();
        line.per_unit = Some(per_unit);
        line.meta.base_rate = base_rate;
        line
    }

    fn finished_good(percent: Decimal) -> FinishedGoodLine {
        let mut line = FinishedGoodLine::new();
        line.qty_fi_percent = Some(percent);
        line
    }

    #[test]
    fn test_factor_change_rescales_ingredients() {
        let mut formulation = Formulation::new(dec!(2), dec!(3));
        formulation.ingredients.push(ingredient(dec!(5), dec!(1)));
        formulation.recalculate_on_factor_or_batch_change(dec!(2), dec!(3));
        assert_eq!(formulation.ingredients[0].qty_required, dec!(30));

        formulation.recalculate_on_factor_or_batch_change(dec!(4), dec!(3));
        assert_eq!(formulation.ingredients[0].qty_required, dec!(60));
        assert_eq!(formulation.ingredients[0].per_unit, Some(dec!(5)));
    }

    #[test]
    fn test_line_without_ratio_keeps_quantity() {
        let mut formulation = Formulation::new(dec!(1), dec!(1));
        let mut line = ExpenseLine::new();
        line.qty_required = dec!(7);
        formulation.expenses.push(line);

        formulation.recalculate_on_factor_or_batch_change(dec!(9), dec!(2));
        assert_eq!(formulation.expenses[0].qty_required, dec!(7));
    }

    #[test]
    fn test_empty_collections_stay_empty() {
        let mut formulation = Formulation::new(dec!(1), dec!(1));
        formulation.recalculate_on_factor_or_batch_change(dec!(3), dec!(4));
        assert!(formulation.finished_goods.is_empty());
        assert!(formulation.ingredients.is_empty());
        assert!(formulation.expenses.is_empty());
    }

    #[test]
    fn test_finished_good_shares() {
        let mut formulation = Formulation::new(dec!(1), dec!(1));
        formulation.finished_goods = vec![finished_good(dec!(60)), finished_good(dec!(40))];
        formulation.recalculate_on_factor_or_batch_change(dec!(1), dec!(1));

        assert_eq!(formulation.finished_goods[0].quantity, dec!(0.6));
        assert_eq!(formulation.finished_goods[1].quantity, dec!(0.4));
        assert_eq!(formulation.finished_goods[0].cost_fi_percent, dec!(60));
        assert_eq!(formulation.finished_goods[1].cost_fi_percent, dec!(40));
    }

    #[test]
    fn test_zero_total_gives_zero_shares() {
        let mut formulation = Formulation::new(dec!(0), dec!(1));
        formulation.finished_goods = vec![finished_good(dec!(50)), finished_good(dec!(50))];
        formulation.recalculate_on_factor_or_batch_change(dec!(0), dec!(1));

        for line in &formulation.finished_goods {
            assert_eq!(line.quantity, Decimal::ZERO);
            assert_eq!(line.cost_fi_percent, Decimal::ZERO);
        }
    }

    #[test]
    fn test_base_quantity_uses_unit_multiplier() {
        let mut formulation = Formulation::new(dec!(1), dec!(10));
        let mut line = finished_good(dec!(100));
        line.meta.unit = Some("box".to_string());
        line.meta.multi_units.insert("box".to_string(), dec!(12));
        formulation.finished_goods.push(line);

        let mut plain = finished_good(dec!(0));
        plain.meta.unit = Some("kg".to_string());
        formulation.finished_goods.push(plain);

        formulation.recalculate_on_factor_or_batch_change(dec!(1), dec!(10));
        assert_eq!(formulation.finished_goods[0].quantity, dec!(10));
        assert_eq!(formulation.finished_goods[0].base_quantity, dec!(120));
        assert_eq!(formulation.finished_goods[1].base_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_quantity_edit_back_derives_ratio() {
        let mut formulation = Formulation::new(dec!(4), dec!(2));
        formulation.ingredients.push(ingredient(dec!(1), dec!(3)));
        formulation.recalculate_on_factor_or_batch_change(dec!(4), dec!(2));
        let id = formulation.ingredients[0].line_id;

        assert!(formulation.edit_line(id, LineField::QtyRequired(dec!(20))));
        assert_eq!(formulation.ingredients[0].qty_required, dec!(20));
        assert_eq!(formulation.ingredients[0].per_unit, Some(dec!(5)));
    }

    #[test]
    fn test_quantity_edit_with_zero_factor_keeps_quantity() {
        let mut formulation = Formulation::new(dec!(0), dec!(1));
        formulation.ingredients.push(IngredientLine::new());
        let id = formulation.ingredients[0].line_id;

        assert!(formulation.edit_line(id, LineField::QtyRequired(dec!(8))));
        assert_eq!(formulation.ingredients[0].qty_required, dec!(8));
        assert_eq!(formulation.ingredients[0].per_unit, Some(dec!(8)));
        assert_eq!(formulation.total_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_both_fields_changed_computes_forward() {
        let mut formulation = Formulation::new(dec!(2), dec!(1));
        formulation.expenses.push(ExpenseLine::new());
        let mut lines = formulation.expenses.clone();
        lines[0].per_unit = Some(dec!(3));
        lines[0].qty_required = dec!(100);

        formulation.handle_row_edit(LineCollection::Expenses(lines));
        assert_eq!(formulation.expenses[0].qty_required, dec!(6));
    }

    #[test]
    fn test_field_not_applicable_is_rejected() {
        let mut formulation = Formulation::new(dec!(1), dec!(1));
        let id = formulation.add_line(LineKind::Expense);
        assert!(!formulation.edit_line(id, LineField::QtyFiPercent(dec!(10))));
        assert!(!formulation.edit_line(Uuid::new_v4(), LineField::PerUnit(dec!(1))));
    }

    #[test]
    fn test_total_cost() {
        let mut formulation = Formulation::new(dec!(1), dec!(2));
        formulation.ingredients.push(ingredient(dec!(5), dec!(4)));
        let mut expense = ExpenseLine::new();
        expense.per_unit = Some(dec!(2));
        expense.rate = dec!(3);
        formulation.expenses.push(expense);
        formulation.recalculate_on_factor_or_batch_change(dec!(1), dec!(2));

        // ingredient: 10 × 4; expense: 2 × 3 × 4
        assert_eq!(formulation.total_cost(), dec!(64));
        assert_eq!(formulation.compute_totals().rm_factor, dec!(1));
    }

    #[test]
    fn test_negative_factor_is_clamped() {
        let formulation = Formulation::new(dec!(-3), dec!(-1));
        assert_eq!(formulation.rm_factor, Decimal::ZERO);
        assert_eq!(formulation.batch_size, Decimal::ZERO);
    }

    #[test]
    fn test_remove_line_refreshes_shares() {
        let mut formulation = Formulation::new(dec!(1), dec!(1));
        formulation.finished_goods = vec![finished_good(dec!(75)), finished_good(dec!(25))];
        formulation.recalculate_on_factor_or_batch_change(dec!(1), dec!(1));
        let first = formulation.finished_goods[0].line_id;

        assert!(formulation.remove_line(first));
        assert_eq!(formulation.finished_goods.len(), 1);
        assert_eq!(formulation.finished_goods[0].cost_fi_percent, dec!(100));
        assert!(!formulation.remove_line(first));
    }
}
