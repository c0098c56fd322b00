//! Formulation editor integration tests for costing-engine.

mod common;

use common::{catalog, init_tracing, test_config};
use costing_engine::config::FormulationDefaults;
use costing_engine::forms::FormulationEditor;
use costing_engine::models::{Catalog, FormulationSource, FormulationTotals, LineField, LineKind};
use costing_engine::services::BackendClient;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(value: Value) -> FormulationSource {
    serde_json::from_value(value).expect("valid formulation source")
}

fn biscuit_formulation() -> FormulationSource {
    source(json!({
        "id": 5,
        "code": "F-BISC",
        "name": "Butter biscuits",
        "rmFactor": 2,
        "batchSize": 3,
        "products": [
            {"product_id": 10, "qtyFiPercent": 60, "unit": "box"},
            {"product_id": 11, "qtyFiPercent": 40}
        ],
        "ingredients": [
            {"inventory_item_id": 1, "perUnit": 5, "quantityRequired": 30, "availableQuantity": 100},
            {"inventory_item_id": 2, "perUnit": 1}
        ],
        "expenses": [
            {"expense_account_id": 7, "perUnit": 1, "rate": 10, "details": "Shift A"}
        ]
    }))
}

fn editor() -> FormulationEditor {
    init_tracing();
    FormulationEditor::new(catalog(), FormulationDefaults::default())
}

#[test]
fn factor_change_rescales_required_quantities() {
    let mut editor = editor();
    assert!(editor.load(&biscuit_formulation()));

    let flour = &editor.formulation().ingredients[0];
    assert_eq!(flour.qty_required, dec!(30));
    assert_eq!(flour.meta.name, "Flour");
    assert_eq!(flour.meta.base_rate, dec!(2.5));

    editor.set_rm_factor(dec!(4));
    let flour = &editor.formulation().ingredients[0];
    assert_eq!(flour.qty_required, dec!(60));
    assert_eq!(flour.per_unit, Some(dec!(5)));
    assert_eq!(editor.formulation().ingredients[1].qty_required, dec!(12));
}

#[test]
fn finished_good_percentages_drive_quantities() {
    let mut editor = editor();
    editor.load(&source(json!({
        "code": "F-SPLIT",
        "rmFactor": 1,
        "batchSize": 1,
        "products": [
            {"product_id": 10, "qtyFiPercent": 60},
            {"product_id": 11, "qtyFiPercent": 40}
        ]
    })));

    let goods = &editor.formulation().finished_goods;
    assert_eq!(goods[0].quantity, dec!(0.6));
    assert_eq!(goods[1].quantity, dec!(0.4));
    assert_eq!(goods[0].cost_fi_percent, dec!(60));
    assert_eq!(goods[1].cost_fi_percent, dec!(40));
}

#[test]
fn base_quantity_converts_through_unit_table() {
    let mut editor = editor();
    editor.load(&biscuit_formulation());

    // 60% of 2 × 3 = 3.6 boxes of 12
    let biscuits = &editor.formulation().finished_goods[0];
    assert_eq!(biscuits.quantity, dec!(3.6));
    assert_eq!(biscuits.base_quantity, dec!(43.2));

    // cookies have no multi-unit entry
    let cookies = &editor.formulation().finished_goods[1];
    assert_eq!(cookies.base_quantity, cookies.quantity);
}

#[test]
fn per_unit_and_quantity_edits_round_trip() {
    let mut editor = editor();
    editor.load(&biscuit_formulation());
    let sugar = editor.formulation().ingredients[1].line_id;

    assert!(editor.edit_line(sugar, LineField::PerUnit(dec!(7))));
    assert_eq!(editor.formulation().ingredients[1].qty_required, dec!(42));

    assert!(editor.edit_line(sugar, LineField::QtyRequired(dec!(9))));
    let line = &editor.formulation().ingredients[1];
    assert_eq!(line.qty_required, dec!(9));
    assert_eq!(line.per_unit, Some(dec!(4.5)));
}

#[test]
fn reload_of_same_record_keeps_edits() {
    let mut editor = editor();
    let record = biscuit_formulation();
    assert!(editor.load(&record));

    let flour = editor.formulation().ingredients[0].line_id;
    editor.edit_line(flour, LineField::PerUnit(dec!(8)));

    editor.refresh_catalog(catalog());
    assert!(!editor.load(&record));
    assert_eq!(editor.formulation().ingredients[0].per_unit, Some(dec!(8)));

    let other = source(json!({"id": 6, "code": "F-OTHER", "rmFactor": 1}));
    assert!(editor.load(&other));
    assert!(editor.formulation().ingredients.is_empty());
}

#[test]
fn change_listener_receives_every_recomputation() {
    let mut editor = editor();
    let published: Arc<Mutex<Vec<FormulationTotals>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    editor.on_change(move |totals| sink.lock().unwrap().push(totals.clone()));

    editor.load(&biscuit_formulation());
    editor.set_batch_size(dec!(1));
    let line = editor.add_line(LineKind::Expense);
    editor.remove_line(line);

    let published = published.lock().unwrap();
    assert_eq!(published.len(), 4);

    let last = published.last().unwrap();
    assert_eq!(last.rm_factor, dec!(2));
    // flour 10 × 2.5 + sugar 2 × 4 + labour 1 × 10 × 2
    assert_eq!(last.total_cost, dec!(53));
    assert_eq!(last.ingredients.len(), 2);
    assert_eq!(last.expenses.len(), 1);
}

#[test]
fn item_selection_replaces_metadata_only() {
    let mut editor = editor();
    editor.load(&biscuit_formulation());
    let flour = editor.formulation().ingredients[0].clone();

    assert!(editor.select_item(flour.line_id, 2));
    let line = &editor.formulation().ingredients[0];
    assert_eq!(line.meta.name, "Sugar");
    assert_eq!(line.meta.base_rate, dec!(4));
    assert_eq!(line.item_id, Some(2));
    assert_eq!(line.per_unit, flour.per_unit);
    assert_eq!(line.qty_required, flour.qty_required);
    assert_eq!(line.available_quantity, dec!(100));

    let expense = editor.formulation().expenses[0].line_id;
    assert!(editor.select_item(expense, 8));
    assert_eq!(editor.formulation().expenses[0].name, "Packaging");
    assert!(!editor.select_item(expense, 999));
}

#[test]
fn empty_catalog_keeps_record_names() {
    init_tracing();
    let mut editor = FormulationEditor::new(Catalog::default(), FormulationDefaults::default());
    editor.load(&source(json!({
        "id": 9,
        "rmFactor": 1,
        "ingredients": [{"inventory_item_id": 1, "name": "Flour (archived)", "perUnit": 2}]
    })));

    let line = editor.formulation().ingredients[0].clone();
    assert_eq!(line.meta.name, "Flour (archived)");
    assert_eq!(line.meta.base_rate, Decimal::ZERO);
    assert_eq!(line.qty_required, dec!(2));

    editor.refresh_catalog(catalog());
    assert!(editor.select_item(line.line_id, 1));
    assert_eq!(editor.totals().total_cost, dec!(5));
}

#[test]
fn zero_factor_never_poisons_totals() {
    let mut editor = editor();
    editor.load(&biscuit_formulation());
    editor.set_rm_factor(Decimal::ZERO);

    let flour = editor.formulation().ingredients[0].line_id;
    assert!(editor.edit_line(flour, LineField::QtyRequired(dec!(12))));

    let totals = editor.totals();
    assert_eq!(totals.ingredients[0].per_unit, Some(dec!(12)));
    assert!(totals
        .finished_goods
        .iter()
        .all(|line| line.cost_fi_percent == Decimal::ZERO));
    assert_eq!(totals.total_cost, dec!(30));
}

#[tokio::test]
async fn new_formulation_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/formulations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77, "code": "F-NEW"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(test_config(&server).backend);
    let mut editor = editor();
    editor.set_code("F-NEW");
    editor.set_name("New blend");
    let line = editor.add_line(LineKind::Ingredient);
    editor.select_item(line, 1);
    editor.edit_line(line, LineField::PerUnit(dec!(4)));

    let ack = editor.save(&client).await.expect("save succeeds");
    assert_eq!(ack.id, 77);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["code"], json!("F-NEW"));
    assert_eq!(body["rmFactor"], json!(1.0));
    assert_eq!(body["ingredients"][0]["inventory_item_id"], json!(1));
    assert_eq!(body["ingredients"][0]["quantityRequired"], json!(4.0));
    assert_eq!(body["ingredients"][0]["amount"], json!(10.0));
    assert_eq!(body["totalCost"], json!(10.0));
    assert_eq!(body["products"], json!([]));
}

#[tokio::test]
async fn loaded_formulation_is_updated_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/formulations/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(test_config(&server).backend);
    let mut editor = editor();
    editor.load(&biscuit_formulation());

    let ack = editor.save(&client).await.expect("update succeeds");
    assert_eq!(ack.id, 5);
}

#[tokio::test]
async fn failed_save_leaves_editor_state() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/formulations/5"))
        .respond_with(ResponseTemplate::new(409).set_body_string("code already used"))
        .mount(&server)
        .await;

    let client = BackendClient::new(test_config(&server).backend);
    let mut editor = editor();
    editor.load(&biscuit_formulation());
    let before = editor.totals();

    let err = editor.save(&client).await.unwrap_err();
    assert_eq!(err.kind(), "conflict");
    assert_eq!(editor.totals(), before);
}

#[test]
fn huge_inputs_saturate_totals() {
    let mut editor = editor();
    let huge = Decimal::from(1_000_000_000_000_000i64);

    let ingredient = editor.add_line(LineKind::Ingredient);
    assert!(editor.edit_line(ingredient, LineField::PerUnit(huge)));
    assert!(editor.edit_line(ingredient, LineField::Rate(huge)));

    let expense = editor.add_line(LineKind::Expense);
    assert!(editor.edit_line(expense, LineField::PerUnit(huge)));
    assert!(editor.edit_line(expense, LineField::Rate(huge)));

    let totals = editor.totals();
    assert_eq!(totals.ingredients[0].qty_required, huge);
    assert_eq!(totals.total_cost, Decimal::MAX);

    let payload = editor.payload();
    assert_eq!(payload.ingredients[0].amount, Decimal::MAX);
    assert_eq!(payload.expenses[0].amount, Decimal::MAX);
    assert!(serde_json::to_value(&payload).is_ok());
}

proptest! {
    #[test]
    fn finished_good_shares_sum_to_hundred(
        percents in prop::collection::vec(1u32..=100, 1..8),
        rm in 1u32..50,
        batch in 1u32..20,
    ) {
        let products: Vec<Value> = percents
            .iter()
            .map(|p| json!({"product_id": 10, "qtyFiPercent": p}))
            .collect();
        let mut editor = FormulationEditor::new(catalog(), FormulationDefaults::default());
        editor.load(&source(json!({"code": "F-PROP", "rmFactor": rm, "batchSize": batch, "products": products})));

        let sum: Decimal = editor
            .formulation()
            .finished_goods
            .iter()
            .map(|line| line.cost_fi_percent)
            .sum();
        prop_assert!((sum - dec!(100)).abs() < dec!(0.000001));
    }

    #[test]
    fn per_unit_edit_scales_by_factor_and_batch(
        per_unit in 0u32..10_000,
        rm in 1u32..100,
        batch in 1u32..50,
    ) {
        let mut editor = FormulationEditor::new(catalog(), FormulationDefaults::default());
        editor.set_rm_factor(Decimal::from(rm));
        editor.set_batch_size(Decimal::from(batch));
        let line = editor.add_line(LineKind::Ingredient);

        editor.edit_line(line, LineField::PerUnit(Decimal::from(per_unit)));
        prop_assert_eq!(
            editor.formulation().ingredients[0].qty_required,
            Decimal::from(rm * per_unit * batch)
        );
    }
}
