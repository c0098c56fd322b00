//! Common test utilities for costing-engine integration tests.

#![allow(dead_code)]

use costing_engine::config::{BackendConfig, CostingConfig, FormulationDefaults};
use costing_engine::models::{Catalog, ExpenseAccount, InventoryItem, OpenTransaction};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::collections::HashMap;
use std::sync::Once;
use wiremock::MockServer;

static INIT: Once = Once::new();

pub const CUSTOMER_ID: i64 = 41;
pub const OTHER_CUSTOMER_ID: i64 = 42;

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,costing_engine=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Config pointing at a mock backend.
pub fn test_config(server: &MockServer) -> CostingConfig {
    CostingConfig {
        common: CommonConfig {
            service_name: "costing-engine-test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        backend: BackendConfig::new(server.uri()),
        formulation: FormulationDefaults::default(),
    }
}

pub fn flour() -> InventoryItem {
    InventoryItem {
        id: 1,
        name: "Flour".to_string(),
        category: Some("raw".to_string()),
        base_unit: Some("kg".to_string()),
        base_rate: dec!(2.5),
        selling_rate: None,
        multi_units: HashMap::new(),
    }
}

pub fn sugar() -> InventoryItem {
    InventoryItem {
        id: 2,
        name: "Sugar".to_string(),
        category: Some("raw".to_string()),
        base_unit: Some("kg".to_string()),
        base_rate: dec!(4),
        selling_rate: None,
        multi_units: HashMap::new(),
    }
}

/// Finished product sold by the box of 12.
pub fn biscuits() -> InventoryItem {
    let mut multi_units = HashMap::new();
    multi_units.insert("box".to_string(), dec!(12));
    InventoryItem {
        id: 10,
        name: "Biscuits".to_string(),
        category: Some("finished".to_string()),
        base_unit: Some("box".to_string()),
        base_rate: dec!(30),
        selling_rate: Some(dec!(45)),
        multi_units,
    }
}

pub fn cookies() -> InventoryItem {
    InventoryItem {
        id: 11,
        name: "Cookies".to_string(),
        category: Some("finished".to_string()),
        base_unit: Some("pack".to_string()),
        base_rate: dec!(20),
        selling_rate: Some(dec!(28)),
        multi_units: HashMap::new(),
    }
}

pub fn labour() -> ExpenseAccount {
    ExpenseAccount {
        id: 7,
        name: "Labour".to_string(),
        code: Some("EXP-LAB".to_string()),
    }
}

pub fn packaging() -> ExpenseAccount {
    ExpenseAccount {
        id: 8,
        name: "Packaging".to_string(),
        code: Some("EXP-PKG".to_string()),
    }
}

pub fn catalog() -> Catalog {
    Catalog::new(
        vec![flour(), sugar(), biscuits(), cookies()],
        vec![labour(), packaging()],
    )
}

pub fn catalog_json() -> (Value, Value) {
    (
        json!([
            {"id": 1, "name": "Flour", "category": "raw", "baseUnit": "kg", "baseRate": 2.5, "multiUnits": {}},
            {"id": 2, "name": "Sugar", "category": "raw", "baseUnit": "kg", "baseRate": 4, "multiUnits": {}},
            {"id": 10, "name": "Biscuits", "category": "finished", "baseUnit": "box", "baseRate": 30,
             "sellingRate": 45, "multiUnits": {"box": 12}}
        ]),
        json!([
            {"id": 7, "name": "Labour", "code": "EXP-LAB"}
        ]),
    )
}

pub fn open_transaction(id: i64, balance: Decimal) -> OpenTransaction {
    OpenTransaction {
        id,
        number: Some(format!("INV-{:04}", id)),
        date: None,
        outstanding_balance: balance,
    }
}
