//! Costing Engine - formulation cost allocation and receipt/payment
//! settlement allocation for the business dashboard.

pub mod config;
pub mod forms;
pub mod models;
pub mod services;
pub mod startup;
