//! service-core: Shared infrastructure for the costing workspace.
pub mod config;
pub mod error;
pub mod observability;
