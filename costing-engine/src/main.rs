//! Costing Engine entry point: loads configuration, connects to the backend
//! and verifies the catalog can be fetched.

use costing_engine::config::CostingConfig;
use costing_engine::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = CostingConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.common.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )
    .map_err(|e| std::io::Error::other(format!("Tracing error: {}", e)))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        otlp_endpoint = ?config.common.otlp_endpoint,
        "Starting costing-engine"
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::other(format!("Application build error: {}", e))
    })?;

    let catalog = app.catalog();
    if catalog.is_empty() {
        tracing::warn!("Catalog is empty; formulation lines will keep their stored names");
    }
    tracing::info!(
        backend_url = %app.backend().base_url(),
        inventory_items = catalog.inventory_items.len(),
        expense_accounts = catalog.expense_accounts.len(),
        "Costing engine ready"
    );
    Ok(())
}
