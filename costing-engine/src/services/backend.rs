//! REST client for the dashboard backend.
//!
//! The forms depend on the traits below rather than on [`BackendClient`]
//! directly, so they can be driven by any transport.

use crate::config::BackendConfig;
use crate::models::{
    ExistingSettlement, ExpenseAccount, FormulationAck, FormulationSource, InventoryItem,
    OpenTransaction, SettlementAck, SettlementKind, SettlementPayload,
};
use crate::services::metrics::record_backend_request;
use crate::services::payload::FormulationPayload;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::error::AppError;
use service_core::observability::{TracedClientExt, TracedRequest};
use std::time::Instant;
use uuid::Uuid;

/// Source of catalog items used to hydrate formulation lines.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, AppError>;
    async fn expense_accounts(&self) -> Result<Vec<ExpenseAccount>, AppError>;
}

/// Persistence for formulation records.
#[async_trait]
pub trait FormulationStore: Send + Sync {
    async fn get_formulation(&self, id: i64) -> Result<FormulationSource, AppError>;
    async fn create_formulation(&self, payload: &FormulationPayload) -> Result<FormulationAck, AppError>;
    async fn update_formulation(
        &self,
        id: i64,
        payload: &FormulationPayload,
    ) -> Result<FormulationAck, AppError>;
}

/// Counterparty documents and settlement persistence.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    async fn outstanding_transactions(
        &self,
        kind: SettlementKind,
        counterparty_id: i64,
    ) -> Result<Vec<OpenTransaction>, AppError>;

    async fn get_settlement(&self, kind: SettlementKind, id: i64) -> Result<ExistingSettlement, AppError>;

    /// POST when `existing_id` is `None`, PUT otherwise.
    async fn submit_settlement(
        &self,
        kind: SettlementKind,
        existing_id: Option<i64>,
        payload: &SettlementPayload,
    ) -> Result<SettlementAck, AppError>;
}

/// HTTP implementation of every backend trait.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn prepare(&self, request: TracedRequest) -> TracedRequest {
        let request = request.timeout(self.config.timeout);
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T, AppError> {
        let url = self.url(path);
        tracing::debug!(operation, url = %url, "Backend GET");

        let request = self.prepare(self.client.traced_get(&url));
        self.execute(operation, request.send()).await
    }

    async fn send_json<B, T>(
        &self,
        operation: &str,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, AppError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(operation, url = %url, request_id = %request_id, method = %method, "Backend write");

        let request = if method == reqwest::Method::PUT {
            self.client.traced_put(&url)
        } else {
            self.client.traced_post(&url)
        };
        let request = self.prepare(request).json(body);
        self.execute(operation, request.send_with_request_id(&request_id))
            .await
    }

    async fn execute<T, F>(&self, operation: &str, pending: F) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        F: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let started = Instant::now();
        let response = match pending.await {
            Ok(response) => response,
            Err(e) => {
                record_backend_request(operation, "transport_error", started.elapsed().as_secs_f64());
                tracing::error!(operation, error = %e, "Backend request failed");
                return Err(AppError::Http(e));
            }
        };

        let status = response.status();
        let body = response.text().await?;
        record_backend_request(operation, status.as_str(), started.elapsed().as_secs_f64());

        if !status.is_success() {
            tracing::warn!(operation, status = %status, body = %body, "Backend returned an error");
            return Err(AppError::from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to decode backend response");
            AppError::Decode(e)
        })
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        self.get_json("inventory_items", "inventory-items").await
    }

    async fn expense_accounts(&self) -> Result<Vec<ExpenseAccount>, AppError> {
        self.get_json("expense_accounts", "expense-accounts").await
    }
}

#[async_trait]
impl FormulationStore for BackendClient {
    async fn get_formulation(&self, id: i64) -> Result<FormulationSource, AppError> {
        self.get_json("get_formulation", &format!("formulations/{}", id))
            .await
    }

    async fn create_formulation(&self, payload: &FormulationPayload) -> Result<FormulationAck, AppError> {
        self.send_json(
            "create_formulation",
            reqwest::Method::POST,
            "formulations",
            payload,
        )
        .await
    }

    async fn update_formulation(
        &self,
        id: i64,
        payload: &FormulationPayload,
    ) -> Result<FormulationAck, AppError> {
        self.send_json(
            "update_formulation",
            reqwest::Method::PUT,
            &format!("formulations/{}", id),
            payload,
        )
        .await
    }
}

#[async_trait]
impl SettlementBackend for BackendClient {
    async fn outstanding_transactions(
        &self,
        kind: SettlementKind,
        counterparty_id: i64,
    ) -> Result<Vec<OpenTransaction>, AppError> {
        self.get_json("outstanding_transactions", &kind.outstanding_path(counterparty_id))
            .await
    }

    async fn get_settlement(&self, kind: SettlementKind, id: i64) -> Result<ExistingSettlement, AppError> {
        self.get_json("get_settlement", &format!("{}/{}", kind.resource(), id))
            .await
    }

    async fn submit_settlement(
        &self,
        kind: SettlementKind,
        existing_id: Option<i64>,
        payload: &SettlementPayload,
    ) -> Result<SettlementAck, AppError> {
        match existing_id {
            Some(id) => {
                self.send_json(
                    "update_settlement",
                    reqwest::Method::PUT,
                    &format!("{}/{}", kind.resource(), id),
                    payload,
                )
                .await
            }
            None => {
                self.send_json(
                    "create_settlement",
                    reqwest::Method::POST,
                    kind.resource(),
                    payload,
                )
                .await
            }
        }
    }
}
