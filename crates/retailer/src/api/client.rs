//! HTTP implementation of [`MarketplaceApi`].

use std::sync::Arc;

use agritrade_core::DeliveryAgentId;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{
    AgentLocation, ApiError, CreateOrderRequest, CreatePaymentIntentRequest, CreatedOrder,
    GatewayKey, MarketplaceApi, PaymentIntent, Product, VerificationResult, VerifyPaymentRequest,
    extract_error_message,
};
use crate::config::ApiConfig;

const CATALOG_KEY: &str = "products";

// =============================================================================
// MarketplaceClient
// =============================================================================

/// Client for the marketplace REST backend.
///
/// Cheap to clone; clones share the connection pool and the catalog cache.
#[derive(Clone)]
pub struct MarketplaceClient {
    inner: Arc<MarketplaceClientInner>,
}

struct MarketplaceClientInner {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
    catalog: Cache<&'static str, Arc<Vec<Product>>>,
}

impl std::fmt::Debug for MarketplaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceClient")
            .field("base_url", &self.inner.base_url)
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl MarketplaceClient {
    /// Build a client from API settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client could not be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("agritrade-retailer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let catalog = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.catalog_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(MarketplaceClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                token: config.token.clone(),
                catalog,
            }),
        })
    }

    /// Same client, authenticating as a different bearer token.
    ///
    /// The catalog cache is shared with `self`.
    #[must_use]
    pub fn with_token(&self, token: Option<SecretString>) -> Self {
        Self {
            inner: Arc::new(MarketplaceClientInner {
                client: self.inner.client.clone(),
                base_url: self.inner.base_url.clone(),
                token,
                catalog: self.inner.catalog.clone(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.client.request(method, self.url(path));
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and return the status with the raw body.
    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Marketplace API returned non-success status"
            );
        }

        Ok((status, body))
    }

    fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_error_message(status.as_u16(), body),
            });
        }

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse marketplace response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let (status, body) = self.send(self.request(Method::GET, path)).await?;
        Self::decode(status, &body)
    }

    async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let (status, body) = self
            .send(self.request(Method::POST, path).json(payload))
            .await?;
        Self::decode(status, &body)
    }
}

impl MarketplaceApi for MarketplaceClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.inner.catalog.get(CATALOG_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(products.as_ref().clone());
        }

        let products: Vec<Product> = self.get_json("products").await?;
        debug!(count = products.len(), "Catalog fetched");

        self.inner
            .catalog
            .insert(CATALOG_KEY, Arc::new(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        self.post_json("orders/create", request).await
    }

    #[instrument(skip(self))]
    async fn payment_key(&self) -> Result<GatewayKey, ApiError> {
        self.get_json("payments/key").await
    }

    #[instrument(skip(self), fields(orders = %request.order_ref, amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, ApiError> {
        self.post_json("payments/create-order", request).await
    }

    #[instrument(skip(self), fields(orders = %request.order_ref))]
    async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationResult, ApiError> {
        let (status, body) = self
            .send(self.request(Method::POST, "payments/verify-payment").json(request))
            .await?;

        // A rejected signature comes back as 400 with `success: false`.
        if status == StatusCode::BAD_REQUEST
            && let Ok(verdict) = serde_json::from_str::<VerificationResult>(&body)
            && !verdict.success
            && body.contains("\"success\"")
        {
            return Ok(verdict);
        }

        Self::decode(status, &body)
    }

    #[instrument(skip(self))]
    async fn agent_location(&self, agent: DeliveryAgentId) -> Result<AgentLocation, ApiError> {
        self.get_json(&format!("delivery-agents/{agent}/location"))
            .await
    }

    async fn invalidate_catalog(&self) {
        self.inner.catalog.invalidate(CATALOG_KEY).await;
        debug!("Catalog cache invalidated");
    }
}
