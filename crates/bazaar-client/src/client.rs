use crate::error::FetchError;
use crate::provider::BazaarApi;
use crate::response::{ProductResponse, ProductsResponse};
use async_trait::async_trait;
use bazaar_common::{ProductPrice, RefreshConfig};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

const USER_AGENT: &str = "bazaar-price-cache/0.1";

/// HTTP client for the bazaar API
pub struct BazaarClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BazaarClient {
    /// Every request made by this client is bounded by `config.request_timeout()`.
    pub fn new(api_key: impl Into<String>, config: &RefreshConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.endpoint, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Debug for BazaarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BazaarClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl BazaarApi for BazaarClient {
    async fn fetch_product_ids(&self) -> Result<Vec<String>, FetchError> {
        self.get_json::<ProductsResponse>("products", &[])
            .await?
            .into_product_ids()
    }

    async fn fetch_product_price(&self, product_id: &str) -> Result<ProductPrice, FetchError> {
        self.get_json::<ProductResponse>("product", &[("productId", product_id)])
            .await?
            .into_price()
    }
}
