use crate::error::FetchError;
use async_trait::async_trait;
use bazaar_common::ProductPrice;

/// Source of product identifiers and quotes
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait BazaarApi: Send + Sync {
    /// Fetch every product identifier the marketplace knows about
    async fn fetch_product_ids(&self) -> Result<Vec<String>, FetchError>;

    /// Fetch the current quote of one product
    async fn fetch_product_price(&self, product_id: &str) -> Result<ProductPrice, FetchError>;
}
