//! Upstream JSON shapes

use crate::error::FetchError;
use bazaar_common::ProductPrice;
use serde::Deserialize;

/// `GET /products`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsResponse {
    pub success: bool,
    #[serde(rename = "productIds", default)]
    pub product_ids: Option<Vec<String>>,
    #[serde(default)]
    pub cause: Option<String>,
}

impl ProductsResponse {
    pub fn into_product_ids(self) -> Result<Vec<String>, FetchError> {
        if !self.success {
            return Err(FetchError::Rejected { cause: self.cause });
        }
        self.product_ids.ok_or(FetchError::Incomplete("productIds"))
    }
}

/// `GET /product`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(default)]
    pub product_info: Option<ProductInfo>,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    pub quick_status: QuickStatus,
}

/// Upstream names its fields after the order books: `buyPrice` is what buy
/// orders pay, `sellPrice` is what sell orders ask.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickStatus {
    #[serde(rename = "buyPrice")]
    pub buy_price: f64,
    #[serde(rename = "sellPrice")]
    pub sell_price: f64,
}

impl ProductResponse {
    pub fn into_price(self) -> Result<ProductPrice, FetchError> {
        if !self.success {
            return Err(FetchError::Rejected { cause: self.cause });
        }
        let status = self
            .product_info
            .ok_or(FetchError::Incomplete("product_info"))?
            .quick_status;

        // buying instantly fills against sell orders and vice versa
        Ok(ProductPrice::new(status.sell_price, status.buy_price))
    }
}
