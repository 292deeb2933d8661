//! Upstream bazaar API access: wire shapes, HTTP client and the provider trait
//! the refresher is written against.

pub mod client;
pub mod error;
pub mod provider;
pub mod response;

pub use client::BazaarClient;
pub use error::FetchError;
pub use provider::BazaarApi;
#[cfg(any(test, feature = "mock"))]
pub use provider::MockBazaarApi;
