pub mod cache;
pub mod refresher;
pub mod routes;

pub use cache::PriceTable;
pub use refresher::{RefreshError, RefreshHandle, Refresher, RetryPolicy};
pub use routes::router;
