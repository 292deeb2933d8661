use crate::cache::PriceTable;
use bazaar_client::{BazaarApi, FetchError};
use bazaar_common::RefreshConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("giving up on {product_id} after {failures} consecutive bad responses: {source}")]
    PayloadBudgetExhausted {
        product_id: String,
        failures: u32,
        #[source]
        source: FetchError,
    },
}

/// What to do when a product keeps failing.
///
/// Transient failures (transport, non-200) are always retried in place.
/// Malformed or rejected responses are retried in place too, until
/// `max_consecutive_payload_failures` of them happen back to back for the
/// same product; the refresher then stops with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_payload_failures: Option<u32>,
}

impl RetryPolicy {
    pub fn retry_forever() -> Self {
        Self {
            max_consecutive_payload_failures: None,
        }
    }

    pub fn with_budget(max_consecutive_payload_failures: u32) -> Self {
        Self {
            max_consecutive_payload_failures: Some(max_consecutive_payload_failures),
        }
    }

    fn exhausted(&self, failures: u32) -> bool {
        matches!(self.max_consecutive_payload_failures, Some(max) if failures >= max)
    }
}

/// Timing of the refresh loop
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    /// Sleep after every upstream call
    pub pacing: Duration,
    /// Sleep after every full pass
    pub cooldown: Duration,
    pub relist_every_passes: u64,
}

impl From<&RefreshConfig> for Schedule {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            pacing: config.pacing_interval(),
            cooldown: config.cooldown(),
            relist_every_passes: config.relist_every_passes.max(1),
        }
    }
}

/// Outcome of one pass over the product list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub updated: usize,
    pub retries: u32,
}

/// Lets other tasks ask the refresher to re-fetch the product list
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle {
    relist: Arc<AtomicBool>,
}

impl RefreshHandle {
    /// The list is re-fetched before the next pass starts
    pub fn request_relist(&self) {
        self.relist.store(true, Ordering::SeqCst);
    }

    fn take_relist_request(&self) -> bool {
        self.relist.swap(false, Ordering::SeqCst)
    }
}

/// Background task that keeps the price table fresh
pub struct Refresher {
    api: Arc<dyn BazaarApi>,
    table: Arc<PriceTable>,
    schedule: Schedule,
    policy: RetryPolicy,
    handle: RefreshHandle,
}

impl Refresher {
    pub fn new(
        api: Arc<dyn BazaarApi>,
        table: Arc<PriceTable>,
        schedule: Schedule,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            table,
            schedule,
            policy,
            handle: RefreshHandle::default(),
        }
    }

    pub fn from_config(api: Arc<dyn BazaarApi>, table: Arc<PriceTable>, config: &RefreshConfig) -> Self {
        let policy = RetryPolicy {
            max_consecutive_payload_failures: config.payload_failure_budget(),
        };
        Self::new(api, table, Schedule::from(config), policy)
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Refresh forever. Only returns when the retry policy gives up.
    pub async fn run(self) -> Result<(), RefreshError> {
        let mut products = self.load_products().await;
        let mut passes: u64 = 0;

        loop {
            self.run_pass(&products).await?;
            passes += 1;

            sleep(self.schedule.cooldown).await;

            let relist_requested = self.handle.take_relist_request();
            if relist_requested || passes % self.schedule.relist_every_passes == 0 {
                info!(passes, relist_requested, "Reloading product list");
                products = self.load_products().await;
            }
        }
    }

    /// Fetch the product list, retrying until upstream answers with a
    /// non-empty one
    pub async fn load_products(&self) -> Vec<String> {
        loop {
            match self.api.fetch_product_ids().await {
                Ok(products) if products.is_empty() => {
                    warn!(operation = "fetch_product_ids", "Upstream returned an empty product list, retrying");
                    sleep(self.schedule.pacing).await;
                }
                Ok(products) => {
                    info!("{} products loaded", products.len());
                    return products;
                }
                Err(e) => {
                    warn!(operation = "fetch_product_ids", error = %e, "Failed to load products, retrying");
                    sleep(self.schedule.pacing).await;
                }
            }
        }
    }

    /// Refresh every product once, in order
    pub async fn run_pass(&self, products: &[String]) -> Result<PassSummary, RefreshError> {
        info!("Data update started");
        let started = Instant::now();
        let mut summary = PassSummary::default();

        for product_id in products {
            summary.retries += self.refresh_product(product_id).await?;
            summary.updated += 1;
            sleep(self.schedule.pacing).await;
        }

        info!(
            updated = summary.updated,
            retries = summary.retries,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Data update completed"
        );
        Ok(summary)
    }

    /// Fetch one product until it succeeds or the policy gives up.
    /// Returns the number of retries it took.
    pub async fn refresh_product(&self, product_id: &str) -> Result<u32, RefreshError> {
        let mut retries = 0;
        let mut payload_failures = 0;

        loop {
            match self.api.fetch_product_price(product_id).await {
                Ok(price) => {
                    self.table.upsert(product_id, price);
                    return Ok(retries);
                }
                Err(e) if e.is_transient() => {
                    payload_failures = 0;
                    warn!(operation = "fetch_product_price", product_id, error = %e, "Transient failure, retrying");
                }
                Err(e) => {
                    payload_failures += 1;
                    if self.policy.exhausted(payload_failures) {
                        error!(operation = "fetch_product_price", product_id, failures = payload_failures, error = %e, "Retry budget exhausted");
                        return Err(RefreshError::PayloadBudgetExhausted {
                            product_id: product_id.to_string(),
                            failures: payload_failures,
                            source: e,
                        });
                    }
                    warn!(operation = "fetch_product_price", product_id, failures = payload_failures, error = %e, "Bad response, retrying");
                }
            }

            retries += 1;
            sleep(self.schedule.pacing).await;
        }
    }
}
