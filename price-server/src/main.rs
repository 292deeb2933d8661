use anyhow::{bail, Context, Result};
use bazaar_client::BazaarClient;
use bazaar_common::{FileConfig, RefreshConfig};
use bazaar_price_server::{router, PriceTable, RefreshHandle, Refresher};
use clap::Parser;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Caches bazaar prices and serves them over HTTP
#[derive(Debug, Parser)]
#[command(name = "bazaar-price-server", version, about)]
struct Cli {
    /// Upstream API key
    api_key: String,

    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// TOML file with a [refresh] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the upstream API base url
    #[arg(long)]
    endpoint: Option<String>,
}

impl Cli {
    fn refresh_config(&self) -> Result<RefreshConfig> {
        let mut config = match &self.config {
            Some(path) => {
                FileConfig::load(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
                    .refresh
            }
            None => RefreshConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.api_endpoint = endpoint.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.refresh_config()?;

    let table = Arc::new(PriceTable::new());
    let client = BazaarClient::new(cli.api_key.clone(), &config)
        .context("Failed to create bazaar client")?;

    info!(
        endpoint = client.endpoint(),
        pacing_ms = config.pacing_interval().as_millis() as u64,
        cooldown_secs = config.cooldown_secs,
        "Starting refresher"
    );
    let refresher = Refresher::from_config(Arc::new(client), table.clone(), &config);
    relist_on_hangup(refresher.handle());
    let mut refresh_task = tokio::spawn(refresher.run());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.listen))?;

    info!("Price server listening on http://{}", cli.listen);
    info!("Available endpoints:");
    info!("  GET /buy/{{id}} - instant buy price");
    info!("  GET /sell/{{id}} - instant sell price");
    info!("  GET /csv - every cached price as id,buy,sell");

    let server = axum::serve(listener, router(table))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        served = server => {
            refresh_task.abort();
            served.context("HTTP server failed")?;
            info!("Shut down");
            Ok(())
        }
        refreshed = &mut refresh_task => {
            match refreshed {
                Ok(Ok(())) => bail!("Refresher stopped unexpectedly"),
                Ok(Err(e)) => {
                    error!("Refresher gave up: {}", e);
                    Err(anyhow::Error::new(e).context("Refresher stopped"))
                }
                Err(e) => Err(anyhow::Error::new(e).context("Refresher task panicked")),
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// SIGHUP re-fetches the product list before the next pass
#[cfg(unix)]
fn relist_on_hangup(handle: RefreshHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, product list will be reloaded");
            handle.request_relist();
        }
    });
}

#[cfg(not(unix))]
fn relist_on_hangup(_handle: RefreshHandle) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_required() {
        assert!(Cli::try_parse_from(["bazaar-price-server"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["bazaar-price-server", "key"]).unwrap();
        assert_eq!(cli.api_key, "key");
        assert_eq!(cli.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());

        let config = cli.refresh_config().unwrap();
        assert_eq!(config.api_endpoint, bazaar_common::DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_endpoint_override() {
        let cli = Cli::try_parse_from([
            "bazaar-price-server",
            "key",
            "--endpoint",
            "http://127.0.0.1:9000",
            "--listen",
            "127.0.0.1:0",
        ])
        .unwrap();

        let config = cli.refresh_config().unwrap();
        assert_eq!(config.api_endpoint, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from([
            "bazaar-price-server",
            "key",
            "--config",
            "/definitely/not/here.toml",
        ])
        .unwrap();
        assert!(cli.refresh_config().is_err());
    }
}
