//! Load-generating client simulator (§6, §4.5 ambient scope).
//!
//! Each simulated client loops: issue one admit request, then sleep a
//! uniformly random interval in `[0, 240] ms`; repeat until cancellation.
//! 240ms average sleep works out to ~500 QPM per client, which against a
//! typical `threshold`/`window` pairing puts a meaningful fraction of
//! requests over the limit — useful for exercising Deny paths by hand.

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use rate_limiter_replica::config::ClientSimConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const MAX_SLEEP_MS: u64 = 240;

#[derive(Parser)]
#[command(name = "client-sim", about = "Load-generating client simulator for the rate limiter")]
struct Cli {
    /// The replica's admit endpoint, e.g. http://localhost:8080/foo
    #[arg(short, long)]
    address: Option<String>,

    /// Number of concurrent simulated clients
    #[arg(long = "num-of-clients")]
    num_clients: Option<u32>,

    /// Maximum distinct ClientId (simulated clients are assigned i % max-client-id)
    #[arg(long = "max-client-id")]
    max_client_id: Option<u32>,

    /// Print debug-level logs
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> ClientSimConfig {
        let defaults = ClientSimConfig::default();
        ClientSimConfig {
            server_addr: self.address.unwrap_or(defaults.server_addr),
            num_clients: self.num_clients.unwrap_or(defaults.num_clients),
            max_client_id: self.max_client_id.unwrap_or(defaults.max_client_id),
            verbose: self.verbose || defaults.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config();

    if config.num_clients == 0 {
        anyhow::bail!("number of clients must be a positive number");
    }

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("client-sim: received SIGINT, stopping");
            shutdown.notify_waiters();
        });
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let mut handles = Vec::with_capacity(config.num_clients as usize);
    for i in 0..config.num_clients {
        let client_id = i % config.max_client_id.max(1) + 1;
        let address = config.server_addr.clone();
        let http = http.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(run_client(http, address, client_id, shutdown)));
    }

    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("client-sim: all simulated clients stopped");
    Ok(())
}

async fn run_client(http: reqwest::Client, address: String, client_id: u32, shutdown: Arc<Notify>) {
    let url = format!("{}?clientId={}", address, client_id);

    loop {
        match http.get(&url).send().await {
            Ok(resp) => {
                debug!("client-sim: response, client_id={}, status={}", client_id, resp.status());
            }
            Err(e) => {
                warn!("client-sim: request error, client_id={}, error={}", client_id, e);
            }
        }

        let sleep_ms = rand::thread_rng().gen_range(0..MAX_SLEEP_MS);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
            _ = shutdown.notified() => return,
        }
    }
}
