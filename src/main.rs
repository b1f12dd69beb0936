#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use rate_limiter_replica::server;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rate-limiter-replica", about = "Distributed sliding-window rate limiter replica")]
struct Cli {
    /// Path to the replica config file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address for the admit/gossip endpoints (overrides config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Admin listen address, for /healthz /readyz /metrics (overrides config file)
    #[arg(long)]
    admin_listen: Option<String>,

    /// Comma-delimited peer addresses, bare host:port (overrides config file)
    #[arg(long)]
    peers: Option<String>,

    /// Print debug-level logs
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let worker_threads = server::runtime::get_container_cpu_limit();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(server::bootstrap::BootstrapArgs {
        config_path: cli.config,
        listen: cli.listen,
        admin_listen: cli.admin_listen,
        peers: cli.peers,
        verbose: cli.verbose,
    }))
}
