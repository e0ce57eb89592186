//! request-gatekeeper
//!
//! Runs the gatekeeper as a standalone HTTP service.
//!
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 RATE_LIMIT=20 EXPIRY_TIME=120 request-gatekeeper
//!
//! # with a config file (environment still wins):
//! request-gatekeeper --config gatekeeper.toml
//! ```
//!
//! See [`request_gatekeeper::config::loader`] for every variable.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_gatekeeper::config::{load_config, TrustedProxies};
use request_gatekeeper::lifecycle::{signals, startup, Shutdown};
use request_gatekeeper::observability::{logging, metrics};
use request_gatekeeper::GatekeeperServer;

#[derive(Parser, Debug)]
#[command(name = "request-gatekeeper", version)]
#[command(about = "Per-client HTTP rate limiting gatekeeper")]
struct Args {
    /// TOML configuration file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging depends on the config, so config errors go straight to stderr.
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("request-gatekeeper: {e}");
            std::process::exit(2);
        }
    };

    if args.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("request-gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        failure_policy = %config.store.failure_policy,
        exempt_paths = ?config.rate_limit.exempt_paths,
        "Configuration loaded"
    );
    if config.identity.trusted_proxies == TrustedProxies::Any {
        tracing::warn!("Forwarding headers are trusted from every peer; set TRUSTED_PROXIES to restrict");
    }

    if let Some(addr) = &config.observability.metrics_address {
        let addr: SocketAddr = addr.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let store = startup::open_store(&config, &shutdown).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatekeeperServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    // Stop background tasks that outlive the server.
    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
