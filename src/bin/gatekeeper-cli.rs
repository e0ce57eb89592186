use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use serde_json::Value;

use request_gatekeeper::config::load_config;
use request_gatekeeper::ratelimit::{RateLimiter, StoreBackend};
use request_gatekeeper::security::identity::X_FORWARDED_FOR;
use request_gatekeeper::ClientIdentity;

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Operator CLI for the request gatekeeper", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the health endpoint
    Health,
    /// Send a burst of requests and report each decision
    Burst {
        /// Number of requests to send
        #[arg(short, long, default_value_t = 25)]
        count: u32,

        /// Path to request
        #[arg(short, long, default_value = "/")]
        path: String,

        /// Pose as this client through X-Forwarded-For
        #[arg(long)]
        forwarded_for: Option<String>,
    },
    /// Read an identity's counter straight from the store (uses REDIS_URL)
    Inspect {
        identity: String,

        /// TOML configuration file; environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Burst {
            count,
            path,
            forwarded_for,
        } => {
            let mut headers = HeaderMap::new();
            if let Some(ip) = forwarded_for {
                headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&ip)?);
            }

            let mut admitted = 0;
            for i in 1..=count {
                let res = client
                    .get(format!("{}{}", cli.url, path))
                    .headers(headers.clone())
                    .send()
                    .await?;
                let status = res.status();
                let remaining = header_or_dash(res.headers(), "x-ratelimit-remaining");
                let retry_after = header_or_dash(res.headers(), RETRY_AFTER.as_str());
                println!("{i:>4}  {status}  remaining={remaining}  retry-after={retry_after}");
                if status != reqwest::StatusCode::TOO_MANY_REQUESTS
                    && status != reqwest::StatusCode::SERVICE_UNAVAILABLE
                {
                    admitted += 1;
                }
            }
            println!("{admitted}/{count} admitted");
        }
        Commands::Inspect { identity, config } => {
            let config = load_config(config.as_deref())?;
            let backend = StoreBackend::from_config(&config.store)?;
            if matches!(backend, StoreBackend::Memory(_)) {
                eprintln!("In-memory counters live inside the server process and cannot be inspected");
                return Ok(());
            }

            let limiter = RateLimiter::new(&config, backend.store());
            let identity = ClientIdentity::from(identity);
            let key = limiter.key_for(&identity);
            match limiter.usage(&identity).await? {
                Some(record) => {
                    let ttl = record.ttl.map_or("-".to_string(), |t| format!("{}s", t.as_secs()));
                    println!(
                        "{key}  count={}/{}  ttl={ttl}",
                        record.count,
                        limiter.max_requests()
                    );
                }
                None => println!("{key}  absent (full quota of {})", limiter.max_requests()),
            }
        }
    }

    Ok(())
}

fn header_or_dash(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gatekeeper returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
