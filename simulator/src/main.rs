mod telemetry;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use telemetry::{generate, Batch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pushes simulated sensor readings to a running ingestor.
#[derive(Debug, Parser)]
#[command(name = "sensor-simulator", version)]
struct Args {
    /// Base URL of the ingestor
    #[arg(long, env = "API_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Shared bearer secret
    #[arg(long, env = "API_KEY")]
    api_key: String,

    /// Requests per second
    #[arg(long, env = "RATE", default_value_t = 10)]
    rate: u64,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 10)]
    devices: usize,

    /// Readings per batch request; 0 posts single readings
    #[arg(long, env = "BATCH_SIZE", default_value_t = 0)]
    batch_size: usize,
}

#[derive(Debug, Default)]
struct Tally {
    accepted: u64,
    rejected: u64,
    failed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    anyhow::ensure!(
        (1..=1_000_000).contains(&args.rate),
        "rate must be between 1 and 1000000"
    );
    anyhow::ensure!(args.devices > 0, "devices must be positive");
    anyhow::ensure!(args.batch_size <= 100, "batch size must not exceed 100");

    info!("Starting sensor simulator");
    info!(
        "Target: {}, Rate: {} req/s, Devices: {}, Batch size: {}",
        args.url, args.rate, args.devices, args.batch_size
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let mut ticker = tokio::time::interval(Duration::from_micros(1_000_000 / args.rate));
    let mut rng = rand::thread_rng();
    let mut tally = Tally::default();
    let mut counter = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(
                    accepted = tally.accepted,
                    rejected = tally.rejected,
                    failed = tally.failed,
                    "Simulator stopped"
                );
                return Ok(());
            }
        }

        let device_id = format!("dev-{}", counter % args.devices as u64);
        let request = if args.batch_size == 0 {
            let reading = generate(&mut rng).with_device(device_id);
            client
                .post(format!("{}/api/v1/sensor-data", args.url))
                .json(&reading)
        } else {
            let size = rng.gen_range(1..=args.batch_size);
            let batch = Batch {
                device_id,
                readings: (0..size).map(|_| generate(&mut rng)).collect(),
            };
            client
                .post(format!("{}/api/v1/sensor-data/batch", args.url))
                .json(&batch)
        };

        match request.bearer_auth(&args.api_key).send().await {
            Ok(resp) if resp.status() == StatusCode::CREATED => tally.accepted += 1,
            Ok(resp) if resp.status() == StatusCode::BAD_REQUEST => tally.rejected += 1,
            Ok(resp) => {
                tally.failed += 1;
                warn!("Unexpected response status: {}", resp.status());
            }
            Err(e) => {
                tally.failed += 1;
                warn!("Failed to post telemetry: {}", e);
            }
        }

        counter += 1;
        if counter % 1000 == 0 {
            info!(
                sent = counter,
                accepted = tally.accepted,
                rejected = tally.rejected,
                failed = tally.failed,
                "Progress"
            );
        }
    }
}
