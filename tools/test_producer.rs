//! Test Transaction Producer
//!
//! Generates and publishes raw transactions to NATS for pipeline testing.

use chrono::{Datelike, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Raw transaction structure matching the pipeline's ingestion format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTransaction {
    channel: String,
    devicenameid: String,
    transactioncode: String,
    transactiontype: String,
    finaltrxyear: i32,
    finaltrxmonth: u32,
    finaltrxday: u32,
    finaltrxhour: u32,
    responsecode: i32,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a successful transaction stamped with the current instant
    fn generate_successful(&mut self) -> RawTransaction {
        self.generate(0)
    }

    /// Generate a failed transaction (error response code)
    fn generate_failed(&mut self) -> RawTransaction {
        let code = *self.random_choice(&[500, 91, 909]);
        self.generate(code)
    }

    /// Generate a transaction with an unparseable packed time, which the
    /// pipeline must reject and count
    fn generate_malformed(&mut self) -> RawTransaction {
        let mut tx = self.generate(0);
        tx.finaltrxhour = 87654321; // hour 87 cannot validate
        tx
    }

    fn generate(&mut self, responsecode: i32) -> RawTransaction {
        let now = Utc::now();
        let packed_time =
            now.hour() * 1_000_000 + now.minute() * 10_000 + now.second() * 100;

        RawTransaction {
            channel: self
                .random_choice(&["NEG", "APP", "WEB", "ATM", "POS"])
                .to_string(),
            devicenameid: self.random_choice(&["APP", "CAJERO", "WEB"]).to_string(),
            transactioncode: format!("{}", self.rng.gen_range(1000..9999)),
            transactiontype: self
                .random_choice(&["Monetaria", "No monetaria", "Administrativa"])
                .to_string(),
            finaltrxyear: now.year(),
            finaltrxmonth: now.month(),
            finaltrxday: now.day(),
            finaltrxhour: packed_time,
            responsecode,
        }
    }

    fn random_choice<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let error_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        error_rate = error_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, error_rate, delay_ms).await;
        }
    };

    // Generate and publish transactions
    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} transactions...", count);

    let mut successful_count = 0;
    let mut failed_count = 0;
    let mut malformed_count = 0;

    for i in 0..count {
        let transaction = if rng.gen_bool(0.02) {
            malformed_count += 1;
            generator.generate_malformed()
        } else if rng.gen_bool(error_rate) {
            failed_count += 1;
            generator.generate_failed()
        } else {
            successful_count += 1;
            generator.generate_successful()
        };

        let payload = serde_json::to_vec(&transaction)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} transactions ({} ok, {} failed, {} malformed)",
                i + 1,
                count,
                successful_count,
                failed_count,
                malformed_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Published {} transactions ({} ok, {} failed, {} malformed)",
        count, successful_count, failed_count, malformed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, error_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(error_rate) {
            generator.generate_failed()
        } else {
            generator.generate_successful()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
