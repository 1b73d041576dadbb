//! Transaction Monitoring Pipeline - Main Entry Point
//!
//! Consumes raw transactions from NATS, maintains per-channel rolling
//! metrics, periodically evaluates channels for statistical anomalies, and
//! scores each transaction for failure risk in parallel workers.

use anyhow::Result;
use chrono::Utc;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use transaction_monitoring_pipeline::{
    aggregator::WindowAggregator,
    anomaly::AnomalyDetector,
    config::AppConfig,
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    producer::AlertProducer,
    risk::{load_artifact, RiskArtifact, RiskScorer},
    types::transaction::{RawTransaction, TransactionRecord},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("transaction_monitoring_pipeline=info".parse()?),
        )
        .init();

    info!("Starting Transaction Monitoring Pipeline");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        window_size_seconds = config.window.window_size_seconds,
        z_threshold = config.anomaly.z_threshold,
        risk_alert_threshold = config.risk.alert_threshold,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Initialize the two independent pipelines: aggregation/anomaly state is
    // serialized behind locks (single-writer-per-channel discipline), risk
    // scoring is stateless and shares only the read-only artifact.
    let aggregator = Arc::new(Mutex::new(WindowAggregator::new(
        config.window.window_size_seconds,
    )));
    let detector = Arc::new(Mutex::new(AnomalyDetector::new(
        config.anomaly.z_threshold,
        config.anomaly.min_history,
    )));

    // A missing or corrupt artifact disables risk scoring only; aggregation
    // and anomaly detection continue unaffected.
    let artifact: Option<Arc<RiskArtifact>> = match load_artifact(&config.risk.artifact_dir) {
        Ok(artifact) => Some(Arc::new(artifact)),
        Err(e) => {
            warn!(error = %e, "Risk artifact unavailable, risk scoring disabled");
            None
        }
    };
    let scorer = Arc::new(RiskScorer::from_config(&config.risk));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(AlertProducer::new(client.clone(), &config.nats.alert_subject));

    info!(
        "Listening on subject: {}, publishing alerts to: {}",
        config.nats.transaction_subject, config.nats.alert_subject
    );

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Periodic anomaly evaluation over a consistent point-in-time view of
    // every channel
    {
        let aggregator = aggregator.clone();
        let detector = detector.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let interval_secs = config.anomaly.evaluation_interval_seconds;
        let timeout_ms = config.pipeline.timeout_ms;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                interval.tick().await;

                let snapshots = match aggregator.lock() {
                    Ok(mut agg) => agg.snapshot_all(Utc::now()),
                    Err(_) => continue,
                };
                if snapshots.is_empty() {
                    continue;
                }

                let deadline = Instant::now() + Duration::from_millis(timeout_ms);
                let outcome = match detector.lock() {
                    Ok(mut det) => det.evaluate_with_deadline(&snapshots, Some(deadline)),
                    Err(_) => continue,
                };
                if outcome.remaining > 0 {
                    warn!(
                        evaluated = outcome.evaluated,
                        remaining = outcome.remaining,
                        "Anomaly evaluation hit the batch deadline"
                    );
                }

                for alert in &outcome.alerts {
                    metrics.record_alert(alert.kind.as_str());
                }
                let dropped = producer.publish_batch(&outcome.alerts).await;
                if dropped > 0 {
                    metrics.record_alerts_dropped(dropped);
                }
            }
        });
    }

    // Semaphore to limit concurrent scoring tasks
    let semaphore = Arc::new(Semaphore::new(config.pipeline.workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let start_time = Instant::now();

        // Decode at the boundary; malformed or unreconstructable records are
        // counted and never enter the aggregator
        let record = match serde_json::from_slice::<RawTransaction>(&message.payload)
            .map_err(Into::into)
            .and_then(TransactionRecord::from_raw)
        {
            Ok(record) => record,
            Err(e) => {
                metrics.record_decode_rejected();
                warn!(error = %e, "Rejected transaction record");
                continue;
            }
        };

        // Aggregation path: serialized in this loop (single writer)
        match aggregator.lock() {
            Ok(mut agg) => {
                if let Err(e) = agg.insert(&record) {
                    metrics.record_out_of_order();
                    warn!(error = %e, "Dropped out-of-order record");
                    continue;
                }
            }
            Err(e) => {
                error!(error = %e, "Aggregator lock poisoned");
                break;
            }
        }
        metrics.record_ingested(start_time.elapsed());

        let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 100 == 0 {
            info!(
                processed = count,
                throughput = format!("{:.1} rec/s", metrics.get_throughput()),
                "Processing milestone"
            );
        }

        // Risk path: stateless, runs on bounded parallel workers
        let Some(artifact) = artifact.clone() else {
            continue;
        };
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let scorer = scorer.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let outcome = scorer.score_batch(std::slice::from_ref(&record), &artifact, None);
            if outcome.skipped > 0 {
                metrics.record_scoring_skipped(outcome.skipped as u64);
            }

            for alert in &outcome.alerts {
                metrics.record_alert(alert.kind.as_str());
                debug!(
                    alert_id = %alert.alert_id,
                    transaction_code = ?alert.details.transaction_id,
                    "Transaction risk alert"
                );
            }
            let dropped = producer.publish_batch(&outcome.alerts).await;
            if dropped > 0 {
                metrics.record_alerts_dropped(dropped);
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
