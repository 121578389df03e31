//! BeautyOn Background Worker
//!
//! Handles scheduled jobs:
//! - Expiry sweep: downgrade accounts whose paid period has lapsed (hourly)
//! - Health check heartbeat (every 5 minutes)

use std::sync::Arc;
use std::time::Duration;

use beautyon_billing::{BillingService, SweepReport};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Log the outcome of one sweep run.
fn log_sweep_report(report: &SweepReport) {
    info!(
        total = report.total_processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "Expiry sweep cycle complete"
    );

    // Log individual failures
    for result in &report.results {
        if let Some(err) = &result.error {
            error!(
                professional_id = %result.professional_id,
                error = %err,
                "Failed to downgrade expired account"
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting BeautyOn Worker");

    // Create database pool
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = beautyon_shared::create_pool(&database_url).await?;

    // Create billing service
    let billing = match BillingService::from_env(pool) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            // If Stripe/Resend aren't configured, run in minimal mode
            warn!(error = %e, "Failed to create billing service - running in minimal mode");

            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                info!("Worker heartbeat (minimal mode)");
            }
        }
    };

    // Create scheduler
    let scheduler = JobScheduler::new().await?;

    // Job 1: Expiry sweep (hourly, on the half hour)
    // Downgrades every account whose subscription end date has passed.
    // Overlapping runs are safe: the filter no longer matches an account
    // once the first run has downgraded it.
    let sweep_billing = billing.clone();
    scheduler
        .add(Job::new_async("0 30 * * * *", move |_uuid, _l| {
            let billing = sweep_billing.clone();
            Box::pin(async move {
                info!("Running scheduled expiry sweep");
                match billing.sweep.run().await {
                    Ok(report) => log_sweep_report(&report),
                    Err(e) => error!(error = %e, "Expiry sweep failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Expiry sweep (hourly)");

    // Job 2: Health check heartbeat (every 5 minutes)
    scheduler
        .add(Job::new_async("0 */5 * * * *", |_uuid, _l| {
            Box::pin(async move {
                info!("Worker heartbeat - all systems operational");
            })
        })?)
        .await?;
    info!("Scheduled: Health check heartbeat (every 5 minutes)");

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("BeautyOn Worker started successfully with 2 scheduled jobs");

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
