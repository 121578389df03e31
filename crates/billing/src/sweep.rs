//! Expiry sweep.
//!
//! Periodic batch job: find every account whose paid period has lapsed and
//! force it down to the free tier. Each account is handled independently
//! (one failure never aborts the batch), and a re-run is a no-op because
//! the downgrade moves accounts out of the filter condition.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cancellation::force_free_downgrade;
use crate::error::BillingResult;
use crate::store::BillingStore;

/// Accounts downgraded concurrently within one sweep run.
const SWEEP_CONCURRENCY: usize = 8;

/// Per-account result of a sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub professional_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tally of one sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub total_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<SweepOutcome>,
}

pub struct ExpirySweepService {
    store: Arc<dyn BillingStore>,
}

impl ExpirySweepService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Downgrade every account whose subscription end date is strictly in
    /// the past. Only the initial query can fail the run as a whole.
    pub async fn run(&self) -> BillingResult<SweepReport> {
        let now = OffsetDateTime::now_utc();
        let expired = self.store.expired_professionals(now).await?;

        if expired.is_empty() {
            return Ok(SweepReport {
                total_processed: 0,
                succeeded: 0,
                failed: 0,
                results: Vec::new(),
            });
        }

        tracing::info!(count = expired.len(), "Sweeping expired subscriptions");

        let results: Vec<SweepOutcome> = stream::iter(expired.into_iter().map(|account| {
            let store = Arc::clone(&self.store);
            async move {
                match force_free_downgrade(store.as_ref(), account.id, now).await {
                    Ok(()) => SweepOutcome {
                        professional_id: account.id,
                        success: true,
                        error: None,
                    },
                    Err(e) => {
                        tracing::error!(
                            professional_id = %account.id,
                            error = %e,
                            "Failed to downgrade expired account"
                        );
                        SweepOutcome {
                            professional_id: account.id,
                            success: false,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        }))
        .buffer_unordered(SWEEP_CONCURRENCY)
        .collect()
        .await;

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;

        tracing::info!(
            total = results.len(),
            succeeded = succeeded,
            failed = failed,
            "Expiry sweep complete"
        );

        Ok(SweepReport {
            total_processed: results.len(),
            succeeded,
            failed,
            results,
        })
    }
}
