//! Historical backfill of the bar series.
//!
//! Fills the free slots at the oldest end of a shared series with bars
//! fetched from an external source. The live path only touches the newest
//! end; both sides take the builder lock for each mutation and the lock is
//! never held across a fetch or a retry sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tickbar_core::config::BackfillConfig;
use tickbar_core::{Bar, TimestampSecs};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::bar_builder::StreamingBarBuilder;

/// Builder shared between the live feed and the backfill task.
pub type SharedBarBuilder = Arc<Mutex<StreamingBarBuilder>>;

/// Source of historical bars, e.g. an exchange REST client.
#[async_trait]
pub trait HistoricalBarSource: Send + Sync {
    /// Fetch up to `limit` bars with timestamps at or before `end_timestamp`,
    /// oldest first.
    async fn fetch_bars(&self, end_timestamp: TimestampSecs, limit: usize) -> anyhow::Result<Vec<Bar>>;
}

/// Result of one backfill cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// The series is full.
    Complete { inserted: usize, attempts: usize },
    /// The attempt budget ran out before the series filled up.
    Exhausted { inserted: usize, attempts: usize },
    /// The series has no bar to anchor the fetch on.
    NothingToAnchor,
}

/// Fetch attempts allowed per cycle for a series of `capacity` bars.
pub fn attempt_budget(capacity: usize) -> usize {
    capacity / 1000 + 1
}

/// Run one backfill cycle against the shared builder.
///
/// Every fetch attempt, failed or not, consumes budget. Failures are logged
/// and followed by `retry_delay_ms` of sleep. Running out of budget is not an
/// error: the cycle ends and the series keeps whatever was filled.
pub async fn fill_historical_bars<S>(
    builder: &SharedBarBuilder,
    source: &S,
    config: &BackfillConfig,
) -> BackfillOutcome
where
    S: HistoricalBarSource + ?Sized,
{
    let budget = attempt_budget(builder.lock().await.capacity());
    let retry_delay = Duration::from_millis(config.retry_delay_ms);
    let mut attempts = 0;
    let mut inserted = 0;

    loop {
        let (missing, oldest) = {
            let guard = builder.lock().await;
            (guard.missing_records(), guard.oldest_timestamp())
        };

        let Some(end_timestamp) = oldest else {
            return BackfillOutcome::NothingToAnchor;
        };
        if missing == 0 {
            info!(inserted, attempts, "historical backfill complete");
            return BackfillOutcome::Complete { inserted, attempts };
        }
        if attempts >= budget {
            error!(
                missing,
                attempts, "no historical data available for the requested number of bars"
            );
            return BackfillOutcome::Exhausted { inserted, attempts };
        }

        attempts += 1;
        // One extra bar: the source includes the bar at `end_timestamp` itself
        let limit = config.max_fetch_limit.min(missing + 1);

        match source.fetch_bars(end_timestamp, limit).await {
            Ok(mut bars) => {
                bars.sort_by_key(|b| b.timestamp);
                let added = builder.lock().await.prepend_history(&bars);
                inserted += added;
                info!(added, fetched = bars.len(), end_timestamp, "prepended historical bars");
            }
            Err(e) => {
                error!(
                    error = %e,
                    attempt = attempts,
                    "failed to fetch historical bars, retrying in {:?}",
                    retry_delay
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}
