//! Live trade feed.
//!
//! Drains raw trade payloads from a channel into the shared bar builder.
//! Malformed payloads are logged and skipped. Optionally spawns one
//! historical backfill once the first bar opens.

use std::sync::Arc;

use serde_json::Value;
use tickbar_core::config::{BackfillConfig, Config, FieldAliases};
use tickbar_core::Result;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backfill::{fill_historical_bars, BackfillOutcome, HistoricalBarSource, SharedBarBuilder};
use crate::bar_builder::{BarUpdate, StreamingBarBuilder};
use crate::normalizer::TradeNormalizer;

/// Counters for a live feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Payloads received.
    pub received: u64,
    /// Payloads normalized and aggregated.
    pub accepted: u64,
    /// Payloads rejected by normalization.
    pub rejected: u64,
    /// Bars opened.
    pub bars_opened: u64,
    /// Bars that reached the tick threshold.
    pub bars_closed: u64,
}

impl FeedStats {
    /// Fraction of received payloads that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        if self.received > 0 {
            self.rejected as f64 / self.received as f64
        } else {
            0.0
        }
    }
}

/// Aborts the wrapped task when dropped, so cancelling the feed also
/// cancels its backfill.
struct AbortOnDrop(JoinHandle<BackfillOutcome>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Live feed from raw payloads to tick bars.
pub struct LiveBarFeed {
    builder: SharedBarBuilder,
    normalizer: TradeNormalizer,
    backfill: Option<(Arc<dyn HistoricalBarSource>, BackfillConfig)>,
    stats: FeedStats,
}

impl LiveBarFeed {
    /// Create a feed around a builder.
    pub fn new(builder: StreamingBarBuilder, aliases: FieldAliases) -> Self {
        Self {
            builder: Arc::new(Mutex::new(builder)),
            normalizer: TradeNormalizer::new(aliases),
            backfill: None,
            stats: FeedStats::default(),
        }
    }

    /// Create a feed from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let builder = StreamingBarBuilder::from_config(&config.tick_bars)?;
        Ok(Self::new(builder, config.aliases.clone()))
    }

    /// Backfill older bars from `source` once the first bar opens.
    pub fn with_backfill(mut self, source: Arc<dyn HistoricalBarSource>, config: BackfillConfig) -> Self {
        self.backfill = Some((source, config));
        self
    }

    /// Handle to the shared builder, for readers.
    pub fn builder(&self) -> SharedBarBuilder {
        Arc::clone(&self.builder)
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// Normalize and aggregate one payload. Returns `None` if it was rejected.
    pub async fn handle(&mut self, payload: &Value) -> Option<BarUpdate> {
        self.stats.received += 1;

        let trade = match self.normalizer.normalize(payload) {
            Ok(trade) => trade,
            Err(e) => {
                self.stats.rejected += 1;
                warn!(error = %e, "skipping malformed trade payload");
                return None;
            }
        };

        let update = self.builder.lock().await.add_trade(&trade);
        self.stats.accepted += 1;
        if update.opened {
            self.stats.bars_opened += 1;
        }
        if update.closed {
            self.stats.bars_closed += 1;
        }
        Some(update)
    }

    /// Consume payloads until the channel closes.
    ///
    /// Waits for an in-flight backfill before returning. Dropping the future
    /// cancels the backfill as well.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Value>) -> FeedStats {
        let mut backfill_task: Option<AbortOnDrop> = None;

        while let Some(payload) = rx.recv().await {
            let Some(update) = self.handle(&payload).await else {
                continue;
            };
            if update.opened && backfill_task.is_none() {
                backfill_task = self.spawn_backfill();
            }
        }

        info!(
            received = self.stats.received,
            rejected = self.stats.rejected,
            "trade channel closed"
        );

        if let Some(mut task) = backfill_task {
            match (&mut task.0).await {
                Ok(outcome) => debug!(?outcome, "backfill finished"),
                Err(e) => error!(error = %e, "backfill task failed"),
            }
        }
        self.stats
    }

    fn spawn_backfill(&self) -> Option<AbortOnDrop> {
        let (source, config) = self.backfill.clone()?;
        let builder = Arc::clone(&self.builder);
        let handle = tokio::spawn(async move {
            fill_historical_bars(&builder, source.as_ref(), &config).await
        });
        Some(AbortOnDrop(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tickbar_core::Bar;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn trade_payload(t: i64, price: &str, maker: bool) -> Value {
        json!({"e": "trade", "T": t * 1_000, "p": price, "q": "1.5", "m": maker, "s": "BTCUSDT"})
    }

    struct FixedHistory(Vec<Bar>);

    #[async_trait]
    impl HistoricalBarSource for FixedHistory {
        async fn fetch_bars(&self, end_timestamp: i64, limit: usize) -> anyhow::Result<Vec<Bar>> {
            let bars: Vec<Bar> = self
                .0
                .iter()
                .filter(|b| b.timestamp <= end_timestamp)
                .copied()
                .collect();
            let start = bars.len().saturating_sub(limit);
            Ok(bars[start..].to_vec())
        }
    }

    fn history_bar(timestamp: i64) -> Bar {
        Bar {
            timestamp,
            open: 90.0,
            high: 91.0,
            low: 89.0,
            close: 90.5,
            volume: 3.0,
            quote_volume: 271.5,
            trade_count: 2,
            taker_buy_base_volume: 1.0,
            taker_buy_quote_volume: 90.5,
        }
    }

    #[tokio::test]
    async fn test_skips_malformed_payloads() {
        init_tracing();
        let builder = StreamingBarBuilder::new(10, 2).unwrap();
        let feed = LiveBarFeed::new(builder, FieldAliases::binance_trade_stream());
        let shared = feed.builder();

        let (tx, rx) = mpsc::channel(16);
        tx.send(trade_payload(1, "100", true)).await.unwrap();
        tx.send(json!({"e": "trade", "T": 2, "p": "oops", "q": "1", "m": true, "s": "BTCUSDT"}))
            .await
            .unwrap();
        tx.send(trade_payload(3, "102", false)).await.unwrap();
        tx.send(json!({"e": "kline"})).await.unwrap();
        tx.send(trade_payload(4, "99", true)).await.unwrap();
        drop(tx);

        let stats = feed.run(rx).await;

        assert_eq!(stats.received, 5);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.bars_opened, 2);
        assert_eq!(stats.bars_closed, 1);
        assert!((stats.rejection_rate() - 0.4).abs() < 1e-12);

        let bars = shared.lock().await.bars();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].trade_count, 2);
        assert_eq!(bars[0].high, 102.0);
        assert!((bars[0].taker_buy_base_volume - 1.5).abs() < 1e-12);
        assert_eq!(bars[1].open, 99.0);
    }

    #[tokio::test]
    async fn test_backfill_after_first_bar() {
        let builder = StreamingBarBuilder::new(10, 2).unwrap();
        let history = FixedHistory((95..98).map(history_bar).collect());
        let feed = LiveBarFeed::new(builder, FieldAliases::binance_trade_stream())
            .with_backfill(Arc::new(history), BackfillConfig::default());
        let shared = feed.builder();

        let (tx, rx) = mpsc::channel(16);
        for (i, price) in ["100", "101", "102", "103"].iter().enumerate() {
            tx.send(trade_payload(100 + i as i64, price, i % 2 == 0)).await.unwrap();
        }
        drop(tx);

        let stats = feed.run(rx).await;
        assert_eq!(stats.accepted, 4);

        let timestamps: Vec<i64> = shared.lock().await.bars().iter().map(|b| b.timestamp).collect();
        assert_eq!(timestamps, vec![95, 96, 97, 100, 102]);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.tick_bars.max_records = 0;
        assert!(LiveBarFeed::from_config(&config).is_err());

        let feed = LiveBarFeed::from_config(&Config::default()).unwrap();
        assert_eq!(feed.builder().lock().await.threshold(), 500);
    }
}
