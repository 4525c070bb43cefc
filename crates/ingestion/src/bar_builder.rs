//! Tick bar building from normalized trades.
//!
//! Builds fixed-trade-count OHLCV bars into a bounded series. Exactly one bar
//! is open at a time: the newest one, until its trade count reaches the
//! threshold.

use serde_json::Value;
use tickbar_core::config::{FieldAliases, TickBarConfig};
use tickbar_core::{Bar, BarRecord, Error, Result, Trade};
use tracing::{debug, warn};

use crate::normalizer::normalize_trade;
use crate::series::BoundedBarSeries;

/// What a single trade did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarUpdate {
    /// Logical index of the bar the trade landed in.
    pub index: usize,
    /// The trade opened a new bar.
    pub opened: bool,
    /// The bar reached the threshold with this trade.
    pub closed: bool,
}

/// Streaming tick bar builder over a bounded series.
#[derive(Debug, Clone)]
pub struct StreamingBarBuilder {
    series: BoundedBarSeries,
    /// Trades per bar.
    threshold: u32,
}

impl StreamingBarBuilder {
    /// Create a builder keeping at most `capacity` bars of `threshold` trades.
    pub fn new(capacity: usize, threshold: u32) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::config("tick threshold must be positive"));
        }
        Ok(Self {
            series: BoundedBarSeries::new(capacity)?,
            threshold,
        })
    }

    /// Create a builder from configuration.
    pub fn from_config(config: &TickBarConfig) -> Result<Self> {
        Self::new(config.max_records, config.tick_size)
    }

    /// Add a normalized trade.
    pub fn add_trade(&mut self, trade: &Trade) -> BarUpdate {
        let threshold = self.threshold;

        let extend = self
            .series
            .last()
            .map_or(false, |bar| bar.trade_count < threshold);

        let opened = if extend {
            if let Some(bar) = self.series.open_bar_mut() {
                bar.apply(trade);
            }
            false
        } else {
            if let Some(evicted) = self.series.push_back(Bar::open_with(trade)) {
                debug!(timestamp = evicted.timestamp, "evicted oldest tick bar");
            }
            true
        };

        let index = self.series.open_index().unwrap_or_default();
        let closed = self
            .series
            .last()
            .map_or(false, |bar| bar.trade_count >= threshold);

        if closed {
            if let Some(bar) = self.series.last() {
                debug!(
                    timestamp = bar.timestamp,
                    open = bar.open,
                    close = bar.close,
                    volume = bar.volume,
                    "tick bar closed"
                );
            }
        }

        BarUpdate {
            index,
            opened,
            closed,
        }
    }

    /// Add multiple normalized trades.
    pub fn add_trades(&mut self, trades: &[Trade]) {
        for trade in trades {
            self.add_trade(trade);
        }
    }

    /// Normalize a raw payload and add it. A rejected payload leaves the
    /// series unchanged.
    pub fn add_raw(&mut self, payload: &Value, aliases: &FieldAliases) -> Result<BarUpdate> {
        let trade = normalize_trade(payload, aliases)?;
        Ok(self.add_trade(&trade))
    }

    /// Prepend historical bars at the oldest end.
    ///
    /// `bars` must be sorted oldest first. Only bars strictly older than the
    /// current oldest bar are used, newest first, until the series is full.
    /// Bars failing [`Bar::is_consistent`] are skipped. Returns the number of
    /// bars inserted.
    pub fn prepend_history(&mut self, bars: &[Bar]) -> usize {
        let Some(oldest) = self.series.first().map(|b| b.timestamp) else {
            return 0;
        };

        let mut inserted = 0;
        for bar in bars.iter().rev().filter(|b| b.timestamp < oldest) {
            if !bar.is_consistent() {
                warn!(timestamp = bar.timestamp, ?bar, "skipping malformed historical bar");
                continue;
            }
            if self.series.push_front(*bar).is_err() {
                break;
            }
            inserted += 1;
        }
        inserted
    }

    /// The underlying series.
    pub fn series(&self) -> &BoundedBarSeries {
        &self.series
    }

    /// Bars, oldest first.
    pub fn bars(&self) -> Vec<Bar> {
        self.series.to_vec()
    }

    /// Positional records, oldest first.
    pub fn records(&self) -> Vec<BarRecord> {
        self.series.records()
    }

    /// The newest (possibly open) bar.
    pub fn last_bar(&self) -> Option<&Bar> {
        self.series.last()
    }

    /// Timestamp of the oldest bar.
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.series.first().map(|b| b.timestamp)
    }

    /// Whether the series holds `capacity` bars.
    pub fn is_ready(&self) -> bool {
        self.series.is_full()
    }

    /// Free slots left in the series.
    pub fn missing_records(&self) -> usize {
        self.series.remaining()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn capacity(&self) -> usize {
        self.series.capacity()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}
