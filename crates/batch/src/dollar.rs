//! Dollar bars.
//!
//! A dollar bar closes once the traded value accumulated since the previous
//! bar reaches the dollar size. High and low are taken from the run's open
//! and close only, not from the prices in between.

use tickbar_core::{DollarSize, OhlcvBar, Result, TimestampSecs, TradeRow};
use tracing::debug;

/// Running state of the current dollar-bar run.
#[derive(Debug, Default)]
struct DollarAccumulator {
    open: f64,
    dollar_value: f64,
    volume: f64,
}

impl DollarAccumulator {
    /// Add one row to the run. Returns the bar if the run closed.
    fn push(
        &mut self,
        timestamp: TimestampSecs,
        open: f64,
        close: f64,
        dollar_value: f64,
        volume: f64,
        threshold: f64,
    ) -> Option<OhlcvBar> {
        if self.dollar_value == 0.0 {
            self.open = open;
        }
        self.dollar_value += dollar_value;
        self.volume += volume;

        if self.dollar_value < threshold {
            return None;
        }

        let bar = OhlcvBar {
            timestamp,
            open: self.open,
            high: self.open.max(close),
            low: self.open.min(close),
            close,
            volume: self.volume,
        };
        *self = Self::default();
        Some(bar)
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Aggregate archival trades into dollar bars.
///
/// Rows missing a price or quantity are skipped. A trailing run that never
/// reaches the dollar size is not emitted.
pub fn trades_to_dollar_bars(trades: &[TradeRow], dollar_size: &str) -> Result<Vec<OhlcvBar>> {
    let threshold = dollar_size.parse::<DollarSize>()?.value();

    let mut rows = trades.to_vec();
    rows.sort_by_key(|r| r.timestamp);

    let mut acc = DollarAccumulator::default();
    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for row in &rows {
        let (Some(price), Some(qty)) = (present(row.price), present(row.qty)) else {
            skipped += 1;
            continue;
        };
        if let Some(bar) = acc.push(row.timestamp, price, price, price * qty, qty, threshold) {
            bars.push(bar);
        }
    }

    debug!(rows = rows.len(), skipped, bars = bars.len(), "trades converted to dollar bars");
    Ok(bars)
}

/// Re-aggregate time bars into dollar bars.
///
/// Each bar contributes `close * volume` of traded value. The dollar bar opens
/// at the first constituent's open and closes at the last one's close.
pub fn time_bars_to_dollar_bars(bars: &[OhlcvBar], dollar_size: &str) -> Result<Vec<OhlcvBar>> {
    let threshold = dollar_size.parse::<DollarSize>()?.value();

    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.timestamp);

    let mut acc = DollarAccumulator::default();
    let out: Vec<OhlcvBar> = sorted
        .iter()
        .filter_map(|b| acc.push(b.timestamp, b.open, b.close, b.close * b.volume, b.volume, threshold))
        .collect();

    debug!(bars = sorted.len(), dollar_bars = out.len(), "time bars converted to dollar bars");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tickbar_core::Error;

    fn row(timestamp: i64, price: f64, qty: f64) -> TradeRow {
        TradeRow {
            timestamp,
            price: Some(price),
            qty: Some(qty),
        }
    }

    fn make_bar(timestamp: i64, open: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume,
        }
    }

    fn sample_trades() -> Vec<TradeRow> {
        vec![
            row(3, 10.0, 50.0),
            row(1, 20.0, 10.0),
            TradeRow {
                timestamp: 2,
                price: None,
                qty: Some(5.0),
            },
            row(4, 30.0, 20.0),
            row(5, 25.0, 40.0),
            row(6, 26.0, 1.0),
        ]
    }

    #[test]
    fn test_trades_to_dollar_bars() {
        let bars = trades_to_dollar_bars(&sample_trades(), "1k").unwrap();

        assert_eq!(bars.len(), 2);
        // 200 + 500 + 600 crosses 1000 on the trade at ts 4
        assert_eq!(
            bars[0],
            OhlcvBar {
                timestamp: 4,
                open: 20.0,
                high: 30.0,
                low: 20.0,
                close: 30.0,
                volume: 80.0,
            }
        );
        // A single trade worth exactly the dollar size closes its own bar
        assert_eq!(bars[1].timestamp, 5);
        assert_eq!(bars[1].open, 25.0);
        assert_eq!(bars[1].close, 25.0);
        assert_relative_eq!(bars[1].volume, 40.0);
    }

    #[test]
    fn test_high_low_from_endpoints_only() {
        let trades = vec![row(1, 100.0, 5.0), row(2, 500.0, 1.0), row(3, 101.0, 10.0)];
        let bars = trades_to_dollar_bars(&trades, "2k").unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].high, 101.0);
        assert_eq!(bars[0].low, 100.0);
        assert_relative_eq!(bars[0].volume, 16.0);
    }

    #[test]
    fn test_nan_rows_are_skipped() {
        let trades = vec![
            row(1, f64::NAN, 100.0),
            row(2, 10.0, f64::NAN),
            row(3, 10.0, 100.0),
        ];
        let bars = trades_to_dollar_bars(&trades, "1000").unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 3);
        assert_eq!(bars[0].volume, 100.0);
    }

    #[test]
    fn test_trailing_run_not_emitted() {
        let trades = vec![row(1, 10.0, 1.0), row(2, 10.0, 1.0)];
        assert!(trades_to_dollar_bars(&trades, "1M").unwrap().is_empty());
        assert!(trades_to_dollar_bars(&[], "1k").unwrap().is_empty());
    }

    #[test]
    fn test_dollar_bars_idempotent() {
        let trades = sample_trades();
        let snapshot = trades.clone();

        let first = trades_to_dollar_bars(&trades, "500").unwrap();
        let second = trades_to_dollar_bars(&trades, "500").unwrap();

        assert_eq!(first, second);
        assert_eq!(trades, snapshot);
    }

    #[test]
    fn test_invalid_dollar_size() {
        let err = trades_to_dollar_bars(&sample_trades(), "1.5k").unwrap_err();
        assert!(matches!(err, Error::InvalidDollarSize(_)));
        assert!(time_bars_to_dollar_bars(&[], "ten").is_err());
    }

    #[test]
    fn test_time_bars_to_dollar_bars() {
        let bars = vec![
            make_bar(60, 10.0, 11.0, 50.0),
            make_bar(0, 9.0, 10.0, 30.0),
            make_bar(120, 11.0, 12.0, 20.0),
            make_bar(180, 12.0, 12.5, 10.0),
        ];
        let out = time_bars_to_dollar_bars(&bars, "1k").unwrap();

        // 300 + 550 + 240 = 1090 closes on the bar at 120
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp, 120);
        assert_eq!(out[0].open, 9.0);
        assert_eq!(out[0].close, 12.0);
        assert_eq!(out[0].high, 12.0);
        assert_eq!(out[0].low, 9.0);
        assert_relative_eq!(out[0].volume, 100.0);

        assert_eq!(out, time_bars_to_dollar_bars(&bars, "1k").unwrap());
    }
}
