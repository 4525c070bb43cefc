//! Fixed-count tick bars from archival trades.

use tickbar_core::{Error, OhlcvBar, Result, TradeRow};
use tracing::debug;

/// Group trades into bars of exactly `tick_size` trades.
///
/// Rows missing a price or quantity are skipped and do not count toward a
/// bar. Each bar carries the timestamp of its closing trade. A trailing group
/// shorter than `tick_size` is dropped.
pub fn trades_to_tick_bars(trades: &[TradeRow], tick_size: usize) -> Result<Vec<OhlcvBar>> {
    if tick_size == 0 {
        return Err(Error::config("tick_size must be positive"));
    }

    let mut rows: Vec<(i64, f64, f64)> = trades
        .iter()
        .filter_map(|r| match (r.price, r.qty) {
            (Some(p), Some(q)) if !p.is_nan() && !q.is_nan() => Some((r.timestamp, p, q)),
            _ => None,
        })
        .collect();
    rows.sort_by_key(|&(ts, _, _)| ts);

    let bars: Vec<OhlcvBar> = rows
        .chunks_exact(tick_size)
        .map(|chunk| {
            let (_, open, _) = chunk[0];
            let (timestamp, close, _) = chunk[chunk.len() - 1];
            let (high, low, volume) = chunk.iter().fold(
                (f64::NEG_INFINITY, f64::INFINITY, 0.0),
                |(h, l, v), &(_, p, q)| (h.max(p), l.min(p), v + q),
            );
            OhlcvBar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect();

    let dropped = rows.len() % tick_size;
    if dropped > 0 {
        debug!(dropped, tick_size, "dropping incomplete trailing tick bar");
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: i64, price: f64, qty: f64) -> TradeRow {
        TradeRow {
            timestamp,
            price: Some(price),
            qty: Some(qty),
        }
    }

    #[test]
    fn test_groups_of_tick_size() {
        let trades = vec![
            row(1, 100.0, 1.0),
            row(2, 105.0, 2.0),
            row(3, 95.0, 1.0),
            row(4, 101.0, 3.0),
            row(5, 102.0, 1.0),
            row(6, 99.0, 1.0),
            row(7, 98.0, 1.0),
        ];
        let bars = trades_to_tick_bars(&trades, 3).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars[0],
            OhlcvBar {
                timestamp: 3,
                open: 100.0,
                high: 105.0,
                low: 95.0,
                close: 95.0,
                volume: 4.0,
            }
        );
        assert_eq!(bars[1].timestamp, 6);
        assert_eq!(bars[1].open, 101.0);
        assert_eq!(bars[1].high, 102.0);
        assert_eq!(bars[1].low, 99.0);
        assert_eq!(bars[1].volume, 5.0);
    }

    #[test]
    fn test_missing_rows_do_not_count() {
        let trades = vec![
            row(1, 10.0, 1.0),
            TradeRow {
                timestamp: 2,
                price: Some(11.0),
                qty: None,
            },
            row(3, 12.0, 1.0),
        ];
        let bars = trades_to_tick_bars(&trades, 2).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 3);
        assert_eq!(bars[0].high, 12.0);
    }

    #[test]
    fn test_sorts_copy_of_input() {
        let trades = vec![row(2, 20.0, 1.0), row(1, 10.0, 1.0)];
        let bars = trades_to_tick_bars(&trades, 2).unwrap();

        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].close, 20.0);
        assert_eq!(trades[0].timestamp, 2);
        assert_eq!(bars, trades_to_tick_bars(&trades, 2).unwrap());
    }

    #[test]
    fn test_zero_tick_size_rejected() {
        let err = trades_to_tick_bars(&[row(1, 1.0, 1.0)], 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_short_input_yields_nothing() {
        assert!(trades_to_tick_bars(&[row(1, 1.0, 1.0)], 2).unwrap().is_empty());
    }
}
