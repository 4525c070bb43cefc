//! Core data types for the tick-bars system.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Timestamp in seconds since Unix epoch (UTC).
pub type TimestampSecs = i64;

/// Number of fields in the positional bar record.
pub const BAR_RECORD_LEN: usize = 10;

/// Positional bar record consumed by downstream indicator code.
///
/// Field order: timestamp, open, high, low, close, volume, quote volume,
/// trade count, taker buy base volume, taker buy quote volume.
pub type BarRecord = [f64; BAR_RECORD_LEN];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a date string (RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.f]` or
/// `YYYY-MM-DD`). Naive values are taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buyer-initiated.
    Buy,
    /// Seller-initiated.
    Sell,
}

impl Side {
    /// Lowercase name as used by exchange payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        self == Side::Buy
    }
}

/// A single normalized trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Epoch seconds.
    pub timestamp: TimestampSecs,
    /// Trade price.
    pub price: f64,
    /// Trade quantity (base asset).
    pub qty: f64,
    /// Aggressor side.
    pub side: Side,
    /// Instrument symbol, e.g. "BTC-USDT".
    pub symbol: String,
}

impl Trade {
    /// Traded value in quote currency.
    #[inline]
    pub fn quote_volume(&self) -> f64 {
        self.price * self.qty
    }
}

/// Tick bar accumulated from consecutive trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Timestamp of the first trade.
    pub timestamp: TimestampSecs,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Base volume.
    pub volume: f64,
    /// Quote volume (sum of price * qty).
    pub quote_volume: f64,
    /// Number of trades.
    pub trade_count: u32,
    /// Base volume of buyer-initiated trades.
    pub taker_buy_base_volume: f64,
    /// Quote volume of buyer-initiated trades.
    pub taker_buy_quote_volume: f64,
}

impl Bar {
    /// Open a new bar from its first trade.
    pub fn open_with(trade: &Trade) -> Self {
        let quote_volume = trade.quote_volume();
        let (buy_base, buy_quote) = if trade.side.is_buy() {
            (trade.qty, quote_volume)
        } else {
            (0.0, 0.0)
        };

        Self {
            timestamp: trade.timestamp,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.qty,
            quote_volume,
            trade_count: 1,
            taker_buy_base_volume: buy_base,
            taker_buy_quote_volume: buy_quote,
        }
    }

    /// Fold another trade into this bar.
    pub fn apply(&mut self, trade: &Trade) {
        let quote_volume = trade.quote_volume();
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume += trade.qty;
        self.quote_volume += quote_volume;
        self.trade_count += 1;
        if trade.side.is_buy() {
            self.taker_buy_base_volume += trade.qty;
            self.taker_buy_quote_volume += quote_volume;
        }
    }

    /// Check the bar invariant: finite prices and volume, OHLC ordering, at
    /// least one trade.
    pub fn is_consistent(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());

        finite
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
            && self.trade_count >= 1
            && self.volume >= 0.0
    }

    /// Positional record, see [`BarRecord`].
    pub fn to_record(&self) -> BarRecord {
        [
            self.timestamp as f64,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.quote_volume,
            self.trade_count as f64,
            self.taker_buy_base_volume,
            self.taker_buy_quote_volume,
        ]
    }

    /// Build a bar from a positional record (e.g. a fetched kline row).
    ///
    /// No validation happens here; a NaN or negative trade count becomes 0.
    /// Check [`Bar::is_consistent`] before storing the result.
    pub fn from_record(record: &BarRecord) -> Self {
        Self {
            timestamp: record[0] as TimestampSecs,
            open: record[1],
            high: record[2],
            low: record[3],
            close: record[4],
            volume: record[5],
            quote_volume: record[6],
            trade_count: record[7] as u32,
            taker_buy_base_volume: record[8],
            taker_buy_quote_volume: record[9],
        }
    }
}

/// Archival trade row for batch conversion. Missing values are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    /// Epoch seconds.
    pub timestamp: TimestampSecs,
    pub price: Option<f64>,
    pub qty: Option<f64>,
}

impl From<&Trade> for TradeRow {
    fn from(t: &Trade) -> Self {
        Self {
            timestamp: t.timestamp,
            price: Some(t.price),
            qty: Some(t.qty),
        }
    }
}

/// Plain OHLCV bar used by the batch converters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Epoch seconds. For dollar and tick bars, the closing row's timestamp.
    pub timestamp: TimestampSecs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Archival time candle (typically 1-minute) with possibly missing values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time.
    pub open_time: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Output of the resample transform. All-missing buckets keep `None` fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampledBar {
    /// Bucket start, aligned to the resample interval.
    pub open_time: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl ResampledBar {
    /// Whether the bucket had no data at all.
    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.high.is_none() && self.low.is_none() && self.close.is_none()
    }
}

/// Dollar-bar threshold parsed from strings like "500k", "1M" or "250000".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DollarSize(pub u64);

impl DollarSize {
    #[inline]
    pub fn value(self) -> f64 {
        self.0 as f64
    }
}

impl FromStr for DollarSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (digits, multiplier) = if let Some(d) = trimmed.strip_suffix('k') {
            (d, 1_000)
        } else if let Some(d) = trimmed.strip_suffix('M') {
            (d, 1_000_000)
        } else {
            (trimmed, 1)
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_dollar_size(s));
        }
        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .map(DollarSize)
            .ok_or_else(|| Error::invalid_dollar_size(s))
    }
}
