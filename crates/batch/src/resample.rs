//! Time-candle resampling.
//!
//! Buckets are aligned to midnight UTC of the first candle's day. Missing
//! values are ignored per column and never forward-filled.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use ordered_float::OrderedFloat;
use serde_json::Value;
use tickbar_core::{parse_datetime, Candle, Error, NormalizeError, ResampledBar, Result};
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;
const OHLC_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

/// Resample bucket width, parsed from strings like "30m", "1h", "15min" or "1d".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResampleInterval {
    seconds: i64,
}

impl ResampleInterval {
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        if seconds <= 0 {
            return Err(Error::invalid_interval(format!("{seconds}s")));
        }
        Ok(Self { seconds })
    }

    #[inline]
    pub fn seconds(self) -> i64 {
        self.seconds
    }
}

impl FromStr for ResampleInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let unit_seconds = match unit {
            "s" | "S" => 1,
            "m" | "min" | "T" => 60,
            "h" | "H" => 3_600,
            "d" | "D" => SECONDS_PER_DAY,
            _ => return Err(Error::invalid_interval(s)),
        };
        let count: i64 = digits.parse().map_err(|_| Error::invalid_interval(s))?;
        if count == 0 {
            return Err(Error::invalid_interval(s));
        }
        count
            .checked_mul(unit_seconds)
            .ok_or_else(|| Error::invalid_interval(s))
            .and_then(Self::from_seconds)
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

fn extreme(
    current: Option<f64>,
    candidate: Option<f64>,
    pick: fn(OrderedFloat<f64>, OrderedFloat<f64>) -> OrderedFloat<f64>,
) -> Option<f64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(pick(OrderedFloat(a), OrderedFloat(b)).into_inner()),
        (a, b) => a.or(b),
    }
}

fn utc_from_secs(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::Other(format!("timestamp {secs} out of range")))
}

/// Resample candles into buckets of `interval`.
///
/// Every bucket between the first and last candle is emitted; a bucket with
/// no data keeps all fields `None`. Volume is the sum of the present volumes.
pub fn resample_ohlc(candles: &[Candle], interval: &str) -> Result<Vec<ResampledBar>> {
    let step = interval.parse::<ResampleInterval>()?.seconds();

    let mut sorted = candles.to_vec();
    sorted.sort_by_key(|c| c.open_time);
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Ok(Vec::new());
    };

    let first_secs = first.open_time.timestamp();
    let origin = first_secs - first_secs.rem_euclid(SECONDS_PER_DAY);
    let bucket_of = |c: &Candle| (c.open_time.timestamp() - origin).div_euclid(step);
    let first_bucket = bucket_of(first);
    let bucket_count = (bucket_of(last) - first_bucket + 1) as usize;

    let mut bars = (0..bucket_count as i64)
        .map(|i| {
            Ok(ResampledBar {
                open_time: utc_from_secs(origin + (first_bucket + i) * step)?,
                open: None,
                high: None,
                low: None,
                close: None,
                volume: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for candle in &sorted {
        let bar = &mut bars[(bucket_of(candle) - first_bucket) as usize];
        if bar.open.is_none() {
            bar.open = present(candle.open);
        }
        bar.high = extreme(bar.high, present(candle.high), Ord::max);
        bar.low = extreme(bar.low, present(candle.low), Ord::min);
        if let Some(close) = present(candle.close) {
            bar.close = Some(close);
        }
        if let Some(volume) = present(candle.volume) {
            bar.volume = Some(bar.volume.unwrap_or(0.0) + volume);
        }
    }

    debug!(
        candles = sorted.len(),
        buckets = bars.len(),
        empty = bars.iter().filter(|b| b.is_empty()).count(),
        "resampled candles"
    );
    Ok(bars)
}

fn parse_origin_time(record: &Value) -> Result<DateTime<Utc>> {
    let unparseable = |value: &Value| NormalizeError::Unparseable {
        field: "origin_time".to_string(),
        value: value.to_string(),
    };

    match record.get("origin_time") {
        None | Some(Value::Null) => Err(NormalizeError::MissingField {
            field: "origin_time".to_string(),
        }
        .into()),
        Some(value @ Value::String(s)) => parse_datetime(s.trim()).ok_or_else(|| unparseable(value).into()),
        Some(value @ Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| unparseable(value).into()),
        Some(other) => Err(unparseable(other).into()),
    }
}

/// Build candles from JSON records keyed `origin_time`, `open`, `high`,
/// `low`, `close` and optionally `volume`.
///
/// `origin_time` is a date string or epoch seconds. Every OHLC column must be
/// present in at least one record and hold only numbers or nulls. A
/// non-numeric `volume` is treated as missing.
pub fn parse_candles(records: &[Value]) -> Result<Vec<Candle>> {
    let mut seen = [false; OHLC_COLUMNS.len()];
    let mut candles = Vec::with_capacity(records.len());

    for record in records {
        let open_time = parse_origin_time(record)?;

        let mut ohlc = [None; OHLC_COLUMNS.len()];
        for (i, column) in OHLC_COLUMNS.iter().enumerate() {
            match record.get(*column) {
                None => {}
                Some(Value::Null) => seen[i] = true,
                Some(Value::Number(n)) => {
                    seen[i] = true;
                    ohlc[i] = n.as_f64();
                }
                Some(other) => {
                    return Err(Error::non_numeric_columns(format!(
                        "column '{column}' holds non-numeric value {other}"
                    )))
                }
            }
        }

        let [open, high, low, close] = ohlc;
        candles.push(Candle {
            open_time,
            open,
            high,
            low,
            close,
            volume: record.get("volume").and_then(Value::as_f64),
        });
    }

    if !records.is_empty() {
        if let Some(i) = seen.iter().position(|s| !s) {
            return Err(Error::non_numeric_columns(format!(
                "missing column '{}'",
                OHLC_COLUMNS[i]
            )));
        }
    }
    Ok(candles)
}
