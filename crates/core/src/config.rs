//! Configuration structures for the tick-bars system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, NormalizeError, Result};
use crate::types::DollarSize;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument configuration.
    pub instrument: InstrumentConfig,
    /// Streaming tick bar configuration.
    pub tick_bars: TickBarConfig,
    /// Batch dollar bar configuration.
    pub dollar_bars: DollarBarConfig,
    /// Historical backfill configuration.
    pub backfill: BackfillConfig,
    /// Trend angle feature configuration.
    pub trend_angle: TrendAngleConfig,
    /// Raw payload field aliases.
    pub aliases: FieldAliases,
}

impl Config {
    /// Parse a JSON configuration document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.tick_bars.tick_size == 0 {
            return Err(Error::config("tick_bars.tick_size must be positive"));
        }
        if self.tick_bars.max_records == 0 {
            return Err(Error::config("tick_bars.max_records must be positive"));
        }
        if self.backfill.max_fetch_limit == 0 {
            return Err(Error::config("backfill.max_fetch_limit must be positive"));
        }
        self.trend_angle.validate()?;
        self.dollar_bars
            .dollar_size
            .parse::<DollarSize>()
            .map_err(|e| Error::config(format!("dollar_bars.dollar_size: {e}")))?;
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Trading pair (e.g., "BTC-USDT").
    pub symbol: String,
    /// Exchange name.
    pub exchange: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC-USDT".to_string(),
            exchange: "binance_perpetual".to_string(),
        }
    }
}

/// Streaming tick bar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickBarConfig {
    /// Trades per bar.
    pub tick_size: u32,
    /// Capacity of the bounded bar series.
    pub max_records: usize,
}

impl Default for TickBarConfig {
    fn default() -> Self {
        Self {
            tick_size: 500,
            max_records: 150,
        }
    }
}

/// Dollar bar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DollarBarConfig {
    /// Dollar value per bar ("100k", "1M", ...).
    pub dollar_size: String,
}

impl Default for DollarBarConfig {
    fn default() -> Self {
        Self {
            dollar_size: "100k".to_string(),
        }
    }
}

/// Historical backfill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Delay between failed fetch attempts (ms).
    pub retry_delay_ms: u64,
    /// Maximum bars requested per fetch.
    pub max_fetch_limit: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
            max_fetch_limit: 1000,
        }
    }
}

/// Moving-average trend angle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAngleConfig {
    /// Fast SMA length.
    pub sma1_length: usize,
    /// Medium SMA length.
    pub sma2_length: usize,
    /// Slow SMA length.
    pub sma3_length: usize,
    /// Regression window for the angle.
    pub angle_length: usize,
}

impl TrendAngleConfig {
    /// Bars required before the features are meaningful.
    pub fn min_bars(&self) -> usize {
        self.sma1_length
            .max(self.sma2_length)
            .max(self.sma3_length)
            * self.angle_length
    }

    pub fn validate(&self) -> Result<()> {
        if self.angle_length < 3 {
            return Err(Error::config("trend_angle.angle_length must be at least 3"));
        }
        for (name, len) in [
            ("sma1_length", self.sma1_length),
            ("sma2_length", self.sma2_length),
            ("sma3_length", self.sma3_length),
        ] {
            if len < 2 {
                return Err(Error::config(format!("trend_angle.{name} must be at least 2")));
            }
        }
        Ok(())
    }
}

impl Default for TrendAngleConfig {
    fn default() -> Self {
        Self {
            sma1_length: 25,
            sma2_length: 50,
            sma3_length: 100,
            angle_length: 3,
        }
    }
}

/// Unit of integer and float timestamps in raw payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimestampUnit {
    /// Raw ticks per second.
    pub fn per_second(self) -> i64 {
        match self {
            TimestampUnit::Seconds => 1,
            TimestampUnit::Milliseconds => 1_000,
        }
    }
}

/// Names of the raw payload keys that carry each trade field.
///
/// At least one of `side` and `maker` must be set; `side` wins when both
/// resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAliases {
    pub timestamp: String,
    pub price: String,
    pub qty: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker: Option<String>,
    /// Unit of numeric timestamps; they are converted to epoch seconds.
    #[serde(default)]
    pub timestamp_unit: TimestampUnit,
}

impl FieldAliases {
    /// Aliases for payloads carrying an explicit "buy"/"sell" side.
    pub fn with_side(
        timestamp: impl Into<String>,
        price: impl Into<String>,
        qty: impl Into<String>,
        side: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            price: price.into(),
            qty: qty.into(),
            symbol: symbol.into(),
            side: Some(side.into()),
            maker: None,
            timestamp_unit: TimestampUnit::Seconds,
        }
    }

    /// Aliases for payloads carrying a boolean maker flag.
    pub fn with_maker(
        timestamp: impl Into<String>,
        price: impl Into<String>,
        qty: impl Into<String>,
        maker: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            price: price.into(),
            qty: qty.into(),
            symbol: symbol.into(),
            side: None,
            maker: Some(maker.into()),
            timestamp_unit: TimestampUnit::Seconds,
        }
    }

    /// Use `unit` for numeric timestamps.
    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }

    /// Build from a loose option map keyed `timestamp`, `price`, `qty`,
    /// `symbol`, `side` and/or `maker`, plus an optional `timestamp_unit`
    /// (`s` or `ms`).
    pub fn from_map(map: &HashMap<String, String>) -> std::result::Result<Self, NormalizeError> {
        let required = |key: &'static str| {
            map.get(key)
                .cloned()
                .ok_or(NormalizeError::MissingAlias(key))
        };

        let aliases = Self {
            timestamp: required("timestamp")?,
            price: required("price")?,
            qty: required("qty")?,
            symbol: required("symbol")?,
            side: map.get("side").cloned(),
            maker: map.get("maker").cloned(),
            timestamp_unit: match map.get("timestamp_unit").map(String::as_str) {
                None | Some("s") | Some("seconds") => TimestampUnit::Seconds,
                Some("ms") | Some("milliseconds") => TimestampUnit::Milliseconds,
                Some(other) => {
                    return Err(NormalizeError::Unparseable {
                        field: "timestamp_unit".to_string(),
                        value: other.to_string(),
                    })
                }
            },
        };
        if aliases.side.is_none() && aliases.maker.is_none() {
            return Err(NormalizeError::MissingAlias("side"));
        }
        Ok(aliases)
    }

    /// Binance trade stream: `{"T": .., "p": .., "q": .., "m": .., "s": ..}`.
    ///
    /// `T` is in milliseconds and is truncated to whole seconds.
    pub fn binance_trade_stream() -> Self {
        Self::with_maker("T", "p", "q", "m", "s").with_timestamp_unit(TimestampUnit::Milliseconds)
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self::binance_trade_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tick_bars.tick_size, 500);
        assert_eq!(config.tick_bars.max_records, 150);
        assert_eq!(config.backfill.retry_delay_ms, 1000);
        assert_eq!(config.trend_angle.min_bars(), 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "tick_bars": { "tick_size": 150, "max_records": 1000 },
            "aliases": { "timestamp": "time", "price": "price", "qty": "qty",
                         "side": "side", "symbol": "symbol" }
        }"#;
        let config = Config::from_json_str(json).unwrap();

        assert_eq!(config.tick_bars.tick_size, 150);
        assert_eq!(config.dollar_bars.dollar_size, "100k");
        assert_eq!(config.aliases.side.as_deref(), Some("side"));
        assert!(config.aliases.maker.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_tick_size() {
        let json = r#"{ "tick_bars": { "tick_size": 0, "max_records": 10 } }"#;
        assert!(matches!(Config::from_json_str(json), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_dollar_size() {
        let mut config = Config::default();
        config.dollar_bars.dollar_size = "1.5M".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_aliases_from_map() {
        let map: HashMap<String, String> = [
            ("timestamp", "t"),
            ("price", "p"),
            ("qty", "q"),
            ("maker", "m"),
            ("symbol", "S"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let aliases = FieldAliases::from_map(&map).unwrap();
        assert_eq!(aliases.maker.as_deref(), Some("m"));
        assert!(aliases.side.is_none());
    }

    #[test]
    fn test_angle_length_below_three_rejected() {
        let mut config = Config::default();
        config.trend_angle.angle_length = 2;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.trend_angle.angle_length = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timestamp_unit() {
        assert_eq!(
            FieldAliases::binance_trade_stream().timestamp_unit,
            TimestampUnit::Milliseconds
        );
        assert_eq!(TimestampUnit::default(), TimestampUnit::Seconds);

        let json = r#"{ "aliases": { "timestamp": "T", "price": "p", "qty": "q",
                         "maker": "m", "symbol": "s", "timestamp_unit": "milliseconds" } }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.aliases.timestamp_unit.per_second(), 1_000);

        let mut map: HashMap<String, String> = [
            ("timestamp", "t"),
            ("price", "p"),
            ("qty", "q"),
            ("side", "S"),
            ("symbol", "s"),
            ("timestamp_unit", "ms"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(
            FieldAliases::from_map(&map).unwrap().timestamp_unit,
            TimestampUnit::Milliseconds
        );

        map.insert("timestamp_unit".into(), "ns".into());
        assert!(matches!(
            FieldAliases::from_map(&map),
            Err(NormalizeError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_aliases_from_map_missing_keys() {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert("timestamp".into(), "t".into());
        assert_eq!(
            FieldAliases::from_map(&map),
            Err(NormalizeError::MissingAlias("price"))
        );

        map.insert("price".into(), "p".into());
        map.insert("qty".into(), "q".into());
        map.insert("symbol".into(), "S".into());
        assert_eq!(
            FieldAliases::from_map(&map),
            Err(NormalizeError::MissingAlias("side"))
        );
    }
}
