//! Trade normalization.
//!
//! Maps heterogeneous exchange trade payloads onto the canonical [`Trade`]
//! using a caller-supplied [`FieldAliases`] table.

use serde_json::Value;
use tickbar_core::config::{FieldAliases, TimestampUnit};
use tickbar_core::{parse_datetime, NormalizeError, Side, TimestampSecs, Trade};

type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

/// Normalizes raw trade payloads against a fixed alias table.
#[derive(Debug, Clone)]
pub struct TradeNormalizer {
    aliases: FieldAliases,
}

impl TradeNormalizer {
    /// Create a normalizer for one payload shape.
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// The alias table in use.
    pub fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    /// Normalize a single payload.
    pub fn normalize(&self, payload: &Value) -> NormalizeResult<Trade> {
        normalize_trade(payload, &self.aliases)
    }
}

/// Normalize a trade-like JSON mapping into a canonical [`Trade`].
///
/// Fields are checked in order: timestamp, price, qty, side, symbol. The
/// first failure is returned.
pub fn normalize_trade(payload: &Value, aliases: &FieldAliases) -> NormalizeResult<Trade> {
    let timestamp = parse_timestamp(payload, &aliases.timestamp, aliases.timestamp_unit)?;
    let price = parse_number(payload, &aliases.price)?;
    let qty = parse_number(payload, &aliases.qty)?;
    let side = resolve_side(payload, aliases)?;
    let symbol = match payload.get(&aliases.symbol) {
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(NormalizeError::InvalidSymbol {
                field: aliases.symbol.clone(),
            })
        }
    };

    Ok(Trade {
        timestamp,
        price,
        qty,
        side,
        symbol,
    })
}

fn missing(field: &str) -> NormalizeError {
    NormalizeError::MissingField {
        field: field.to_string(),
    }
}

fn parse_timestamp(payload: &Value, field: &str, unit: TimestampUnit) -> NormalizeResult<TimestampSecs> {
    let unparseable = |value: &Value| NormalizeError::Unparseable {
        field: field.to_string(),
        value: value.to_string(),
    };

    match payload.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(value @ Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                // Zero is treated as an empty value
                if i == 0 {
                    return Err(missing(field));
                }
                return Ok(i.div_euclid(unit.per_second()));
            }
            match n.as_f64() {
                Some(f) if f == 0.0 => Err(missing(field)),
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                    Ok((f / unit.per_second() as f64).floor() as i64)
                }
                _ => Err(unparseable(value)),
            }
        }
        Some(Value::String(s)) if s.trim().is_empty() => Err(missing(field)),
        Some(value @ Value::String(s)) => parse_datetime(s.trim())
            .map(|dt| dt.timestamp())
            .ok_or_else(|| unparseable(value)),
        Some(other) => Err(unparseable(other)),
    }
}

fn parse_number(payload: &Value, field: &str) -> NormalizeResult<f64> {
    let non_numeric = |value: &Value| NormalizeError::NonNumeric {
        field: field.to_string(),
        value: value.to_string(),
    };

    match payload.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(value @ Value::Number(n)) => n.as_f64().ok_or_else(|| non_numeric(value)),
        Some(Value::String(s)) if s.is_empty() => Err(missing(field)),
        Some(value @ Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| non_numeric(value)),
        Some(other) => Err(non_numeric(other)),
    }
}

fn resolve_side(payload: &Value, aliases: &FieldAliases) -> NormalizeResult<Side> {
    if let Some(field) = &aliases.side {
        match payload.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.eq_ignore_ascii_case("buy") => return Ok(Side::Buy),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("sell") => return Ok(Side::Sell),
            Some(other) => {
                return Err(NormalizeError::InvalidSide {
                    field: field.clone(),
                    value: other.to_string(),
                })
            }
        }
    }

    if let Some(field) = &aliases.maker {
        match payload.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(true)) => return Ok(Side::Buy),
            Some(Value::Bool(false)) => return Ok(Side::Sell),
            Some(other) => {
                return Err(NormalizeError::InvalidSide {
                    field: field.clone(),
                    value: other.to_string(),
                })
            }
        }
    }

    Err(NormalizeError::SideUndetermined)
}
