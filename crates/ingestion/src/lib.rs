//! Trade ingestion and streaming tick bars for the tick-bars system.
//!
//! This crate handles:
//! - Trade payload normalization (field aliases, side inference)
//! - Streaming tick bar building over a bounded ring buffer
//! - Historical backfill of the oldest end of the series
//! - The live feed loop from raw payloads to bars

pub mod normalizer;
pub mod series;
pub mod bar_builder;
pub mod backfill;
pub mod live;

pub use normalizer::{normalize_trade, TradeNormalizer};
pub use series::{BoundedBarSeries, Upsert};
pub use bar_builder::{BarUpdate, StreamingBarBuilder};
pub use backfill::{fill_historical_bars, BackfillOutcome, HistoricalBarSource, SharedBarBuilder};
pub use live::{FeedStats, LiveBarFeed};
