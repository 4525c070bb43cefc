//! Batch bar conversion.
//!
//! Stateless transforms over archival data:
//! - Trades or time bars into dollar bars
//! - Trades into fixed-count tick bars
//! - Time candles resampled to a coarser interval
//!
//! Every transform sorts a copy of its input and leaves the caller's slice
//! untouched, so repeated calls give identical output.

pub mod dollar;
pub mod resample;
pub mod tick;

pub use dollar::{time_bars_to_dollar_bars, trades_to_dollar_bars};
pub use resample::{parse_candles, resample_ohlc, ResampleInterval};
pub use tick::trades_to_tick_bars;
