//! Trend indicators over bar closes.
//!
//! This crate provides:
//! - Regression trend angle over a short window
//! - Simple moving averages
//! - The combined SMA-angle feature set

pub mod angle;
pub mod sma;
pub mod trend;

pub use angle::{calculate_angle, windowed_angle, TrendAngle};
pub use sma::simple_moving_average;
pub use trend::{TrendAngleFeatures, TrendSnapshot};
