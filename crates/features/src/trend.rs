//! SMA trend-angle features.
//!
//! Three moving averages of bar closes, each followed by its trend angle
//! series. Used to gauge trend direction and strength over a bar history.

use serde::{Deserialize, Serialize};
use tickbar_core::config::TrendAngleConfig;
use tickbar_core::{Bar, Result};
use tracing::debug;

use crate::angle::TrendAngle;
use crate::sma::simple_moving_average;

/// Latest values of every feature series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub sma1: f64,
    pub sma2: f64,
    pub sma3: f64,
    pub sma1_angle: f64,
    pub sma2_angle: f64,
    pub sma3_angle: f64,
}

/// Feature series aligned with the input bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAngleFeatures {
    pub sma1: Vec<f64>,
    pub sma2: Vec<f64>,
    pub sma3: Vec<f64>,
    pub sma1_angle: Vec<f64>,
    pub sma2_angle: Vec<f64>,
    pub sma3_angle: Vec<f64>,
}

impl TrendAngleFeatures {
    /// Compute the features over `bars`, oldest first.
    ///
    /// Returns `Ok(None)` until there are more than `config.min_bars()` bars.
    pub fn compute(bars: &[Bar], config: &TrendAngleConfig) -> Result<Option<Self>> {
        config.validate()?;
        if bars.len() <= config.min_bars() {
            debug!(
                bars = bars.len(),
                required = config.min_bars() + 1,
                "not enough bars for trend features"
            );
            return Ok(None);
        }

        let angle = TrendAngle::new(config.angle_length)?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let sma1 = simple_moving_average(&closes, config.sma1_length);
        let sma2 = simple_moving_average(&closes, config.sma2_length);
        let sma3 = simple_moving_average(&closes, config.sma3_length);

        Ok(Some(Self {
            sma1_angle: angle.windowed_angle(&sma1),
            sma2_angle: angle.windowed_angle(&sma2),
            sma3_angle: angle.windowed_angle(&sma3),
            sma1,
            sma2,
            sma3,
        }))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.sma1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sma1.is_empty()
    }

    /// Values at the newest bar.
    pub fn latest(&self) -> Option<TrendSnapshot> {
        let i = self.len().checked_sub(1)?;
        Some(TrendSnapshot {
            sma1: self.sma1[i],
            sma2: self.sma2[i],
            sma3: self.sma3[i],
            sma1_angle: self.sma1_angle[i],
            sma2_angle: self.sma2_angle[i],
            sma3_angle: self.sma3_angle[i],
        })
    }
}
