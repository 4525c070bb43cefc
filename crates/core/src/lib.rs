//! Core types and configuration for the tick-bars system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (trades, tick bars, archival rows and candles)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, NormalizeError, Result};
pub use types::*;
