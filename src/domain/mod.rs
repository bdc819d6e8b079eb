//! Core domain types and logic.

pub mod ohlcv;
pub mod timeline;
pub mod pivot;
pub mod levels;
pub mod normalize;
pub mod ratio;
pub mod universe;
pub mod config_validation;
pub mod error;
