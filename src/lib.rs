//! levelscope: support/resistance detection and relative performance
//! comparison over daily OHLCV series.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. [`pipeline`] wires ports to the
//! domain and [`cli`] drives it from the command line.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod pipeline;
pub mod cli;
