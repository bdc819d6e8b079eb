//! Port traits the domain is driven through.

pub mod cache_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
