//! Shared type definitions
//!
//! Records and configuration shared across the storage layer.

pub mod config;
pub mod sheet;

pub use config::StoreConfig;
pub use sheet::Sheet;
