//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod fallback_source;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
