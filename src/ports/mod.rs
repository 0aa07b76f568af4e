//! Port traits the domain depends on; adapters implement them.

pub mod config_port;
pub mod data_port;
pub mod result_port;
