//! Core domain types and logic.

pub mod account;
pub mod backtest;
pub mod config_validation;
pub mod decision;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod pattern;
pub mod position;
pub mod strategy;
