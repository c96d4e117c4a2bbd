//! Command-line and environment configuration

pub mod db;
pub mod logging;

pub use db::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
