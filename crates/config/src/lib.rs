//! Operator configuration.

pub mod config;
pub mod errors;

pub use config::{Config, FundingConfig, LoggingConfig, OperatorConfig, ScriptsConfig};
pub use errors::ConfigError;
