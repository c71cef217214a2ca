//! Logging subsystem.

pub mod manager;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::init;
pub use types::{FileLoggingConfig, LoggerConfig, StdoutConfig};

pub use tracing_appender::rolling::Rotation;

/// Formats a service name with an optional label suffix.
pub fn format_service_name(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
