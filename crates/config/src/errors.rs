use std::io;

use catbridge_covenant_types::CovenantKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("operator secret key is not a valid 32-byte hex key")]
    InvalidSecretKey,

    #[error("invalid {kind} script: {reason}")]
    InvalidScript { kind: CovenantKind, reason: String },
}
