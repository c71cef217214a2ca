use std::{io, path::PathBuf};

use catbridge_aggregation::AggregationError;
use catbridge_config::ConfigError;
use catbridge_txbuilder::BuildError;
use thiserror::Error;

/// Everything an operator run can stop on.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("cannot load config {path}: {source}")]
    LoadConfig { path: PathBuf, source: ConfigError },

    #[error("bad operator setup: {0}")]
    OperatorSetup(#[source] ConfigError),

    #[error("cannot fund the operator from the configured utxos: {0}")]
    Funding(#[source] BuildError),

    #[error("cannot read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("malformed JSON in {path}: {source}")]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteFile { path: PathBuf, source: io::Error },

    #[error("invalid batch: {0}")]
    InvalidBatch(#[source] AggregationError),

    #[error("operator funds exhausted mid-batch: {0}")]
    FundsExhausted(#[source] AggregationError),

    #[error("cannot build the aggregation tree: {0}")]
    TreeBuild(#[source] AggregationError),

    #[error("cannot encode result: {0}")]
    EncodeResult(#[source] serde_json::Error),
}

impl CliError {
    /// Whether the operator can recover by fixing the config or the request files.
    pub(crate) fn is_input_error(&self) -> bool {
        !matches!(self, Self::TreeBuild(_) | Self::EncodeResult(_))
    }

    /// Process exit code: 1 for bad input, 2 when the builder itself failed.
    pub(crate) fn exit_code(&self) -> i32 {
        if self.is_input_error() {
            1
        } else {
            2
        }
    }
}

impl From<AggregationError> for CliError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::InvalidBatchSize { .. }
            | AggregationError::ForeignWithdrawer(_)
            | AggregationError::AmountOverflow(_) => Self::InvalidBatch(e),
            AggregationError::Build(BuildError::InsufficientFunds { .. }) => {
                Self::FundsExhausted(e)
            }
            _ => Self::TreeBuild(e),
        }
    }
}
