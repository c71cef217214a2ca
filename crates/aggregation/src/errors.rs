use catbridge_covenant_types::CovenantError;
use catbridge_merkle::MerkleError;
use catbridge_primitives::{AmountOverflow, Buf20};
use catbridge_txbuilder::BuildError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("invalid batch size: expected {expected} requests, got {actual}")]
    InvalidBatchSize { expected: usize, actual: usize },

    #[error("withdrawal address {0:?} is not the operator's address")]
    ForeignWithdrawer(Buf20),

    #[error("aggregation tree has no root")]
    EmptyTree,

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error("build: {0}")]
    Build(#[from] BuildError),

    #[error("covenant: {0}")]
    Covenant(#[from] CovenantError),

    #[error("merkle: {0}")]
    Merkle(#[from] MerkleError),
}
