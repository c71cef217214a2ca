use catbridge_aggregation::AggregationError;
use catbridge_covenant_types::CovenantError;
use catbridge_merkle::MerkleError;
use catbridge_primitives::{AmountOverflow, Buf20};
use catbridge_txbuilder::BuildError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("ledger has no free slot")]
    LedgerFull,

    #[error("no account for address {0:?}")]
    AccountNotFound(Buf20),

    #[error("slot {slot} holds {balance} sat, cannot withdraw {amount} sat")]
    InsufficientBalance { slot: usize, balance: u64, amount: u64 },

    #[error("settlement produced state {0} instead of the expected one")]
    StateMismatch(String),

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error("aggregation: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("build: {0}")]
    Build(#[from] BuildError),

    #[error("covenant: {0}")]
    Covenant(#[from] CovenantError),

    #[error("merkle: {0}")]
    Merkle(#[from] MerkleError),
}
