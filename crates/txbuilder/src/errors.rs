use catbridge_covenant_types::CovenantError;
use catbridge_crypto::CryptoError;
use catbridge_primitives::AmountOverflow;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("insufficient funds: needed {needed} sat, available {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("fee utxo already taken by a transaction still being built")]
    FundingInFlight,

    #[error("no fee utxo available, fund the operator first")]
    MissingFunding,

    #[error("last output does not pay the operator fee script")]
    UnexpectedChangeScript,

    #[error("input {0} has no grinding artifact")]
    MissingArtifact(usize),

    #[error("input {index} out of range for transaction with {len} inputs")]
    InputIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    #[error("covenant: {0}")]
    Covenant(#[from] CovenantError),
}
