use catbridge_crypto::CryptoError;
use catbridge_merkle::MerkleError;
use catbridge_primitives::AmountOverflow;
use thiserror::Error;

/// A check a covenant script would fail on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CovenantError {
    #[error("hashPrevouts mismatch")]
    HashPrevoutsMismatch,

    #[error("hashSpentAmounts mismatch")]
    HashSpentAmountsMismatch,

    #[error("hashSpentScripts mismatch")]
    HashSpentScriptsMismatch,

    #[error("hashOutputs mismatch")]
    HashOutputsMismatch,

    #[error("sighash preimage does not hash to the spending input's sighash")]
    SighashMismatch,

    #[error("challenge does not match the preimage")]
    ChallengeMismatch,

    #[error("covenant signature invalid")]
    SignatureInvalid,

    #[error("challenge last byte {0:#04x} is reserved")]
    ReservedChallengeByte(u8),

    #[error("executing as input {actual}, expected input {expected}")]
    InputIndexMismatch { expected: u32, actual: u32 },

    #[error("covenant script mismatch")]
    ScriptMismatch,

    #[error("state hash mismatch")]
    StateHashMismatch,

    #[error("merged child was not built from this covenant's outputs")]
    AncestryMismatch,

    #[error("ownership proof does not match the withdrawal")]
    OwnershipMismatch,

    #[error("request not in the batch at its position")]
    ProofMismatch,

    #[error("account proof mismatch at slot {0}")]
    AccountMismatch(usize),

    #[error("amount mismatch")]
    AmountMismatch,

    #[error("balance underflow")]
    BalanceUnderflow,

    #[error("batch must hold exactly {expected} requests, got {actual}")]
    BatchSize { expected: usize, actual: usize },

    #[error("malformed template: {0}")]
    MalformedTemplate(&'static str),

    #[error("taproot: {0}")]
    Taproot(String),

    #[error("sighash: {0}")]
    Sighash(String),

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
