use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("input index {index} out of range for {len} inputs")]
    InputIndexOutOfRange { index: usize, len: usize },

    #[error("expected {expected} prevouts, got {actual}")]
    PrevoutCountMismatch { expected: usize, actual: usize },

    #[error("malformed sighash preimage of {0} bytes")]
    MalformedPreimage(usize),

    #[error("sighash: {0}")]
    Sighash(String),

    #[error("secp256k1: {0}")]
    Secp(#[from] secp256k1::Error),

    #[error("invalid operator secret key")]
    InvalidSecretKey,

    #[error("no locktime in {0} attempts avoids the reserved challenge bytes")]
    GrindExhausted(u32),

    #[error("locktime overflowed while grinding")]
    LocktimeOverflow,
}
