use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("cannot build a tree from zero leaves")]
    EmptyInput,

    #[error("{0} leaves exceed the supported proof depth")]
    TooManyLeaves(usize),

    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
}
