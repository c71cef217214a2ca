use thiserror::Error;

/// An amount, or a sum of amounts, beyond what covenant arithmetic can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount {0} exceeds the covenant amount range")]
pub struct AmountOverflow(pub u64);
