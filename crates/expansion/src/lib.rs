//! Expansion of a settled withdrawal batch back into individual payouts.
//!
//! The expander output of a withdrawal settlement carries the batch total and, through the
//! bridge state, the root of the batch's sum tree. Each split spends one expander output into two,
//! each carrying one subtree and its sum, until a payout spends a single withdrawal's output to
//! the withdrawer's address.

pub mod errors;
pub mod payout;
pub mod protocol;
pub mod split;

#[cfg(test)]
mod fixtures;

pub use errors::ExpansionError;
pub use payout::{create_payout, verify_payout, PayoutTx, PayoutWitness};
pub use protocol::{expand, ExpansionResult};
pub use split::{create_split, verify_split, SplitChildren, SplitParent, SplitTx, SplitWitness};
