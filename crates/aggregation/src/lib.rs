//! Aggregation of deposit and withdrawal requests into a single covenant output.
//!
//! Each request gets a leaf transaction committing to its digest. Leaves are merged pairwise by
//! two-input covenant transactions until one root output commits to the Merkle root of the batch.
//! Every merge input proves, through its sighash preimage, that the two transactions it spends
//! are the ones described in its witness.

pub mod errors;
pub mod finalize;
pub mod leaf;
pub mod merge;
pub mod protocol;

pub use errors::AggregationError;
pub use finalize::{verify_finalize, FinalizeWitness};
pub use leaf::{
    create_deposit_leaf, create_ownership_proof, create_withdrawal_leaf, LeafData, LeafTx,
};
pub use merge::{merge_two, verify_merge, MergeOrigin, MergeTx, MergeWitness};
pub use protocol::{aggregate_deposits, aggregate_withdrawals, DepositAggregation, WithdrawalAggregation};
