//! Covenant transaction templates, state records and script-side checks.
//!
//! A covenant script cannot inspect the transaction that created the output it guards. Instead
//! the spender supplies templates of the previous transactions, and the script recomputes their
//! txids and compares them against the `hashPrevouts` field of the sighash preimage. The types in
//! this crate define those templates, the state commitments they carry, the witness layout they
//! are pushed in, and the checks a script performs on them.

pub mod aggregator;
pub mod bridge;
pub mod context;
pub mod data;
pub mod errors;
pub mod expander;
pub mod scripts;
pub mod sum_tree;
pub mod template;
pub mod witness;

pub use aggregator::{AggregatorTx, OwnershipProofTx};
pub use bridge::{apply_batch, batch_total, BatchDirection, BridgeState, BridgeTx, SlotUpdate};
pub use context::ExecutionContext;
pub use data::{AccountData, AggregationData, BatchRequest, DepositData, WithdrawalData};
pub use errors::CovenantError;
pub use expander::ExpanderTx;
pub use scripts::{CovenantKind, CovenantScript, CovenantScripts};
pub use sum_tree::SumTree;
pub use template::{CovenantTemplate, FeeInput, OutputTemplate, TemplateInput, TxFrame};
pub use witness::{InputRole, WitnessItems, WitnessPlan};
