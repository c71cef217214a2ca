//! The bridge covenant: a ledger of account balances committed by a Merkle root.
//!
//! A settlement spends the current bridge output together with the root of an aggregated batch,
//! applies every request of the batch to the ledger and re-commits the new root. Withdrawal
//! settlements also lock the withdrawn total in an expander output, which expansion later splits
//! back into individual payouts.

pub mod engine;
pub mod errors;
pub mod ledger;
pub mod settlement;

pub use engine::{deploy, settle_deposits, settle_withdrawals, BridgeUtxo};
pub use errors::BridgeError;
pub use ledger::AccountLedger;
pub use settlement::{verify_settlement, SettlementWitness};
