//! Binary Merkle trees over 32-byte digests, with fixed-depth inclusion proofs.
//!
//! Odd levels are completed by hashing the last node with itself. The same tree type backs the
//! account ledger (always full, `2^MERKLE_PROOF_DEPTH` leaves) and the request batches.

pub mod errors;
pub mod hasher;
pub mod proof;
pub mod tree;

pub use errors::MerkleError;
pub use hasher::{hash_node, MerkleHasher};
pub use proof::{MerkleProof, NodeSide, ProofNode};
pub use tree::MerkleTree;
