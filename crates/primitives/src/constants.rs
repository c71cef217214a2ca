//! Protocol constants.

/// Number of requests aggregated into one batch.
pub const BATCH_SIZE: usize = 4;

/// Number of merge levels in a batch aggregation tree.
pub const BATCH_TREE_HEIGHT: usize = 2;

/// Depth of every Merkle proof, and of the account ledger tree.
pub const MERKLE_PROOF_DEPTH: usize = 4;

/// Number of account slots in the ledger.
pub const LEDGER_SIZE: usize = 1 << MERKLE_PROOF_DEPTH;

/// Prefix of every request leaf preimage, keeping request leaves apart from other digests the
/// covenants hash.
pub const REQUEST_LEAF_TAG: &[u8] = b"catbridge/request-leaf";

/// Challenge last-byte values a covenant script cannot increment without changing the width of
/// the pushed number.
pub const RESERVED_CHALLENGE_BYTES: [u8; 2] = [0x7f, 0xff];

/// Number of locktime values tried before grinding gives up.
pub const MAX_GRIND_ATTEMPTS: u32 = 1 << 16;

/// Largest amount covenant arithmetic can handle; scripts add amounts as 4-byte numbers.
pub const MAX_SCRIPT_AMOUNT: u64 = i32::MAX as u64;

/// x coordinate of the secp256k1 generator point.
pub const GENERATOR_X: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];

/// Unspendable taproot internal key (BIP-341 "H" point).
pub const NUMS_INTERNAL_KEY: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a, 0x5e,
    0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a, 0xc0,
];
