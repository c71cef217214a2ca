//! Hashing helpers matching the digests covenant scripts compute with `OP_SHA256`.

use sha2::{Digest, Sha256};

use crate::buf::Buf32;

/// Tag used by BIP-340 for Schnorr challenges.
pub const BIP340_CHALLENGE_TAG: &str = "BIP0340/challenge";

/// Tag used by BIP-341 for taproot signature hashes.
pub const TAP_SIGHASH_TAG: &str = "TapSighash";

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Buf32 {
    Buf32::new(Sha256::digest(data).into())
}

/// Double SHA-256, the hash used for txids and request leaves.
pub fn sha256d(data: &[u8]) -> Buf32 {
    sha256(sha256(data).as_slice())
}

/// SHA-256 over the concatenation of several byte strings.
pub fn hash_concat(parts: &[&[u8]]) -> Buf32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Buf32::new(hasher.finalize().into())
}

/// Returns `sha256(tag) || sha256(tag)`, the prefix of every tagged hash preimage.
pub fn tag_prefix(tag: &str) -> [u8; 64] {
    let tag_hash = sha256(tag.as_bytes());
    let mut prefix = [0u8; 64];
    prefix[..32].copy_from_slice(tag_hash.as_slice());
    prefix[32..].copy_from_slice(tag_hash.as_slice());
    prefix
}

/// BIP-340 tagged hash over the concatenation of `parts`.
pub fn tagged_hash(tag: &str, parts: &[&[u8]]) -> Buf32 {
    let prefix = tag_prefix(tag);
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    for part in parts {
        hasher.update(part);
    }
    Buf32::new(hasher.finalize().into())
}
