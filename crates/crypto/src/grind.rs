//! Locktime grinding.

use bitcoin::{absolute::LockTime, Transaction, TxOut};
use catbridge_primitives::{constants::MAX_GRIND_ATTEMPTS, Buf32, Buf64};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{errors::CryptoError, schnorr::CovenantKey, sighash::compute_sighash, SighashPreimage};

/// Everything a covenant witness needs to prove the sighash of the spending input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashGrindArtifact {
    pub preimage: SighashPreimage,
    pub challenge_minus_last_byte: [u8; 31],
    pub challenge_last_byte: u8,
    pub signature: Buf64,
}

impl SighashGrindArtifact {
    pub fn sighash(&self) -> Buf32 {
        self.preimage.sighash()
    }

    /// Reassembles the full 32-byte challenge.
    pub fn challenge(&self) -> Buf32 {
        let mut out = [0u8; 32];
        out[..31].copy_from_slice(&self.challenge_minus_last_byte);
        out[31] = self.challenge_last_byte;
        Buf32::new(out)
    }

    pub fn input_index(&self) -> u32 {
        self.preimage.input_index()
    }
}

/// Signs input `input_index` if the current locktime yields a usable challenge.
///
/// Returns `None` when the challenge's last byte is reserved.
pub fn try_sign(
    tx: &Transaction,
    prevouts: &[TxOut],
    leaf_hash: &Buf32,
    input_index: usize,
    key: &CovenantKey,
) -> Result<Option<SighashGrindArtifact>, CryptoError> {
    let (preimage, sighash) = compute_sighash(tx, prevouts, leaf_hash, input_index)?;
    let challenge = key.derive_challenge(&sighash);
    if challenge.is_reserved() {
        return Ok(None);
    }

    Ok(Some(SighashGrindArtifact {
        preimage,
        challenge_minus_last_byte: challenge.without_last_byte(),
        challenge_last_byte: challenge.last_byte(),
        signature: key.sign(&challenge),
    }))
}

/// Bumps the locktime of `tx` until input `input_index` can be signed.
pub fn grind_and_sign(
    tx: &mut Transaction,
    prevouts: &[TxOut],
    leaf_hash: &Buf32,
    input_index: usize,
    key: &CovenantKey,
) -> Result<SighashGrindArtifact, CryptoError> {
    grind(tx, MAX_GRIND_ATTEMPTS, |tx| {
        try_sign(tx, prevouts, leaf_hash, input_index, key)
    })
}

/// Bumps the locktime of `tx` until every listed `(input, leaf)` pair can be signed at once.
///
/// All covenant inputs of a transaction share its locktime, so they are ground together.
pub fn grind_and_sign_inputs(
    tx: &mut Transaction,
    prevouts: &[TxOut],
    targets: &[(usize, Buf32)],
    key: &CovenantKey,
) -> Result<Vec<SighashGrindArtifact>, CryptoError> {
    grind(tx, MAX_GRIND_ATTEMPTS, |tx| {
        let signed = targets
            .iter()
            .map(|(index, leaf_hash)| try_sign(tx, prevouts, leaf_hash, *index, key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(signed.into_iter().collect::<Option<Vec<_>>>())
    })
}

/// Tries `sign` at successive locktimes, starting from the current one, for at most
/// `max_attempts` values.
fn grind<T>(
    tx: &mut Transaction,
    max_attempts: u32,
    mut sign: impl FnMut(&Transaction) -> Result<Option<T>, CryptoError>,
) -> Result<T, CryptoError> {
    for attempt in 0..max_attempts {
        if let Some(signed) = sign(tx)? {
            debug!(attempt, lock_time = %tx.lock_time, "ground sighash");
            return Ok(signed);
        }

        let next = tx
            .lock_time
            .to_consensus_u32()
            .checked_add(1)
            .ok_or(CryptoError::LocktimeOverflow)?;
        trace!(attempt, next, "reserved challenge byte, bumping locktime");
        tx.lock_time = LockTime::from_consensus(next);
    }

    warn!(attempts = max_attempts, "sighash grinding exhausted");
    Err(CryptoError::GrindExhausted(max_attempts))
}
