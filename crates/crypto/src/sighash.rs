//! BIP-341 tapscript signature hash, kept as its individual fields.

use bitcoin::{
    consensus::{encode::serialize, Encodable},
    OutPoint, ScriptBuf, Sequence, Transaction, TxOut,
};
use catbridge_primitives::{
    encoding::with_compact_size,
    hash::{sha256, tag_prefix, TAP_SIGHASH_TAG},
    Buf32, Buf64,
};
use serde::{Deserialize, Serialize};

use crate::errors::CryptoError;

/// `SIGHASH_DEFAULT`.
pub const HASH_TYPE_DEFAULT: u8 = 0x00;

/// Script-path spend without an annex (`ext_flag = 1`).
pub const SPEND_TYPE_SCRIPT_PATH: u8 = 0x02;

/// Tapscript key version.
pub const KEY_VERSION_0: u8 = 0x00;

/// Code separator position when no `OP_CODESEPARATOR` was executed.
pub const CODESEP_NONE: [u8; 4] = [0xff; 4];

/// The tagged preimage of a tapscript signature hash, split into the fields a covenant
/// witness carries.
///
/// The preimage starts with the doubled `TapSighash` tag hash so that a single SHA-256 over the
/// concatenation of all fields is the sighash itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashPreimage {
    pub tag_prefix: Buf64,
    pub epoch: u8,
    pub hash_type: u8,
    pub version: [u8; 4],
    pub lock_time: [u8; 4],
    pub hash_prevouts: Buf32,
    pub hash_spent_amounts: Buf32,
    pub hash_spent_scripts: Buf32,
    pub hash_sequences: Buf32,
    pub hash_outputs: Buf32,
    pub spend_type: u8,
    pub input_index: [u8; 4],
    pub leaf_hash: Buf32,
    pub key_version: u8,
    pub codesep_position: [u8; 4],
}

impl SighashPreimage {
    pub const LEN: usize = 64 + 1 + 1 + 4 + 4 + 32 * 5 + 1 + 4 + 32 + 1 + 4;

    /// Concatenates all fields in preimage order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(self.tag_prefix.as_slice());
        out.push(self.epoch);
        out.push(self.hash_type);
        out.extend_from_slice(&self.version);
        out.extend_from_slice(&self.lock_time);
        out.extend_from_slice(self.hash_prevouts.as_slice());
        out.extend_from_slice(self.hash_spent_amounts.as_slice());
        out.extend_from_slice(self.hash_spent_scripts.as_slice());
        out.extend_from_slice(self.hash_sequences.as_slice());
        out.extend_from_slice(self.hash_outputs.as_slice());
        out.push(self.spend_type);
        out.extend_from_slice(&self.input_index);
        out.extend_from_slice(self.leaf_hash.as_slice());
        out.push(self.key_version);
        out.extend_from_slice(&self.codesep_position);
        out
    }

    /// Splits a full preimage back into its fields.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::MalformedPreimage(bytes.len()));
        }

        let mut reader = FieldReader { bytes, pos: 0 };
        Ok(Self {
            tag_prefix: Buf64::new(reader.take()),
            epoch: reader.take::<1>()[0],
            hash_type: reader.take::<1>()[0],
            version: reader.take(),
            lock_time: reader.take(),
            hash_prevouts: Buf32::new(reader.take()),
            hash_spent_amounts: Buf32::new(reader.take()),
            hash_spent_scripts: Buf32::new(reader.take()),
            hash_sequences: Buf32::new(reader.take()),
            hash_outputs: Buf32::new(reader.take()),
            spend_type: reader.take::<1>()[0],
            input_index: reader.take(),
            leaf_hash: Buf32::new(reader.take()),
            key_version: reader.take::<1>()[0],
            codesep_position: reader.take(),
        })
    }

    pub fn sighash(&self) -> Buf32 {
        sha256(&self.to_bytes())
    }

    pub fn input_index(&self) -> u32 {
        u32::from_le_bytes(self.input_index)
    }

    pub fn lock_time(&self) -> u32 {
        u32::from_le_bytes(self.lock_time)
    }
}

struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl FieldReader<'_> {
    // Length is checked once up front.
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}

fn hash_encodables<'a, T: Encodable + 'a>(items: impl IntoIterator<Item = &'a T>) -> Buf32 {
    let bytes: Vec<u8> = items.into_iter().flat_map(|item| serialize(item)).collect();
    sha256(&bytes)
}

/// `sha_prevouts`: SHA-256 of every serialized outpoint.
pub fn hash_prevouts<'a>(outpoints: impl IntoIterator<Item = &'a OutPoint>) -> Buf32 {
    hash_encodables(outpoints)
}

/// `sha_amounts`: SHA-256 of every spent amount as 8 little-endian bytes.
pub fn hash_spent_amounts(amounts: impl IntoIterator<Item = u64>) -> Buf32 {
    let bytes: Vec<u8> = amounts.into_iter().flat_map(u64::to_le_bytes).collect();
    sha256(&bytes)
}

/// `sha_scriptpubkeys`: SHA-256 of every spent script with its compact-size length.
pub fn hash_spent_scripts<'a>(scripts: impl IntoIterator<Item = &'a ScriptBuf>) -> Buf32 {
    let bytes: Vec<u8> = scripts
        .into_iter()
        .flat_map(|s| with_compact_size(s.as_bytes()))
        .collect();
    sha256(&bytes)
}

/// `sha_sequences`: SHA-256 of every input sequence.
pub fn hash_sequences<'a>(sequences: impl IntoIterator<Item = &'a Sequence>) -> Buf32 {
    hash_encodables(sequences)
}

/// `sha_outputs`: SHA-256 of every serialized output.
pub fn hash_outputs<'a>(outputs: impl IntoIterator<Item = &'a TxOut>) -> Buf32 {
    hash_encodables(outputs)
}

/// Computes the tapscript sighash preimage of `input_index` spending the leaf `leaf_hash`.
pub fn compute_sighash(
    tx: &Transaction,
    prevouts: &[TxOut],
    leaf_hash: &Buf32,
    input_index: usize,
) -> Result<(SighashPreimage, Buf32), CryptoError> {
    if prevouts.len() != tx.input.len() {
        return Err(CryptoError::PrevoutCountMismatch {
            expected: tx.input.len(),
            actual: prevouts.len(),
        });
    }
    if input_index >= tx.input.len() {
        return Err(CryptoError::InputIndexOutOfRange {
            index: input_index,
            len: tx.input.len(),
        });
    }

    let preimage = SighashPreimage {
        tag_prefix: Buf64::new(tag_prefix(TAP_SIGHASH_TAG)),
        epoch: 0,
        hash_type: HASH_TYPE_DEFAULT,
        version: tx.version.0.to_le_bytes(),
        lock_time: tx.lock_time.to_consensus_u32().to_le_bytes(),
        hash_prevouts: hash_prevouts(tx.input.iter().map(|i| &i.previous_output)),
        hash_spent_amounts: hash_spent_amounts(prevouts.iter().map(|p| p.value.to_sat())),
        hash_spent_scripts: hash_spent_scripts(prevouts.iter().map(|p| &p.script_pubkey)),
        hash_sequences: hash_sequences(tx.input.iter().map(|i| &i.sequence)),
        hash_outputs: hash_outputs(&tx.output),
        spend_type: SPEND_TYPE_SCRIPT_PATH,
        input_index: (input_index as u32).to_le_bytes(),
        leaf_hash: *leaf_hash,
        key_version: KEY_VERSION_0,
        codesep_position: CODESEP_NONE,
    };
    let sighash = preimage.sighash();
    Ok((preimage, sighash))
}
