//! Shared pieces of covenant transaction templates.

use bitcoin::{
    consensus::encode::{serialize, VarInt},
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
};
use catbridge_crypto::sighash::{hash_outputs, hash_prevouts, hash_spent_amounts, hash_spent_scripts};
use catbridge_primitives::{encoding::with_compact_size, hash::sha256d, Buf32};
use serde::{Deserialize, Serialize};

use crate::errors::CovenantError;

/// A template input. Script sigs are always empty and sequences always final.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub txid: Buf32,
    pub vout: u32,
}

impl TemplateInput {
    pub fn new(txid: Buf32, vout: u32) -> Self {
        Self { txid, vout }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(Txid::from(self.txid), self.vout)
    }

    /// Serialized as in a non-witness transaction.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(41);
        out.extend_from_slice(self.txid.as_slice());
        out.extend_from_slice(&self.vout.to_le_bytes());
        out.push(0);
        out.extend_from_slice(&Sequence::MAX.to_consensus_u32().to_le_bytes());
        out
    }
}

impl TryFrom<&TxIn> for TemplateInput {
    type Error = CovenantError;

    fn try_from(input: &TxIn) -> Result<Self, Self::Error> {
        if !input.script_sig.is_empty() || input.sequence != Sequence::MAX {
            return Err(CovenantError::MalformedTemplate("non-final input"));
        }
        Ok(Self::new(
            input.previous_output.txid.into(),
            input.previous_output.vout,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTemplate {
    pub amount: u64,
    pub script: ScriptBuf,
}

impl OutputTemplate {
    pub fn new(amount: u64, script: ScriptBuf) -> Self {
        Self { amount, script }
    }

    pub fn to_txout(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount),
            script_pubkey: self.script.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.amount.to_le_bytes().to_vec();
        out.extend(with_compact_size(self.script.as_bytes()));
        out
    }
}

impl From<&TxOut> for OutputTemplate {
    fn from(output: &TxOut) -> Self {
        Self::new(output.value.to_sat(), output.script_pubkey.clone())
    }
}

/// The operator-funded input every covenant transaction carries for its fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInput {
    pub txid: Buf32,
    pub vout: u32,
    pub amount: u64,
    pub script: ScriptBuf,
}

impl FeeInput {
    pub fn input(&self) -> TemplateInput {
        TemplateInput::new(self.txid, self.vout)
    }

    pub fn outpoint(&self) -> OutPoint {
        self.input().outpoint()
    }

    pub fn prevout(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount),
            script_pubkey: self.script.clone(),
        }
    }
}

/// Version, inputs and locktime of a template; the parts every covenant kind shares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFrame {
    pub version: i32,
    pub inputs: Vec<TemplateInput>,
    pub lock_time: u32,
}

impl TxFrame {
    pub fn from_tx(tx: &Transaction) -> Result<Self, CovenantError> {
        Ok(Self {
            version: tx.version.0,
            inputs: tx
                .input
                .iter()
                .map(TemplateInput::try_from)
                .collect::<Result<_, _>>()?,
            lock_time: tx.lock_time.to_consensus_u32(),
        })
    }
}

/// A previous transaction as a covenant witness describes it.
pub trait CovenantTemplate {
    fn frame(&self) -> &TxFrame;

    /// All outputs, in transaction order.
    fn outputs(&self) -> Vec<OutputTemplate>;

    /// The commitment carried in the state output.
    fn state_hash(&self) -> Buf32;

    /// Serializes the transaction without witnesses.
    fn encode(&self) -> Vec<u8> {
        let frame = self.frame();
        let outputs = self.outputs();

        let mut out = frame.version.to_le_bytes().to_vec();
        out.extend(serialize(&VarInt(frame.inputs.len() as u64)));
        for input in &frame.inputs {
            out.extend(input.encode());
        }
        out.extend(serialize(&VarInt(outputs.len() as u64)));
        for output in &outputs {
            out.extend(output.encode());
        }
        out.extend_from_slice(&frame.lock_time.to_le_bytes());
        out
    }

    /// Txid in internal byte order.
    fn compute_txid(&self) -> Buf32 {
        sha256d(&self.encode())
    }

    fn output(&self, vout: u32) -> Option<OutputTemplate> {
        self.outputs().into_iter().nth(vout as usize)
    }
}

/// `hashPrevouts` over `(txid, vout)` pairs.
pub fn compute_hash_prevouts(inputs: &[TemplateInput]) -> Buf32 {
    let outpoints: Vec<OutPoint> = inputs.iter().map(TemplateInput::outpoint).collect();
    hash_prevouts(&outpoints)
}

/// `hashSpentAmounts` over the spent amounts.
pub fn compute_hash_spent_amounts(amounts: &[u64]) -> Buf32 {
    hash_spent_amounts(amounts.iter().copied())
}

/// `hashSpentScripts` over the spent scripts.
pub fn compute_hash_spent_scripts(scripts: &[&ScriptBuf]) -> Buf32 {
    hash_spent_scripts(scripts.iter().copied())
}

/// `hashOutputs` over the expected outputs.
pub fn compute_hash_outputs(outputs: &[OutputTemplate]) -> Buf32 {
    let outputs: Vec<TxOut> = outputs.iter().map(OutputTemplate::to_txout).collect();
    hash_outputs(&outputs)
}

#[cfg(test)]
pub(crate) mod tests {
    use bitcoin::{absolute::LockTime, hashes::Hash, transaction::Version};

    use super::*;
    use crate::scripts::state_output;

    pub(crate) fn sample_tx() -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(17),
            input: vec![
                TxIn {
                    previous_output: OutPoint::new(Txid::from_byte_array([1; 32]), 0),
                    sequence: Sequence::MAX,
                    ..Default::default()
                },
                TxIn {
                    previous_output: OutPoint::new(Txid::from_byte_array([2; 32]), 3),
                    sequence: Sequence::MAX,
                    ..Default::default()
                },
            ],
            output: vec![
                TxOut {
                    value: Amount::from_sat(6_117),
                    script_pubkey: ScriptBuf::from_bytes(vec![0x51, 0x20, 0xaa]),
                },
                state_output(&Buf32::new([3; 32])),
                TxOut {
                    value: Amount::from_sat(99_000),
                    script_pubkey: ScriptBuf::from_bytes(vec![0x51, 0x20, 0xbb]),
                },
            ],
        }
    }

    struct Plain {
        frame: TxFrame,
        outputs: Vec<OutputTemplate>,
    }

    impl CovenantTemplate for Plain {
        fn frame(&self) -> &TxFrame {
            &self.frame
        }

        fn outputs(&self) -> Vec<OutputTemplate> {
            self.outputs.clone()
        }

        fn state_hash(&self) -> Buf32 {
            Buf32::zero()
        }
    }

    #[test]
    fn test_txid_matches_consensus_txid() {
        let tx = sample_tx();
        let template = Plain {
            frame: TxFrame::from_tx(&tx).unwrap(),
            outputs: tx.output.iter().map(OutputTemplate::from).collect(),
        };
        assert_eq!(template.encode(), serialize(&tx));
        assert_eq!(Txid::from(template.compute_txid()), tx.compute_txid());
        assert_eq!(template.output(2).unwrap().amount, 99_000);
        assert!(template.output(3).is_none());
    }

    #[test]
    fn test_non_final_input_rejected() {
        let mut tx = sample_tx();
        tx.input[0].sequence = Sequence::ZERO;
        assert_eq!(
            TxFrame::from_tx(&tx),
            Err(CovenantError::MalformedTemplate("non-final input"))
        );
    }

    #[test]
    fn test_hash_prevouts_matches_sighash_field() {
        let tx = sample_tx();
        let frame = TxFrame::from_tx(&tx).unwrap();
        let outpoints: Vec<OutPoint> = tx.input.iter().map(|i| i.previous_output).collect();
        assert_eq!(compute_hash_prevouts(&frame.inputs), hash_prevouts(&outpoints));
    }
}
