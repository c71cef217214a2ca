//! Transaction drafts and sealing.

use bitcoin::{
    absolute::LockTime, transaction::Version, OutPoint, Sequence, Transaction, TxIn, TxOut,
    Witness,
};
use catbridge_covenant_types::{CovenantScript, CovenantScripts, FeeInput, OutputTemplate};
use catbridge_crypto::{grind_and_sign_inputs, CovenantKey, OperatorKeys, SighashGrindArtifact};
use catbridge_primitives::{AmountOverflow, Buf32, ProtocolParams};
use tracing::*;

use crate::{allocator::FeeUtxoAllocator, errors::BuildError};

#[derive(Clone, Copy, Debug)]
enum InputSigner {
    /// Unlocked by a covenant witness over a ground sighash for this leaf.
    Covenant(Buf32),
    /// Key-path spend of the operator fee script.
    FeeKey,
    /// Spend of the operator's P2WPKH payout script.
    Payout,
}

#[derive(Clone, Debug)]
struct DraftInput {
    outpoint: OutPoint,
    prevout: TxOut,
    signer: InputSigner,
}

/// Inputs and outputs of a transaction, before the fee input and change output are added.
#[derive(Clone, Debug, Default)]
pub struct CovenantTxDraft {
    inputs: Vec<DraftInput>,
    outputs: Vec<TxOut>,
}

impl CovenantTxDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spends an output locked by `script`.
    pub fn covenant_input(mut self, outpoint: OutPoint, prevout: TxOut, script: &CovenantScript) -> Self {
        self.inputs.push(DraftInput {
            outpoint,
            prevout,
            signer: InputSigner::Covenant(*script.leaf_hash()),
        });
        self
    }

    /// Spends an output paying the operator's P2WPKH address.
    pub fn payout_input(mut self, outpoint: OutPoint, prevout: TxOut) -> Self {
        self.inputs.push(DraftInput {
            outpoint,
            prevout,
            signer: InputSigner::Payout,
        });
        self
    }

    pub fn output(mut self, output: TxOut) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }
}

/// A finished transaction whose covenant witnesses are still to be filled in.
///
/// `change` is the operator change output, always the last output.
#[derive(Clone, Debug)]
pub struct SealedTx {
    pub tx: Transaction,
    pub prevouts: Vec<TxOut>,
    pub fee_input: FeeInput,
    pub change: OutputTemplate,
    artifacts: Vec<(usize, SighashGrindArtifact)>,
}

impl SealedTx {
    pub fn txid(&self) -> Buf32 {
        self.tx.compute_txid().into()
    }

    /// The grinding artifact of covenant input `index`.
    pub fn artifact(&self, index: usize) -> Result<&SighashGrindArtifact, BuildError> {
        self.artifacts
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, artifact)| artifact)
            .ok_or(BuildError::MissingArtifact(index))
    }

    pub fn set_witness(&mut self, index: usize, witness: Witness) -> Result<(), BuildError> {
        let len = self.tx.input.len();
        let input = self
            .tx
            .input
            .get_mut(index)
            .ok_or(BuildError::InputIndexOutOfRange { index, len })?;
        input.witness = witness;
        Ok(())
    }
}

/// What every transaction builder needs: the fee chain, the operator keys and the protocol
/// configuration.
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub allocator: &'a mut FeeUtxoAllocator,
    pub keys: &'a OperatorKeys,
    pub scripts: &'a CovenantScripts,
    pub params: &'a ProtocolParams,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        allocator: &'a mut FeeUtxoAllocator,
        keys: &'a OperatorKeys,
        scripts: &'a CovenantScripts,
        params: &'a ProtocolParams,
    ) -> Self {
        Self {
            allocator,
            keys,
            scripts,
            params,
        }
    }

    /// Appends the fee input and change output, grinds the locktime for every covenant input
    /// and signs the operator inputs.
    ///
    /// The allocator advances to the new change output only if sealing succeeds.
    pub fn seal(&mut self, draft: CovenantTxDraft) -> Result<SealedTx, BuildError> {
        let fee = self.allocator.take()?;
        match self.seal_with_fee(draft, &fee) {
            Ok(sealed) => {
                self.allocator.commit(&sealed.tx)?;
                debug!(
                    txid = %sealed.tx.compute_txid(),
                    inputs = sealed.tx.input.len(),
                    outputs = sealed.tx.output.len(),
                    lock_time = %sealed.tx.lock_time,
                    "sealed transaction"
                );
                Ok(sealed)
            }
            Err(err) => {
                self.allocator.release(fee);
                Err(err)
            }
        }
    }

    fn seal_with_fee(&self, draft: CovenantTxDraft, fee: &FeeInput) -> Result<SealedTx, BuildError> {
        let CovenantTxDraft {
            mut inputs,
            mut outputs,
        } = draft;
        inputs.push(DraftInput {
            outpoint: fee.outpoint(),
            prevout: fee.prevout(),
            signer: InputSigner::FeeKey,
        });

        let available = total_value(inputs.iter().map(|input| &input.prevout))?;
        let needed = total_value(&outputs)?
            .checked_add(self.params.tx_fee)
            .ok_or(AmountOverflow(u64::MAX))?;
        let change = available
            .checked_sub(needed)
            .ok_or(BuildError::InsufficientFunds { needed, available })?;
        let change = OutputTemplate::new(change, self.allocator.fee_script().clone());
        outputs.push(change.to_txout());

        let mut tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: input.outpoint,
                    sequence: Sequence::MAX,
                    ..Default::default()
                })
                .collect(),
            output: outputs,
        };
        let prevouts: Vec<TxOut> = inputs.iter().map(|input| input.prevout.clone()).collect();

        let targets: Vec<(usize, Buf32)> = inputs
            .iter()
            .enumerate()
            .filter_map(|(index, input)| match input.signer {
                InputSigner::Covenant(leaf_hash) => Some((index, leaf_hash)),
                _ => None,
            })
            .collect();
        let artifacts = if targets.is_empty() {
            Vec::new()
        } else {
            let ground =
                grind_and_sign_inputs(&mut tx, &prevouts, &targets, &CovenantKey::generator())?;
            targets.iter().map(|(index, _)| *index).zip(ground).collect()
        };

        // Signatures commit to the locktime, so they come after grinding.
        let mut witnesses = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let witness = match input.signer {
                InputSigner::Covenant(_) => continue,
                InputSigner::FeeKey => self.keys.sign_key_spend(&tx, &prevouts, index)?,
                InputSigner::Payout => self.keys.sign_p2wpkh(&tx, index, input.prevout.value)?,
            };
            witnesses.push((index, witness));
        }
        for (index, witness) in witnesses {
            tx.input[index].witness = witness;
        }

        Ok(SealedTx {
            tx,
            prevouts,
            fee_input: fee.clone(),
            change,
            artifacts,
        })
    }
}

fn total_value<'a>(outputs: impl IntoIterator<Item = &'a TxOut>) -> Result<u64, AmountOverflow> {
    outputs.into_iter().try_fold(0u64, |acc, output| {
        acc.checked_add(output.value.to_sat())
            .ok_or(AmountOverflow(output.value.to_sat()))
    })
}

#[cfg(test)]
mod tests {
    use bitcoin::{hashes::Hash, opcodes::OP_TRUE, script::Builder, Txid};
    use catbridge_covenant_types::{context::ExecutionContext, CovenantKind};

    use super::*;

    fn keys() -> OperatorKeys {
        OperatorKeys::from_hex("1111111111111111111111111111111111111111111111111111111111111111")
            .unwrap()
    }

    fn scripts() -> CovenantScripts {
        let script = |n: u8| {
            Builder::new()
                .push_int(n as i64)
                .push_opcode(OP_TRUE)
                .into_script()
        };
        CovenantScripts::from_scripts(script(1), script(2), script(3), script(4)).unwrap()
    }

    fn allocator(keys: &OperatorKeys, amount: u64) -> FeeUtxoAllocator {
        FeeUtxoAllocator::seeded(FeeInput {
            txid: Buf32::new([9; 32]),
            vout: 0,
            amount,
            script: keys.fee_script(),
        })
    }

    #[test]
    fn test_seal_appends_change_and_chains() {
        let keys = keys();
        let scripts = scripts();
        let params = ProtocolParams::default();
        let mut allocator = allocator(&keys, 100_000);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let cov = scripts.get(CovenantKind::DepositAggregator);
        let draft = CovenantTxDraft::new().output(cov.output(1_500));
        let sealed = ctx.seal(draft).unwrap();

        assert_eq!(sealed.tx.output.len(), 2);
        assert_eq!(sealed.change.amount, 100_000 - 1_500 - params.tx_fee);
        assert_eq!(sealed.tx.input[0].sequence, Sequence::MAX);
        assert!(!sealed.tx.input[0].witness.is_empty());
        assert_eq!(sealed.fee_input.amount, 100_000);

        let next = allocator.current().unwrap();
        assert_eq!(next.txid, sealed.txid());
        assert_eq!(next.vout, 1);
    }

    #[test]
    fn test_seal_grinds_covenant_inputs() {
        let keys = keys();
        let scripts = scripts();
        let params = ProtocolParams::default();
        let mut allocator = allocator(&keys, 100_000);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let cov = scripts.get(CovenantKind::Bridge);
        let draft = CovenantTxDraft::new()
            .covenant_input(
                OutPoint::new(Txid::from_byte_array([1; 32]), 0),
                cov.output(1_000),
                cov,
            )
            .covenant_input(
                OutPoint::new(Txid::from_byte_array([2; 32]), 0),
                cov.output(2_000),
                cov,
            )
            .output(cov.output(3_000));
        let sealed = ctx.seal(draft).unwrap();

        for index in 0..2 {
            let artifact = sealed.artifact(index).unwrap();
            ExecutionContext::new(&sealed.tx, &sealed.prevouts, index, cov)
                .check_preimage(artifact)
                .unwrap();
        }
        assert_eq!(sealed.artifact(2).unwrap_err(), BuildError::MissingArtifact(2));

        // The fee signature must cover the final, ground locktime.
        assert_eq!(
            sealed.tx.input[2].witness,
            keys.sign_key_spend(&sealed.tx, &sealed.prevouts, 2).unwrap()
        );
    }

    #[test]
    fn test_insufficient_funds_releases_fee() {
        let keys = keys();
        let scripts = scripts();
        let params = ProtocolParams::default();
        let mut allocator = allocator(&keys, 2_000);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let cov = scripts.get(CovenantKind::DepositAggregator);
        let err = ctx.seal(CovenantTxDraft::new().output(cov.output(1_500))).unwrap_err();
        assert_eq!(
            err,
            BuildError::InsufficientFunds {
                needed: 1_500 + params.tx_fee,
                available: 2_000
            }
        );
        assert_eq!(allocator.balance(), 2_000);
    }
}
