//! The spending input a covenant check runs against.

use bitcoin::{
    hashes::Hash,
    sighash::{Prevouts, SighashCache},
    taproot::TapLeafHash,
    ScriptBuf, TapSighashType, Transaction, TxOut,
};
use catbridge_crypto::{
    schnorr::assemble_covenant_signature, verify_covenant_signature, CovenantKey,
    SighashGrindArtifact,
};
use catbridge_primitives::{constants::RESERVED_CHALLENGE_BYTES, Buf32};

use crate::{
    errors::CovenantError,
    scripts::CovenantScript,
    template::{
        compute_hash_outputs, compute_hash_prevouts, compute_hash_spent_amounts,
        compute_hash_spent_scripts, OutputTemplate, TemplateInput,
    },
};

/// A covenant input of a finished transaction, with everything needed to evaluate it.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext<'a> {
    pub tx: &'a Transaction,
    pub prevouts: &'a [TxOut],
    pub input_index: usize,
    pub script: &'a CovenantScript,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        tx: &'a Transaction,
        prevouts: &'a [TxOut],
        input_index: usize,
        script: &'a CovenantScript,
    ) -> Self {
        Self {
            tx,
            prevouts,
            input_index,
            script,
        }
    }

    /// The sighash the interpreter computes for this input.
    pub fn sighash(&self) -> Result<Buf32, CovenantError> {
        let sighash = SighashCache::new(self.tx)
            .taproot_script_spend_signature_hash(
                self.input_index,
                &Prevouts::All(self.prevouts),
                TapLeafHash::from_byte_array(self.script.leaf_hash().0),
                TapSighashType::Default,
            )
            .map_err(|e| CovenantError::Sighash(e.to_string()))?;
        Ok(Buf32::new(sighash.to_byte_array()))
    }

    /// Checks the artifact the way the script does: the preimage parts must reassemble into a
    /// sighash the fixed-key signature verifies against, and that signature must be the one the
    /// script builds from the challenge parts.
    pub fn check_preimage(&self, artifact: &SighashGrindArtifact) -> Result<(), CovenantError> {
        if artifact.preimage.leaf_hash != *self.script.leaf_hash() {
            return Err(CovenantError::ScriptMismatch);
        }

        let sighash = artifact.sighash();
        if sighash != self.sighash()? {
            return Err(CovenantError::SighashMismatch);
        }

        let challenge = CovenantKey::generator().derive_challenge(&sighash);
        if *challenge.as_buf() != artifact.challenge() {
            return Err(CovenantError::ChallengeMismatch);
        }
        if RESERVED_CHALLENGE_BYTES.contains(&artifact.challenge_last_byte) {
            return Err(CovenantError::ReservedChallengeByte(
                artifact.challenge_last_byte,
            ));
        }

        let assembled = assemble_covenant_signature(
            &artifact.challenge_minus_last_byte,
            artifact.challenge_last_byte,
        );
        if assembled != artifact.signature || !verify_covenant_signature(&assembled, &sighash) {
            return Err(CovenantError::SignatureInvalid);
        }

        Ok(())
    }

    /// Checks the preimage commits to the input the script expects to run as.
    pub fn check_input_index(
        &self,
        artifact: &SighashGrindArtifact,
        expected: u32,
    ) -> Result<(), CovenantError> {
        let actual = artifact.input_index();
        if actual != expected || self.input_index != expected as usize {
            return Err(CovenantError::InputIndexMismatch { expected, actual });
        }
        Ok(())
    }
}

/// Checks the spent outpoints reconstructed from templates match the preimage.
pub fn check_hash_prevouts(
    artifact: &SighashGrindArtifact,
    inputs: &[TemplateInput],
) -> Result<(), CovenantError> {
    if compute_hash_prevouts(inputs) != artifact.preimage.hash_prevouts {
        return Err(CovenantError::HashPrevoutsMismatch);
    }
    Ok(())
}

pub fn check_hash_spent_amounts(
    artifact: &SighashGrindArtifact,
    amounts: &[u64],
) -> Result<(), CovenantError> {
    if compute_hash_spent_amounts(amounts) != artifact.preimage.hash_spent_amounts {
        return Err(CovenantError::HashSpentAmountsMismatch);
    }
    Ok(())
}

pub fn check_hash_spent_scripts(
    artifact: &SighashGrindArtifact,
    scripts: &[&ScriptBuf],
) -> Result<(), CovenantError> {
    if compute_hash_spent_scripts(scripts) != artifact.preimage.hash_spent_scripts {
        return Err(CovenantError::HashSpentScriptsMismatch);
    }
    Ok(())
}

/// Checks the outputs the script expects match the ones the transaction commits to.
pub fn check_hash_outputs(
    artifact: &SighashGrindArtifact,
    outputs: &[OutputTemplate],
) -> Result<(), CovenantError> {
    if compute_hash_outputs(outputs) != artifact.preimage.hash_outputs {
        return Err(CovenantError::HashOutputsMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, opcodes::OP_TRUE, script::Builder, transaction::Version, Amount,
        OutPoint, Sequence, TxIn, Txid,
    };
    use catbridge_crypto::grind_and_sign;

    use super::*;
    use crate::scripts::CovenantKind;

    fn setup() -> (Transaction, Vec<TxOut>, CovenantScript) {
        let cov = CovenantScript::new(
            CovenantKind::DepositAggregator,
            Builder::new().push_opcode(OP_TRUE).into_script(),
        )
        .unwrap();
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![
                TxIn {
                    previous_output: OutPoint::new(Txid::from_byte_array([1; 32]), 0),
                    sequence: Sequence::MAX,
                    ..Default::default()
                },
                TxIn {
                    previous_output: OutPoint::new(Txid::from_byte_array([2; 32]), 0),
                    sequence: Sequence::MAX,
                    ..Default::default()
                },
            ],
            output: vec![cov.output(1_000)],
        };
        let prevouts = vec![cov.output(500), cov.output(500)];
        (tx, prevouts, cov)
    }

    #[test]
    fn test_ground_artifact_passes() {
        let (mut tx, prevouts, cov) = setup();
        let artifact =
            grind_and_sign(&mut tx, &prevouts, cov.leaf_hash(), 1, &CovenantKey::generator())
                .unwrap();

        let ctx = ExecutionContext::new(&tx, &prevouts, 1, &cov);
        ctx.check_preimage(&artifact).unwrap();
        ctx.check_input_index(&artifact, 1).unwrap();
        assert_eq!(
            ctx.check_input_index(&artifact, 0),
            Err(CovenantError::InputIndexMismatch {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn test_changed_transaction_fails() {
        let (mut tx, prevouts, cov) = setup();
        let artifact =
            grind_and_sign(&mut tx, &prevouts, cov.leaf_hash(), 0, &CovenantKey::generator())
                .unwrap();

        tx.output[0].value = Amount::from_sat(999);
        let ctx = ExecutionContext::new(&tx, &prevouts, 0, &cov);
        assert_eq!(
            ctx.check_preimage(&artifact),
            Err(CovenantError::SighashMismatch)
        );
    }

    #[test]
    fn test_hash_field_checks() {
        let (mut tx, prevouts, cov) = setup();
        let artifact =
            grind_and_sign(&mut tx, &prevouts, cov.leaf_hash(), 0, &CovenantKey::generator())
                .unwrap();

        let inputs = tx
            .input
            .iter()
            .map(TemplateInput::try_from)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        check_hash_prevouts(&artifact, &inputs).unwrap();
        check_hash_prevouts(&artifact, &inputs[..1]).unwrap_err();
        check_hash_spent_amounts(&artifact, &[500, 500]).unwrap();
        assert_eq!(
            check_hash_spent_amounts(&artifact, &[500, 501]),
            Err(CovenantError::HashSpentAmountsMismatch)
        );
        let spk = cov.script_pubkey();
        check_hash_spent_scripts(&artifact, &[spk, spk]).unwrap();
        check_hash_outputs(&artifact, &[OutputTemplate::from(&tx.output[0])]).unwrap();
        assert_eq!(
            check_hash_outputs(&artifact, &[OutputTemplate::new(1, spk.clone())]),
            Err(CovenantError::HashOutputsMismatch)
        );
    }

    #[test]
    fn test_forged_challenge_fails() {
        let (mut tx, prevouts, cov) = setup();
        let mut artifact =
            grind_and_sign(&mut tx, &prevouts, cov.leaf_hash(), 0, &CovenantKey::generator())
                .unwrap();
        artifact.challenge_minus_last_byte[0] ^= 1;

        let ctx = ExecutionContext::new(&tx, &prevouts, 0, &cov);
        assert_eq!(
            ctx.check_preimage(&artifact),
            Err(CovenantError::ChallengeMismatch)
        );
    }
}
