//! Payouts of single withdrawals out of the expander.

use bitcoin::{Amount, Transaction, TxOut};
use catbridge_covenant_types::{
    context::{
        check_hash_outputs, check_hash_prevouts, check_hash_spent_amounts,
        check_hash_spent_scripts,
    },
    scripts::payout_script,
    BatchRequest, CovenantError, CovenantKind, CovenantTemplate, ExecutionContext, ExpanderTx,
    FeeInput, InputRole, OutputTemplate, TemplateInput, WithdrawalData, WitnessPlan,
};
use catbridge_crypto::SighashGrindArtifact;
use catbridge_primitives::Buf32;
use catbridge_txbuilder::{BuildContext, CovenantTxDraft};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    errors::ExpansionError,
    split::{committed_child, EXPANDER_INPUT},
};

/// Witness of the expander input of a payout transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutWitness {
    pub artifact: SighashGrindArtifact,
    /// The split whose branch output is paid out.
    pub parent: ExpanderTx,
    pub child_states: [Buf32; 2],
    pub branch: usize,
    pub withdrawal: WithdrawalData,
    pub fee_input: FeeInput,
    pub change: OutputTemplate,
}

impl PayoutWitness {
    pub fn plan(&self) -> WitnessPlan {
        WitnessPlan::new(CovenantKind::WithdrawalExpander, InputRole::Payout)
            .with(&self.artifact)
            .with(&self.parent)
            .push(self.child_states[0].as_slice())
            .push(self.child_states[1].as_slice())
            .number(self.branch as i64)
            .with(&self.withdrawal)
            .with(&self.fee_input)
            .with(&self.change)
    }
}

/// A payout transaction: `[withdrawer, change]`.
#[derive(Clone, Debug)]
pub struct PayoutTx {
    pub tx: Transaction,
    pub witness: PayoutWitness,
}

/// Runs the checks the expander script performs when it pays out a withdrawal.
pub fn verify_payout(
    ctx: &ExecutionContext<'_>,
    witness: &PayoutWitness,
) -> Result<(), CovenantError> {
    let artifact = &witness.artifact;
    ctx.check_preimage(artifact)?;
    ctx.check_input_index(artifact, EXPANDER_INPUT as u32)?;

    let withdrawal = &witness.withdrawal;
    let committed = committed_child(&witness.parent, &witness.child_states, witness.branch)?;
    if withdrawal.leaf_hash() != committed {
        return Err(CovenantError::StateHashMismatch);
    }

    let own_script = ctx.script.script_pubkey();
    let spent = witness.parent.branch(witness.branch)?;
    if &spent.script != own_script {
        return Err(CovenantError::ScriptMismatch);
    }
    if spent.amount != withdrawal.amount() {
        return Err(CovenantError::AmountMismatch);
    }

    check_hash_prevouts(
        artifact,
        &[
            TemplateInput::new(witness.parent.compute_txid(), witness.branch as u32),
            witness.fee_input.input(),
        ],
    )?;
    check_hash_spent_scripts(artifact, &[own_script, &witness.fee_input.script])?;
    check_hash_spent_amounts(artifact, &[spent.amount, witness.fee_input.amount])?;

    check_hash_outputs(
        artifact,
        &[
            OutputTemplate::new(withdrawal.amount(), payout_script(&withdrawal.address())),
            witness.change.clone(),
        ],
    )
}

/// Pays the withdrawal carried by branch `branch` of `parent` to the withdrawer.
pub fn create_payout(
    ctx: &mut BuildContext<'_>,
    parent: &ExpanderTx,
    child_states: [Buf32; 2],
    branch: usize,
    withdrawal: &WithdrawalData,
) -> Result<PayoutTx, ExpansionError> {
    let scripts = ctx.scripts;
    let expander = scripts.get(CovenantKind::WithdrawalExpander);

    let spent = parent.branch(branch)?;
    let draft = CovenantTxDraft::new()
        .covenant_input(
            TemplateInput::new(parent.compute_txid(), branch as u32).outpoint(),
            spent.to_txout(),
            expander,
        )
        .output(TxOut {
            value: Amount::from_sat(withdrawal.amount()),
            script_pubkey: payout_script(&withdrawal.address()),
        });
    let mut sealed = ctx.seal(draft)?;

    let witness = PayoutWitness {
        artifact: sealed.artifact(EXPANDER_INPUT)?.clone(),
        parent: parent.clone(),
        child_states,
        branch,
        withdrawal: *withdrawal,
        fee_input: sealed.fee_input.clone(),
        change: sealed.change.clone(),
    };
    verify_payout(
        &ExecutionContext::new(&sealed.tx, &sealed.prevouts, EXPANDER_INPUT, expander),
        &witness,
    )?;
    sealed.set_witness(EXPANDER_INPUT, witness.plan().into_witness(expander)?)?;

    info!(
        txid = %sealed.tx.compute_txid(),
        address = %withdrawal.address(),
        amount = withdrawal.amount(),
        "paid out withdrawal"
    );
    Ok(PayoutTx {
        tx: sealed.tx,
        witness,
    })
}
