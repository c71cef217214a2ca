//! The bridge covenant's settlement check.

use bitcoin::ScriptBuf;
use catbridge_covenant_types::{
    apply_batch, batch_total,
    context::{
        check_hash_outputs, check_hash_prevouts, check_hash_spent_amounts,
        check_hash_spent_scripts,
    },
    scripts::state_script,
    AggregatorTx, BatchDirection, BatchRequest, BridgeState, BridgeTx, CovenantError,
    CovenantKind, CovenantTemplate, ExecutionContext, FeeInput, InputRole, OutputTemplate,
    SlotUpdate, SumTree, TemplateInput, WitnessItems, WitnessPlan,
};
use catbridge_crypto::SighashGrindArtifact;
use catbridge_primitives::{encoding::checked_sum, Buf32};
use serde::{Deserialize, Serialize};

/// Input index of the bridge output in a settlement transaction.
pub const SETTLEMENT_INPUT: u32 = 0;

/// Witness of the bridge input of a settlement transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementWitness<R> {
    pub artifact: SighashGrindArtifact,
    pub direction: BatchDirection,
    /// The transaction that created the bridge output being spent.
    pub prev: BridgeTx,
    /// The transaction that created the aggregated batch root spent next to it.
    pub aggregator: AggregatorTx,
    pub updates: Vec<SlotUpdate<R>>,
    pub fee_input: FeeInput,
    pub change: OutputTemplate,
}

impl<R: BatchRequest + WitnessItems> SettlementWitness<R> {
    pub fn plan(&self) -> WitnessPlan {
        WitnessPlan::new(CovenantKind::Bridge, InputRole::Settlement)
            .flag(self.direction == BatchDirection::Withdrawal)
            .with(&self.artifact)
            .with(&self.prev)
            .with(&self.aggregator)
            .with_all(&self.updates)
            .with(&self.fee_input)
            .with(&self.change)
    }
}

/// Root of the sum tree the expander output of a withdrawal settlement commits to.
pub fn expander_root<R: BatchRequest>(updates: &[SlotUpdate<R>]) -> Result<Buf32, CovenantError> {
    let requests: Vec<R> = updates.iter().map(|update| update.request).collect();
    Ok(SumTree::build(&requests)?.root_hash())
}

/// Runs the checks the bridge script performs when it settles a batch, returning the state the
/// renewed bridge output commits to.
pub fn verify_settlement<R: BatchRequest>(
    ctx: &ExecutionContext<'_>,
    witness: &SettlementWitness<R>,
    expander_script: &ScriptBuf,
) -> Result<BridgeState, CovenantError> {
    let artifact = &witness.artifact;
    ctx.check_preimage(artifact)?;
    ctx.check_input_index(artifact, SETTLEMENT_INPUT)?;

    let own_script = ctx.script.script_pubkey();
    let prev = &witness.prev;
    let aggregator = &witness.aggregator;
    let aggregator_script = prev.state.aggregator_spk(witness.direction);
    if &prev.bridge.script != own_script || &aggregator.contract.script != aggregator_script {
        return Err(CovenantError::ScriptMismatch);
    }

    check_hash_prevouts(
        artifact,
        &[
            TemplateInput::new(prev.compute_txid(), 0),
            TemplateInput::new(aggregator.compute_txid(), 0),
            witness.fee_input.input(),
        ],
    )?;
    check_hash_spent_scripts(
        artifact,
        &[own_script, aggregator_script, &witness.fee_input.script],
    )?;
    check_hash_spent_amounts(
        artifact,
        &[
            prev.bridge.amount,
            aggregator.contract.amount,
            witness.fee_input.amount,
        ],
    )?;

    let accounts_root = apply_batch(
        &prev.state.accounts_root,
        &aggregator.state_hash,
        &witness.updates,
        witness.direction,
    )?;
    let total = batch_total(&witness.updates)?;

    let mut outputs = Vec::with_capacity(4);
    let state = match witness.direction {
        BatchDirection::Deposit => {
            if aggregator.contract.amount != total {
                return Err(CovenantError::AmountMismatch);
            }
            // A pending expansion stays committed until its batch is paid out.
            let state = prev.state.transition(accounts_root, prev.state.expander_root);
            let amount = checked_sum([prev.bridge.amount, total])?;
            outputs.push(OutputTemplate::new(amount, own_script.clone()));
            outputs.push(OutputTemplate::new(0, state_script(&state.hash())));
            state
        }
        BatchDirection::Withdrawal => {
            let state = prev
                .state
                .transition(accounts_root, expander_root(&witness.updates)?);
            let amount = prev
                .bridge
                .amount
                .checked_sub(total)
                .ok_or(CovenantError::BalanceUnderflow)?;
            outputs.push(OutputTemplate::new(amount, own_script.clone()));
            outputs.push(OutputTemplate::new(0, state_script(&state.hash())));
            outputs.push(OutputTemplate::new(total, expander_script.clone()));
            state
        }
    };
    outputs.push(witness.change.clone());
    check_hash_outputs(artifact, &outputs)?;

    Ok(state)
}
