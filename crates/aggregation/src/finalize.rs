//! The aggregator root's side of a bridge settlement.

use bitcoin::ScriptBuf;
use catbridge_covenant_types::{
    context::{check_hash_prevouts, check_hash_spent_amounts, check_hash_spent_scripts},
    AggregatorTx, BatchDirection, BridgeTx, CovenantError, CovenantKind, CovenantTemplate,
    ExecutionContext, FeeInput, InputRole, TemplateInput, WitnessPlan,
};
use catbridge_crypto::SighashGrindArtifact;
use serde::{Deserialize, Serialize};

use crate::merge::check_merged_from;

/// Input index of the aggregator root in a settlement transaction.
pub const FINALIZE_INPUT: u32 = 1;

/// Witness of the aggregator root when a settlement consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeWitness {
    pub artifact: SighashGrindArtifact,
    /// The transaction that created the aggregator root.
    pub aggregator: AggregatorTx,
    /// The two transactions the root merged, left first.
    pub merged_from: [AggregatorTx; 2],
    /// The transaction that created the bridge output spent next to it.
    pub bridge: BridgeTx,
    pub fee_input: FeeInput,
}

impl FinalizeWitness {
    pub fn plan(&self, kind: CovenantKind) -> WitnessPlan {
        WitnessPlan::new(kind, InputRole::Finalize)
            .with(&self.artifact)
            .with(&self.aggregator)
            .with_all(&self.merged_from)
            .with(&self.bridge)
            .with(&self.fee_input)
    }
}

/// Runs the checks an aggregator root performs when it is spent: it must be the second input,
/// right after a bridge output whose state points back at this aggregator.
pub fn verify_finalize(
    ctx: &ExecutionContext<'_>,
    witness: &FinalizeWitness,
    bridge_script: &ScriptBuf,
) -> Result<(), CovenantError> {
    let artifact = &witness.artifact;
    ctx.check_preimage(artifact)?;
    ctx.check_input_index(artifact, FINALIZE_INPUT)?;

    let direction = match ctx.script.kind() {
        CovenantKind::DepositAggregator => BatchDirection::Deposit,
        CovenantKind::WithdrawalAggregator => BatchDirection::Withdrawal,
        _ => return Err(CovenantError::ScriptMismatch),
    };
    let own_script = ctx.script.script_pubkey();
    let bridge = &witness.bridge;
    if bridge.state.aggregator_spk(direction) != own_script
        || &bridge.bridge.script != bridge_script
        || &witness.aggregator.contract.script != own_script
    {
        return Err(CovenantError::ScriptMismatch);
    }
    check_merged_from(own_script, &witness.aggregator, &witness.merged_from)?;

    check_hash_prevouts(
        artifact,
        &[
            TemplateInput::new(bridge.compute_txid(), 0),
            TemplateInput::new(witness.aggregator.compute_txid(), 0),
            witness.fee_input.input(),
        ],
    )?;
    check_hash_spent_scripts(artifact, &[bridge_script, own_script, &witness.fee_input.script])?;
    check_hash_spent_amounts(
        artifact,
        &[
            bridge.bridge.amount,
            witness.aggregator.contract.amount,
            witness.fee_input.amount,
        ],
    )
}
