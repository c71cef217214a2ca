//! Splits of an expander output into two.

use bitcoin::Transaction;
use catbridge_covenant_types::{
    context::{
        check_hash_outputs, check_hash_prevouts, check_hash_spent_amounts,
        check_hash_spent_scripts,
    },
    scripts::{state_output, state_script},
    AggregationData, BatchRequest, BridgeTx, CovenantError, CovenantKind, CovenantTemplate,
    ExecutionContext, ExpanderTx, FeeInput, InputRole, OutputTemplate, TemplateInput,
    WithdrawalData, WitnessPlan,
};
use catbridge_crypto::SighashGrindArtifact;
use catbridge_merkle::hash_node;
use catbridge_primitives::{encoding::checked_sum, Buf32};
use catbridge_txbuilder::{BuildContext, CovenantTxDraft};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::errors::ExpansionError;

/// Input index of the expander output in split and payout transactions.
pub const EXPANDER_INPUT: usize = 0;

/// The transaction that created the expander output a split spends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitParent {
    /// The withdrawal settlement; its bridge state commits the sum tree root.
    Bridge(BridgeTx),
    /// An earlier split; `child_states` is the preimage of its state output.
    Expander {
        tx: ExpanderTx,
        child_states: [Buf32; 2],
        branch: usize,
    },
}

impl SplitParent {
    pub fn input(&self) -> TemplateInput {
        match self {
            SplitParent::Bridge(tx) => {
                TemplateInput::new(tx.compute_txid(), BridgeTx::EXPANDER_VOUT)
            }
            SplitParent::Expander { tx, branch, .. } => {
                TemplateInput::new(tx.compute_txid(), *branch as u32)
            }
        }
    }

    /// The expander output being spent.
    pub fn output(&self) -> Result<OutputTemplate, CovenantError> {
        match self {
            SplitParent::Bridge(tx) => tx
                .expander
                .clone()
                .ok_or(CovenantError::MalformedTemplate("bridge tx has no expander output")),
            SplitParent::Expander { tx, branch, .. } => tx.branch(*branch).cloned(),
        }
    }

    /// Hash of the node the spent output carries, as committed by the parent's state.
    pub fn committed_node(&self) -> Result<Buf32, CovenantError> {
        match self {
            SplitParent::Bridge(tx) => Ok(tx.state.expander_root),
            SplitParent::Expander {
                tx,
                child_states,
                branch,
            } => committed_child(tx, child_states, *branch),
        }
    }
}

/// Checks `child_states` against the state output of `parent` and picks one.
pub(crate) fn committed_child(
    parent: &ExpanderTx,
    child_states: &[Buf32; 2],
    branch: usize,
) -> Result<Buf32, CovenantError> {
    if parent.state_hash != hash_node(&child_states[0], &child_states[1]) {
        return Err(CovenantError::StateHashMismatch);
    }
    child_states
        .get(branch)
        .copied()
        .ok_or(CovenantError::MalformedTemplate("branch out of range"))
}

/// What the two outputs of a split carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitChildren {
    Nodes([AggregationData; 2]),
    Leaves([WithdrawalData; 2]),
}

impl SplitChildren {
    pub fn hashes(&self) -> [Buf32; 2] {
        match self {
            SplitChildren::Nodes(nodes) => nodes.map(|n| n.hash()),
            SplitChildren::Leaves(leaves) => leaves.map(|w| w.leaf_hash()),
        }
    }

    pub fn amounts(&self) -> [u64; 2] {
        match self {
            SplitChildren::Nodes(nodes) => nodes.map(|n| n.sum_amount),
            SplitChildren::Leaves(leaves) => leaves.map(|w| w.amount()),
        }
    }
}

/// Witness of the expander input of a split transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitWitness {
    pub artifact: SighashGrindArtifact,
    pub parent: SplitParent,
    /// The sum tree node the spent output carries.
    pub node: AggregationData,
    pub children: SplitChildren,
    pub fee_input: FeeInput,
    pub change: OutputTemplate,
}

impl SplitWitness {
    pub fn plan(&self) -> WitnessPlan {
        let plan = WitnessPlan::new(CovenantKind::WithdrawalExpander, InputRole::Split)
            .with(&self.artifact);
        let plan = match &self.parent {
            SplitParent::Bridge(tx) => plan.flag(true).with(tx),
            SplitParent::Expander {
                tx,
                child_states,
                branch,
            } => plan
                .flag(false)
                .with(tx)
                .push(child_states[0].as_slice())
                .push(child_states[1].as_slice())
                .number(*branch as i64),
        };
        let plan = plan.with(&self.node);
        let plan = match &self.children {
            SplitChildren::Nodes(nodes) => plan.flag(false).with_all(nodes),
            SplitChildren::Leaves(leaves) => plan.flag(true).with_all(leaves),
        };
        plan.with(&self.fee_input).with(&self.change)
    }
}

/// A split transaction: `[branch 0, branch 1, state, change]`.
#[derive(Clone, Debug)]
pub struct SplitTx {
    pub tx: Transaction,
    pub template: ExpanderTx,
    pub witness: SplitWitness,
}

/// Runs the checks the expander script performs when it splits an output.
pub fn verify_split(ctx: &ExecutionContext<'_>, witness: &SplitWitness) -> Result<(), CovenantError> {
    let artifact = &witness.artifact;
    ctx.check_preimage(artifact)?;
    ctx.check_input_index(artifact, EXPANDER_INPUT as u32)?;

    let node = &witness.node;
    if node.hash() != witness.parent.committed_node()? {
        return Err(CovenantError::StateHashMismatch);
    }

    let own_script = ctx.script.script_pubkey();
    let spent = witness.parent.output()?;
    if &spent.script != own_script {
        return Err(CovenantError::ScriptMismatch);
    }
    if spent.amount != node.sum_amount {
        return Err(CovenantError::AmountMismatch);
    }

    let [hash_0, hash_1] = witness.children.hashes();
    if hash_0 != node.prev_hash_0 || hash_1 != node.prev_hash_1 {
        return Err(CovenantError::StateHashMismatch);
    }
    let [amount_0, amount_1] = witness.children.amounts();
    if checked_sum([amount_0, amount_1])? != node.sum_amount {
        return Err(CovenantError::AmountMismatch);
    }

    check_hash_prevouts(artifact, &[witness.parent.input(), witness.fee_input.input()])?;
    check_hash_spent_scripts(artifact, &[own_script, &witness.fee_input.script])?;
    check_hash_spent_amounts(artifact, &[spent.amount, witness.fee_input.amount])?;

    check_hash_outputs(
        artifact,
        &[
            OutputTemplate::new(amount_0, own_script.clone()),
            OutputTemplate::new(amount_1, own_script.clone()),
            OutputTemplate::new(0, state_script(&hash_node(&hash_0, &hash_1))),
            witness.change.clone(),
        ],
    )
}

/// Splits the expander output of `parent` carrying `node` into one output per child.
pub fn create_split(
    ctx: &mut BuildContext<'_>,
    parent: SplitParent,
    node: &AggregationData,
    children: SplitChildren,
) -> Result<SplitTx, ExpansionError> {
    let scripts = ctx.scripts;
    let expander = scripts.get(CovenantKind::WithdrawalExpander);

    let [amount_0, amount_1] = children.amounts();
    let state = hash_node(&node.prev_hash_0, &node.prev_hash_1);
    let draft = CovenantTxDraft::new()
        .covenant_input(
            parent.input().outpoint(),
            parent.output()?.to_txout(),
            expander,
        )
        .output(expander.output(amount_0))
        .output(expander.output(amount_1))
        .output(state_output(&state));
    let mut sealed = ctx.seal(draft)?;

    let witness = SplitWitness {
        artifact: sealed.artifact(EXPANDER_INPUT)?.clone(),
        parent,
        node: *node,
        children,
        fee_input: sealed.fee_input.clone(),
        change: sealed.change.clone(),
    };
    verify_split(
        &ExecutionContext::new(&sealed.tx, &sealed.prevouts, EXPANDER_INPUT, expander),
        &witness,
    )?;
    sealed.set_witness(EXPANDER_INPUT, witness.plan().into_witness(expander)?)?;

    let template = ExpanderTx::from_tx(&sealed.tx)?;
    debug!(
        txid = %sealed.tx.compute_txid(),
        amount = node.sum_amount,
        amount_0,
        amount_1,
        "split expander output"
    );

    Ok(SplitTx {
        tx: sealed.tx,
        template,
        witness,
    })
}
