//! Pairwise merges of aggregator outputs.

use bitcoin::{ScriptBuf, Transaction};
use catbridge_covenant_types::{
    context::{
        check_hash_outputs, check_hash_prevouts, check_hash_spent_amounts,
        check_hash_spent_scripts,
    },
    scripts::{payout_script, state_output, state_script},
    AggregatorTx, BatchRequest, CovenantError, CovenantKind, CovenantTemplate, ExecutionContext,
    FeeInput, InputRole, OutputTemplate, TemplateInput, WitnessPlan,
};
use catbridge_crypto::SighashGrindArtifact;
use catbridge_merkle::hash_node;
use catbridge_primitives::{encoding::checked_sum, Buf32};
use catbridge_txbuilder::{BuildContext, CovenantTxDraft};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{errors::AggregationError, leaf::LeafData};

/// What a merge checks its children against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOrigin {
    /// The children are leaves: the requests they commit to.
    Leaves([LeafData; 2]),
    /// The children are merges: the two transactions each of them spent, left first.
    Merges([[AggregatorTx; 2]; 2]),
}

impl MergeOrigin {
    pub fn role(&self) -> InputRole {
        match self {
            Self::Leaves(_) => InputRole::LeafMerge,
            Self::Merges(_) => InputRole::NodeMerge,
        }
    }
}

/// Witness of one covenant input of a merge transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeWitness {
    pub artifact: SighashGrindArtifact,
    /// The two transactions whose covenant outputs are merged, left first.
    pub children: [AggregatorTx; 2],
    pub fee_input: FeeInput,
    pub change: OutputTemplate,
    pub origin: MergeOrigin,
}

impl MergeWitness {
    pub fn role(&self) -> InputRole {
        self.origin.role()
    }

    pub fn plan(&self, kind: CovenantKind) -> WitnessPlan {
        let plan = WitnessPlan::new(kind, self.role())
            .with(&self.artifact)
            .with_all(&self.children)
            .with(&self.fee_input)
            .with(&self.change);
        match &self.origin {
            MergeOrigin::Leaves(leaves) => plan.with_all(leaves),
            MergeOrigin::Merges(spent) => plan.with_all(spent.iter().flatten()),
        }
    }
}

/// A merge transaction: `[aggregator covenant, state, change]`.
#[derive(Clone, Debug)]
pub struct MergeTx {
    pub tx: Transaction,
    pub template: AggregatorTx,
    /// Witnesses of inputs 0 and 1.
    pub witnesses: [MergeWitness; 2],
}

/// Amount the merged output must carry.
fn merged_amount(
    kind: CovenantKind,
    left: &AggregatorTx,
    right: &AggregatorTx,
) -> Result<u64, CovenantError> {
    match kind {
        CovenantKind::DepositAggregator => {
            Ok(checked_sum([left.contract.amount, right.contract.amount])?)
        }
        // Withdrawal aggregators only carry dust; the sums live in the sum tree.
        CovenantKind::WithdrawalAggregator => {
            if left.contract.amount != right.contract.amount {
                return Err(CovenantError::AmountMismatch);
            }
            Ok(left.contract.amount)
        }
        _ => Err(CovenantError::ScriptMismatch),
    }
}

fn check_leaf(
    kind: CovenantKind,
    child: &AggregatorTx,
    leaf: &LeafData,
) -> Result<(), CovenantError> {
    if child.state_hash != leaf.leaf_hash() {
        return Err(CovenantError::StateHashMismatch);
    }

    match (kind, leaf) {
        (CovenantKind::DepositAggregator, LeafData::Deposit(deposit)) => {
            // A deposit leaf spends nothing but its fee input.
            if child.frame.inputs.len() != 1 {
                return Err(CovenantError::AncestryMismatch);
            }
            if child.contract.amount != deposit.amount() {
                return Err(CovenantError::AmountMismatch);
            }
        }
        (
            CovenantKind::WithdrawalAggregator,
            LeafData::Withdrawal {
                request,
                ownership_proof,
            },
        ) => {
            if child.frame.inputs.len() != 2 {
                return Err(CovenantError::AncestryMismatch);
            }
            if ownership_proof.payout.script != payout_script(&request.address()) {
                return Err(CovenantError::OwnershipMismatch);
            }
            let proof_input = TemplateInput::new(ownership_proof.compute_txid(), 0);
            if child.frame.inputs.first() != Some(&proof_input) {
                return Err(CovenantError::OwnershipMismatch);
            }
        }
        _ => return Err(CovenantError::ScriptMismatch),
    }

    Ok(())
}

/// Checks that `child` is itself a merge of two outputs locked by `own_script`.
///
/// Those outputs only unlock through a merge that checked `child`'s outputs.
pub(crate) fn check_merged_from(
    own_script: &ScriptBuf,
    child: &AggregatorTx,
    spent: &[AggregatorTx; 2],
) -> Result<(), CovenantError> {
    let [first, second, _fee] = child.frame.inputs.as_slice() else {
        return Err(CovenantError::AncestryMismatch);
    };
    for (input, parent) in [first, second].into_iter().zip(spent) {
        if *input != TemplateInput::new(parent.compute_txid(), 0)
            || &parent.contract.script != own_script
        {
            return Err(CovenantError::AncestryMismatch);
        }
    }
    Ok(())
}

/// Runs the checks an aggregator script performs when one of its outputs is merged.
pub fn verify_merge(ctx: &ExecutionContext<'_>, witness: &MergeWitness) -> Result<(), CovenantError> {
    let artifact = &witness.artifact;
    ctx.check_preimage(artifact)?;

    let position = artifact.input_index();
    if position > 1 {
        return Err(CovenantError::InputIndexMismatch {
            expected: 1,
            actual: position,
        });
    }
    ctx.check_input_index(artifact, position)?;

    let [left, right] = &witness.children;
    check_hash_prevouts(
        artifact,
        &[
            TemplateInput::new(left.compute_txid(), 0),
            TemplateInput::new(right.compute_txid(), 0),
            witness.fee_input.input(),
        ],
    )?;

    let own_script = ctx.script.script_pubkey();
    if &left.contract.script != own_script || &right.contract.script != own_script {
        return Err(CovenantError::ScriptMismatch);
    }
    check_hash_spent_scripts(artifact, &[own_script, own_script, &witness.fee_input.script])?;
    check_hash_spent_amounts(
        artifact,
        &[
            left.contract.amount,
            right.contract.amount,
            witness.fee_input.amount,
        ],
    )?;

    let kind = ctx.script.kind();
    match &witness.origin {
        MergeOrigin::Leaves(leaves) => {
            for (child, leaf) in witness.children.iter().zip(leaves) {
                check_leaf(kind, child, leaf)?;
            }
        }
        MergeOrigin::Merges(spent) => {
            for (child, spent) in witness.children.iter().zip(spent) {
                check_merged_from(own_script, child, spent)?;
            }
        }
    }

    let amount = merged_amount(kind, left, right)?;
    let state = hash_node(&left.state_hash, &right.state_hash);
    check_hash_outputs(
        artifact,
        &[
            OutputTemplate::new(amount, own_script.clone()),
            OutputTemplate::new(0, state_script(&state)),
            witness.change.clone(),
        ],
    )
}

/// Merges the covenant outputs of `left` and `right` into one, committing to both their states.
pub fn merge_two(
    ctx: &mut BuildContext<'_>,
    kind: CovenantKind,
    left: &AggregatorTx,
    right: &AggregatorTx,
    origin: MergeOrigin,
) -> Result<MergeTx, AggregationError> {
    let scripts = ctx.scripts;
    let aggregator = scripts.get(kind);

    let amount = merged_amount(kind, left, right)?;
    let state: Buf32 = hash_node(&left.state_hash, &right.state_hash);
    let draft = CovenantTxDraft::new()
        .covenant_input(
            TemplateInput::new(left.compute_txid(), 0).outpoint(),
            left.contract.to_txout(),
            aggregator,
        )
        .covenant_input(
            TemplateInput::new(right.compute_txid(), 0).outpoint(),
            right.contract.to_txout(),
            aggregator,
        )
        .output(aggregator.output(amount))
        .output(state_output(&state));
    let mut sealed = ctx.seal(draft)?;

    let witness = |position| -> Result<MergeWitness, AggregationError> {
        Ok(MergeWitness {
            artifact: sealed.artifact(position)?.clone(),
            children: [left.clone(), right.clone()],
            fee_input: sealed.fee_input.clone(),
            change: sealed.change.clone(),
            origin: origin.clone(),
        })
    };
    let witnesses = [witness(0)?, witness(1)?];

    for (position, witness) in witnesses.iter().enumerate() {
        verify_merge(
            &ExecutionContext::new(&sealed.tx, &sealed.prevouts, position, aggregator),
            witness,
        )?;
        sealed.set_witness(position, witness.plan(kind).into_witness(aggregator)?)?;
    }

    let template = AggregatorTx::from_tx(&sealed.tx)?;
    trace!(txid = %sealed.tx.compute_txid(), %kind, amount, "merged pair");

    Ok(MergeTx {
        tx: sealed.tx,
        template,
        witnesses,
    })
}

#[cfg(test)]
mod tests {
    use catbridge_covenant_types::DepositData;
    use catbridge_primitives::Buf20;
    use catbridge_test_utils::{covenant_scripts, funded_allocator, operator_keys, params};

    use super::*;
    use crate::leaf::{create_deposit_leaf, LeafTx};

    fn leaves(ctx: &mut BuildContext<'_>, amounts: [u64; 2]) -> [LeafTx; 2] {
        amounts.map(|amount| {
            let deposit = DepositData::new(Buf20::new([amount as u8; 20]), amount).unwrap();
            create_deposit_leaf(ctx, &deposit).unwrap()
        })
    }

    #[test]
    fn test_merge_sums_and_commits_children() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let [a, b] = leaves(&mut ctx, [1_329, 1_400]);
        let merged = merge_two(
            &mut ctx,
            CovenantKind::DepositAggregator,
            &a.template,
            &b.template,
            MergeOrigin::Leaves([a.data.clone(), b.data.clone()]),
        )
        .unwrap();

        assert_eq!(merged.template.contract.amount, 2_729);
        assert_eq!(
            merged.template.state_hash,
            hash_node(&a.data.leaf_hash(), &b.data.leaf_hash())
        );
        assert_eq!(merged.tx.input[0].previous_output.txid, a.tx.compute_txid());
        assert_eq!(merged.tx.input[1].previous_output.txid, b.tx.compute_txid());
        assert_eq!(merged.witnesses[0].role(), InputRole::LeafMerge);
        assert_eq!(merged.witnesses[1].artifact.input_index(), 1);
    }

    #[test]
    fn test_substituted_child_is_rejected() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let [a, b] = leaves(&mut ctx, [1_500, 1_888]);
        let merged = merge_two(
            &mut ctx,
            CovenantKind::DepositAggregator,
            &a.template,
            &b.template,
            MergeOrigin::Leaves([a.data.clone(), b.data.clone()]),
        )
        .unwrap();

        let aggregator = scripts.get(CovenantKind::DepositAggregator);
        let prevouts = [
            a.tx.output[0].clone(),
            b.tx.output[0].clone(),
            merged.witnesses[0].fee_input.prevout(),
        ];
        let exec = ExecutionContext::new(&merged.tx, &prevouts, 0, aggregator);
        verify_merge(&exec, &merged.witnesses[0]).unwrap();

        let mut forged = merged.witnesses[0].clone();
        forged.children[1].frame.lock_time += 1;
        assert_eq!(verify_merge(&exec, &forged), Err(CovenantError::HashPrevoutsMismatch));

        let mut forged = merged.witnesses[0].clone();
        forged.origin = MergeOrigin::Leaves([b.data.clone(), a.data.clone()]);
        assert_eq!(verify_merge(&exec, &forged), Err(CovenantError::StateHashMismatch));

        let mut forged = merged.witnesses[0].clone();
        forged.change.amount += 1;
        assert_eq!(verify_merge(&exec, &forged), Err(CovenantError::HashOutputsMismatch));

        let json = serde_json::to_string(&merged.witnesses[1]).unwrap();
        let decoded: MergeWitness = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, merged.witnesses[1]);
    }

    #[test]
    fn test_node_merge_checks_children_were_merged() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);
        let kind = CovenantKind::DepositAggregator;

        let [a, b] = leaves(&mut ctx, [1_329, 1_400]);
        let [c, d] = leaves(&mut ctx, [1_500, 1_888]);
        let left = merge_two(
            &mut ctx,
            kind,
            &a.template,
            &b.template,
            MergeOrigin::Leaves([a.data.clone(), b.data.clone()]),
        )
        .unwrap();
        let right = merge_two(
            &mut ctx,
            kind,
            &c.template,
            &d.template,
            MergeOrigin::Leaves([c.data.clone(), d.data.clone()]),
        )
        .unwrap();

        let spent = [
            [a.template.clone(), b.template.clone()],
            [c.template.clone(), d.template.clone()],
        ];
        let root = merge_two(
            &mut ctx,
            kind,
            &left.template,
            &right.template,
            MergeOrigin::Merges(spent.clone()),
        )
        .unwrap();
        assert_eq!(root.template.contract.amount, 6_117);
        assert_eq!(root.witnesses[0].role(), InputRole::NodeMerge);

        let prevouts = [
            left.tx.output[0].clone(),
            right.tx.output[0].clone(),
            root.witnesses[1].fee_input.prevout(),
        ];
        let exec = ExecutionContext::new(&root.tx, &prevouts, 1, scripts.get(kind));
        verify_merge(&exec, &root.witnesses[1]).unwrap();

        let mut forged = root.witnesses[1].clone();
        forged.origin = MergeOrigin::Merges([spent[1].clone(), spent[0].clone()]);
        assert_eq!(verify_merge(&exec, &forged), Err(CovenantError::AncestryMismatch));
    }

    #[test]
    fn test_overstated_leaf_cannot_pass_as_a_merge() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);
        let kind = CovenantKind::DepositAggregator;
        let aggregator = scripts.get(kind);

        // Holds 1_500 but commits to a deposit of 1_000_000.
        let claimed = DepositData::new(Buf20::new([7; 20]), 1_000_000).unwrap();
        let draft = CovenantTxDraft::new()
            .output(aggregator.output(1_500))
            .output(state_output(&claimed.leaf_hash()));
        let sealed = ctx.seal(draft).unwrap();
        let forged = AggregatorTx::from_tx(&sealed.tx).unwrap();
        let [honest, _] = leaves(&mut ctx, [1_888, 1_888]);

        assert_eq!(
            merge_two(
                &mut ctx,
                kind,
                &forged,
                &honest.template,
                MergeOrigin::Leaves([LeafData::Deposit(claimed), honest.data.clone()]),
            )
            .unwrap_err(),
            AggregationError::Covenant(CovenantError::AmountMismatch)
        );

        let spent = [
            [honest.template.clone(), honest.template.clone()],
            [honest.template.clone(), honest.template.clone()],
        ];
        assert_eq!(
            merge_two(
                &mut ctx,
                kind,
                &forged,
                &honest.template,
                MergeOrigin::Merges(spent),
            )
            .unwrap_err(),
            AggregationError::Covenant(CovenantError::AncestryMismatch)
        );
    }
}
