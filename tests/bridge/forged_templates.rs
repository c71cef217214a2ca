//! A witness describing a previous transaction other than the one actually spent.

#![allow(
    unused_crate_dependencies,
    reason = "test dependencies shared across test suite"
)]

use catbridge_aggregation::{create_deposit_leaf, merge_two, verify_merge, LeafTx, MergeOrigin};
use catbridge_covenant_types::{CovenantError, CovenantKind, DepositData, ExecutionContext};
use catbridge_expansion::{
    create_payout, create_split, verify_payout, verify_split, SplitChildren, SplitParent,
};
use catbridge_txbuilder::BuildContext;
use integration_tests::harness::{settle_batches, TestOperator};

fn leaves(ctx: &mut BuildContext<'_>, deposit: DepositData) -> [LeafTx; 2] {
    [
        create_deposit_leaf(ctx, &deposit).unwrap(),
        create_deposit_leaf(ctx, &deposit).unwrap(),
    ]
}

#[test]
fn test_merge_rejects_forged_child() {
    let mut operator = TestOperator::new();
    let deposit = DepositData::new(operator.keys.address_hash(), 1_329).unwrap();
    let scripts = operator.scripts.clone();
    let mut ctx = operator.ctx();

    let [a, b] = leaves(&mut ctx, deposit);
    let merged = merge_two(
        &mut ctx,
        CovenantKind::DepositAggregator,
        &a.template,
        &b.template,
        MergeOrigin::Leaves([a.data.clone(), b.data.clone()]),
    )
    .unwrap();

    let prevouts = [
        a.tx.output[0].clone(),
        b.tx.output[0].clone(),
        merged.witnesses[1].fee_input.prevout(),
    ];
    let exec = ExecutionContext::new(
        &merged.tx,
        &prevouts,
        1,
        scripts.get(CovenantKind::DepositAggregator),
    );
    verify_merge(&exec, &merged.witnesses[1]).unwrap();

    let mut forged = merged.witnesses[1].clone();
    forged.children[0].frame.version = 1;
    assert_eq!(
        verify_merge(&exec, &forged),
        Err(CovenantError::HashPrevoutsMismatch)
    );
}

#[test]
fn test_expander_rejects_forged_parent() {
    let mut operator = TestOperator::new();
    let settled = settle_batches(
        &mut operator,
        &[1_329, 1_400, 1_500, 1_888],
        &[1_000, 800, 700, 997],
    )
    .unwrap();
    let scripts = operator.scripts.clone();
    let expander = scripts.get(CovenantKind::WithdrawalExpander);
    let sums = &settled.withdrawal_batch.intermediate_sums;
    let root = sums.root();
    let nodes = [*sums.node(1, 0).unwrap(), *sums.node(1, 1).unwrap()];
    let mut ctx = operator.ctx();

    let split = create_split(
        &mut ctx,
        SplitParent::Bridge(settled.debited.template.clone()),
        root,
        SplitChildren::Nodes(nodes),
    )
    .unwrap();
    let prevouts = [
        settled.debited.tx.output[2].clone(),
        split.witness.fee_input.prevout(),
    ];
    let exec = ExecutionContext::new(&split.tx, &prevouts, 0, expander);
    verify_split(&exec, &split.witness).unwrap();

    let mut forged = split.witness.clone();
    let mut parent = settled.debited.template.clone();
    parent.change.amount += 1;
    forged.parent = SplitParent::Bridge(parent);
    assert_eq!(
        verify_split(&exec, &forged),
        Err(CovenantError::HashPrevoutsMismatch)
    );

    let child_states = [root.prev_hash_0, root.prev_hash_1];
    let leaf_split = create_split(
        &mut ctx,
        SplitParent::Expander {
            tx: split.template.clone(),
            child_states,
            branch: 0,
        },
        &nodes[0],
        SplitChildren::Leaves([
            settled.withdrawal_batch.requests[0],
            settled.withdrawal_batch.requests[1],
        ]),
    )
    .unwrap();
    let payout = create_payout(
        &mut ctx,
        &leaf_split.template,
        [nodes[0].prev_hash_0, nodes[0].prev_hash_1],
        0,
        &settled.withdrawal_batch.requests[0],
    )
    .unwrap();
    let prevouts = [
        leaf_split.tx.output[0].clone(),
        payout.witness.fee_input.prevout(),
    ];
    let exec = ExecutionContext::new(&payout.tx, &prevouts, 0, expander);
    verify_payout(&exec, &payout.witness).unwrap();

    let mut forged = payout.witness.clone();
    forged.parent.frame.lock_time ^= 1;
    assert_eq!(
        verify_payout(&exec, &forged),
        Err(CovenantError::HashPrevoutsMismatch)
    );
}
