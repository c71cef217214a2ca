//! Deposit, withdrawal and expansion of one batch each, end to end.

#![allow(
    unused_crate_dependencies,
    reason = "test dependencies shared across test suite"
)]

use std::collections::HashSet;

use bitcoin::Amount;
use catbridge_aggregation::aggregate_deposits;
use catbridge_bridge::settle_deposits;
use catbridge_covenant_types::{scripts::payout_script, BatchRequest};
use catbridge_expansion::expand;
use catbridge_merkle::hash_node;
use catbridge_test_utils::deposits;
use integration_tests::harness::{
    run_lifecycle, settle_batches, trace_expander_input, TestOperator,
};

const DEPOSITS: [u64; 4] = [1_329, 1_400, 1_500, 1_888];
const WITHDRAWALS: [u64; 4] = [1_000, 800, 700, 997];

#[test]
fn test_deposit_settlement_credits_ledger() {
    let mut operator = TestOperator::new();
    let (settled, _) = run_lifecycle(&mut operator, &DEPOSITS, &WITHDRAWALS).unwrap();
    let initial = operator.params.bridge_initial_amount;

    assert_eq!(settled.deposit_batch.total(), 6_117);
    assert_eq!(settled.deposit_batch.root.contract.amount, 6_117);
    assert_eq!(settled.credited.amount(), initial + 6_117);
    assert_ne!(settled.credited.state().hash(), settled.deployed.state().hash());
    assert_eq!(
        settled.credited.state().accounts_root,
        settled.credited.ledger.root()
    );

    let address = operator.keys.address_hash();
    let slot = settled.credited.ledger.slot_of(&address).unwrap();
    assert_eq!(settled.credited.ledger.account(slot).unwrap().balance, 6_117);
}

#[test]
fn test_withdrawal_settlement_debits_ledger() {
    let mut operator = TestOperator::new();
    let (settled, _) = run_lifecycle(&mut operator, &DEPOSITS, &WITHDRAWALS).unwrap();
    let initial = operator.params.bridge_initial_amount;
    let batch = &settled.withdrawal_batch;

    let leaves: Vec<_> = batch.requests.iter().map(BatchRequest::leaf_hash).collect();
    assert_eq!(
        batch.root.state_hash,
        hash_node(
            &hash_node(&leaves[0], &leaves[1]),
            &hash_node(&leaves[2], &leaves[3])
        )
    );
    assert_eq!(batch.total(), 3_497);

    let debited = &settled.debited;
    assert_eq!(debited.amount(), initial + 6_117 - 3_497);
    assert_eq!(debited.template.expander.as_ref().unwrap().amount, 3_497);
    assert_eq!(debited.state().expander_root, batch.intermediate_sums.root_hash());

    let slot = debited.ledger.slot_of(&operator.keys.address_hash()).unwrap();
    assert_eq!(debited.ledger.account(slot).unwrap().balance, 2_620);
}

#[test]
fn test_expansion_pays_each_withdrawal() {
    let mut operator = TestOperator::new();
    let (settled, expansion) = run_lifecycle(&mut operator, &DEPOSITS, &WITHDRAWALS).unwrap();
    let settlement_output = settled.debited.expander_outpoint().unwrap();
    let payout_script = payout_script(&operator.keys.address_hash());

    assert_eq!(expansion.payout_txs.len(), 4);
    for (payout, amount) in expansion.payout_txs.iter().zip(WITHDRAWALS) {
        assert_eq!(payout.output[0].value, Amount::from_sat(amount));
        assert_eq!(payout.output[0].script_pubkey, payout_script);

        let (hops, origin) = trace_expander_input(payout, &expansion.split_txs).unwrap();
        assert_eq!(hops.len(), 2, "payout passes through two expander nodes");
        assert_eq!(origin, settlement_output);
    }
}

#[test]
fn test_deposit_keeps_pending_expansion() {
    let mut operator = TestOperator::new();
    let settled = settle_batches(&mut operator, &DEPOSITS, &WITHDRAWALS).unwrap();
    let pending = settled.debited.state().expander_root;
    assert!(!pending.is_zero());

    let requests = deposits(&operator.keys, &[100, 200, 300, 400]);
    let mut ctx = operator.ctx();
    let batch = aggregate_deposits(&mut ctx, &requests).unwrap();
    let credited = settle_deposits(&mut ctx, &settled.debited, &batch).unwrap();

    assert_eq!(credited.state().expander_root, pending);
    assert!(credited.expander_outpoint().is_none());
    assert_eq!(credited.amount(), settled.debited.amount() + 1_000);

    // The expander output of the withdrawal settlement is still there to expand.
    let expansion = expand(&mut ctx, &settled.debited, &settled.withdrawal_batch).unwrap();
    assert_eq!(expansion.payout_txs.len(), 4);
    for (payout, amount) in expansion.payout_txs.iter().zip(WITHDRAWALS) {
        assert_eq!(payout.output[0].value, Amount::from_sat(amount));
    }
}

#[test]
fn test_no_output_is_spent_twice() {
    let mut operator = TestOperator::new();
    let (settled, expansion) = run_lifecycle(&mut operator, &DEPOSITS, &WITHDRAWALS).unwrap();

    let mut txs = settled.transactions();
    txs.push(&operator.funding_tx);
    txs.extend(&expansion.split_txs);
    txs.extend(&expansion.payout_txs);
    assert_eq!(txs.len(), 29);

    let mut spent = HashSet::new();
    for tx in &txs {
        for input in &tx.input {
            assert!(
                spent.insert(input.previous_output),
                "{} spent twice",
                input.previous_output
            );
        }
    }

    let tx_fee = operator.params.tx_fee;
    let funded = operator.funding_tx.output[0].value.to_sat();
    assert!(funded - operator.balance() >= 28 * tx_fee);
}
