//! Deployment and settlement transactions.

use bitcoin::{OutPoint, Transaction};
use catbridge_aggregation::{
    finalize::FINALIZE_INPUT, verify_finalize, DepositAggregation, FinalizeWitness,
    WithdrawalAggregation,
};
use catbridge_covenant_types::{
    batch_total, scripts::state_output, AggregatorTx, BatchDirection, BatchRequest, BridgeState,
    BridgeTx, CovenantError, CovenantKind, CovenantTemplate, ExecutionContext, TemplateInput, WitnessItems,
};
use catbridge_merkle::MerkleTree;
use catbridge_primitives::encoding::checked_sum;
use catbridge_txbuilder::{BuildContext, CovenantTxDraft};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    errors::BridgeError,
    ledger::AccountLedger,
    settlement::{expander_root, verify_settlement, SettlementWitness, SETTLEMENT_INPUT},
};

/// The current bridge output, the transaction that created it and the ledger it commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeUtxo {
    #[serde(with = "catbridge_primitives::serde_helpers::consensus_hex")]
    pub tx: Transaction,
    pub template: BridgeTx,
    pub ledger: AccountLedger,
}

impl BridgeUtxo {
    pub fn state(&self) -> &BridgeState {
        &self.template.state
    }

    /// Amount locked in the bridge output.
    pub fn amount(&self) -> u64 {
        self.template.bridge.amount
    }

    pub fn outpoint(&self) -> OutPoint {
        TemplateInput::new(self.template.compute_txid(), 0).outpoint()
    }

    /// The expander output of a withdrawal settlement, if this is one.
    pub fn expander_outpoint(&self) -> Option<OutPoint> {
        self.template.expander.as_ref().map(|_| {
            TemplateInput::new(self.template.compute_txid(), BridgeTx::EXPANDER_VOUT).outpoint()
        })
    }
}

/// Creates the bridge output over an empty ledger.
#[instrument(skip_all)]
pub fn deploy(ctx: &mut BuildContext<'_>) -> Result<BridgeUtxo, BridgeError> {
    let scripts = ctx.scripts;
    let bridge = scripts.get(CovenantKind::Bridge);

    let ledger = AccountLedger::new()?;
    let state = BridgeState::new(
        ledger.root(),
        scripts
            .get(CovenantKind::DepositAggregator)
            .script_pubkey()
            .clone(),
        scripts
            .get(CovenantKind::WithdrawalAggregator)
            .script_pubkey()
            .clone(),
    );

    let draft = CovenantTxDraft::new()
        .output(bridge.output(ctx.params.bridge_initial_amount))
        .output(state_output(&state.hash()));
    let sealed = ctx.seal(draft)?;
    let template = BridgeTx::from_tx(&sealed.tx, state)?;
    info!(txid = %sealed.tx.compute_txid(), state = %template.state.hash(), "deployed bridge");

    Ok(BridgeUtxo {
        tx: sealed.tx,
        template,
        ledger,
    })
}

/// Settles an aggregated deposit batch, crediting every deposit to its account.
#[instrument(skip_all, fields(total = aggregation.total()))]
pub fn settle_deposits(
    ctx: &mut BuildContext<'_>,
    bridge: &BridgeUtxo,
    aggregation: &DepositAggregation,
) -> Result<BridgeUtxo, BridgeError> {
    settle(
        ctx,
        bridge,
        &aggregation.requests,
        &aggregation.tree,
        &aggregation.root,
        &aggregation.root_merged_from,
        BatchDirection::Deposit,
    )
}

/// Settles an aggregated withdrawal batch, debiting every account and locking the withdrawn
/// total in an expander output.
#[instrument(skip_all, fields(total = aggregation.total()))]
pub fn settle_withdrawals(
    ctx: &mut BuildContext<'_>,
    bridge: &BridgeUtxo,
    aggregation: &WithdrawalAggregation,
) -> Result<BridgeUtxo, BridgeError> {
    let settled = settle(
        ctx,
        bridge,
        &aggregation.requests,
        &aggregation.tree,
        &aggregation.root,
        &aggregation.root_merged_from,
        BatchDirection::Withdrawal,
    )?;
    if settled.state().expander_root != aggregation.intermediate_sums.root_hash() {
        return Err(BridgeError::StateMismatch(
            "expander root differs from the batch sum tree".to_owned(),
        ));
    }
    Ok(settled)
}

fn settle<R: BatchRequest + WitnessItems>(
    ctx: &mut BuildContext<'_>,
    bridge: &BridgeUtxo,
    requests: &[R],
    batch_tree: &MerkleTree,
    root: &AggregatorTx,
    root_merged_from: &[AggregatorTx; 2],
    direction: BatchDirection,
) -> Result<BridgeUtxo, BridgeError> {
    let scripts = ctx.scripts;
    let bridge_script = scripts.get(CovenantKind::Bridge);
    let expander_script = scripts.get(CovenantKind::WithdrawalExpander);
    let aggregator_script = match direction {
        BatchDirection::Deposit => scripts.get(CovenantKind::DepositAggregator),
        BatchDirection::Withdrawal => scripts.get(CovenantKind::WithdrawalAggregator),
    };

    let (updates, ledger) = bridge
        .ledger
        .prepare_updates(requests, batch_tree, direction)?;
    let total = batch_total(&updates)?;
    let (amount, expander) = match direction {
        BatchDirection::Deposit => (
            checked_sum([bridge.amount(), total])?,
            bridge.state().expander_root,
        ),
        BatchDirection::Withdrawal => (
            bridge
                .amount()
                .checked_sub(total)
                .ok_or(CovenantError::BalanceUnderflow)?,
            expander_root(&updates)?,
        ),
    };
    let state = bridge.state().transition(ledger.root(), expander);

    let mut draft = CovenantTxDraft::new()
        .covenant_input(bridge.outpoint(), bridge.template.bridge.to_txout(), bridge_script)
        .covenant_input(
            TemplateInput::new(root.compute_txid(), 0).outpoint(),
            root.contract.to_txout(),
            aggregator_script,
        )
        .output(bridge_script.output(amount))
        .output(state_output(&state.hash()));
    if direction == BatchDirection::Withdrawal {
        draft = draft.output(expander_script.output(total));
    }
    let mut sealed = ctx.seal(draft)?;

    let settlement = SettlementWitness {
        artifact: sealed.artifact(SETTLEMENT_INPUT as usize)?.clone(),
        direction,
        prev: bridge.template.clone(),
        aggregator: root.clone(),
        updates,
        fee_input: sealed.fee_input.clone(),
        change: sealed.change.clone(),
    };
    let finalize = FinalizeWitness {
        artifact: sealed.artifact(FINALIZE_INPUT as usize)?.clone(),
        aggregator: root.clone(),
        merged_from: root_merged_from.clone(),
        bridge: bridge.template.clone(),
        fee_input: sealed.fee_input.clone(),
    };

    let verified = verify_settlement(
        &ExecutionContext::new(
            &sealed.tx,
            &sealed.prevouts,
            SETTLEMENT_INPUT as usize,
            bridge_script,
        ),
        &settlement,
        expander_script.script_pubkey(),
    )?;
    if verified != state {
        return Err(BridgeError::StateMismatch(verified.hash().to_string()));
    }
    verify_finalize(
        &ExecutionContext::new(
            &sealed.tx,
            &sealed.prevouts,
            FINALIZE_INPUT as usize,
            aggregator_script,
        ),
        &finalize,
        bridge_script.script_pubkey(),
    )?;

    sealed.set_witness(
        SETTLEMENT_INPUT as usize,
        settlement.plan().into_witness(bridge_script)?,
    )?;
    sealed.set_witness(
        FINALIZE_INPUT as usize,
        finalize
            .plan(aggregator_script.kind())
            .into_witness(aggregator_script)?,
    )?;

    let template = BridgeTx::from_tx(&sealed.tx, state)?;
    info!(
        txid = %sealed.tx.compute_txid(),
        ?direction,
        amount,
        accounts_root = %template.state.accounts_root,
        "settled batch"
    );

    Ok(BridgeUtxo {
        tx: sealed.tx,
        template,
        ledger,
    })
}
