//! A funded test operator and the full bridge lifecycle driven through it.

use anyhow::{ensure, Context};
use bitcoin::{OutPoint, Transaction, Txid};
use catbridge_aggregation::{
    aggregate_deposits, aggregate_withdrawals, DepositAggregation, WithdrawalAggregation,
};
use catbridge_bridge::{deploy, settle_deposits, settle_withdrawals, BridgeUtxo};
use catbridge_covenant_types::CovenantScripts;
use catbridge_crypto::OperatorKeys;
use catbridge_expansion::{expand, ExpansionResult};
use catbridge_primitives::ProtocolParams;
use catbridge_test_utils::{
    covenant_scripts, deposits, funded_operator, operator_keys, params, withdrawals,
};
use catbridge_txbuilder::{BuildContext, FeeUtxoAllocator};

/// An operator holding the deterministic test key and a consolidated funding output.
#[derive(Debug)]
pub struct TestOperator {
    pub keys: OperatorKeys,
    pub scripts: CovenantScripts,
    pub params: ProtocolParams,
    pub funding_tx: Transaction,
    allocator: FeeUtxoAllocator,
}

impl TestOperator {
    pub fn new() -> Self {
        let keys = operator_keys();
        let (funding_tx, allocator) = funded_operator(&keys);
        Self {
            keys,
            scripts: covenant_scripts(),
            params: params(),
            funding_tx,
            allocator,
        }
    }

    pub fn ctx(&mut self) -> BuildContext<'_> {
        BuildContext::new(
            &mut self.allocator,
            &self.keys,
            &self.scripts,
            &self.params,
        )
    }

    /// Operator change left after everything built so far.
    pub fn balance(&self) -> u64 {
        self.allocator.balance()
    }
}

impl Default for TestOperator {
    fn default() -> Self {
        Self::new()
    }
}

/// One deposit batch and one withdrawal batch settled into a fresh bridge.
#[derive(Debug)]
pub struct Settled {
    pub deployed: BridgeUtxo,
    pub deposit_batch: DepositAggregation,
    pub credited: BridgeUtxo,
    pub withdrawal_batch: WithdrawalAggregation,
    pub debited: BridgeUtxo,
}

impl Settled {
    /// Every transaction built, the funding transaction excluded.
    pub fn transactions(&self) -> Vec<&Transaction> {
        let mut txs = vec![&self.deployed.tx];
        txs.extend(&self.deposit_batch.leaf_txs);
        txs.extend(&self.deposit_batch.merge_txs);
        txs.push(&self.credited.tx);
        txs.extend(&self.withdrawal_batch.ownership_proof_txs);
        txs.extend(&self.withdrawal_batch.leaf_txs);
        txs.extend(&self.withdrawal_batch.merge_txs);
        txs.push(&self.debited.tx);
        txs
    }
}

pub fn settle_batches(
    operator: &mut TestOperator,
    deposit_amounts: &[u64],
    withdrawal_amounts: &[u64],
) -> anyhow::Result<Settled> {
    let deposit_requests = deposits(&operator.keys, deposit_amounts);
    let withdrawal_requests = withdrawals(&operator.keys, withdrawal_amounts);
    let mut ctx = operator.ctx();

    let deployed = deploy(&mut ctx).context("deploy")?;
    let deposit_batch =
        aggregate_deposits(&mut ctx, &deposit_requests).context("aggregate deposits")?;
    let credited =
        settle_deposits(&mut ctx, &deployed, &deposit_batch).context("settle deposits")?;
    let withdrawal_batch = aggregate_withdrawals(&mut ctx, &withdrawal_requests)
        .context("aggregate withdrawals")?;
    let debited = settle_withdrawals(&mut ctx, &credited, &withdrawal_batch)
        .context("settle withdrawals")?;

    Ok(Settled {
        deployed,
        deposit_batch,
        credited,
        withdrawal_batch,
        debited,
    })
}

/// [`settle_batches`] followed by the expansion of the withdrawal batch.
pub fn run_lifecycle(
    operator: &mut TestOperator,
    deposit_amounts: &[u64],
    withdrawal_amounts: &[u64],
) -> anyhow::Result<(Settled, ExpansionResult)> {
    let settled = settle_batches(operator, deposit_amounts, withdrawal_amounts)?;
    let expansion = expand(&mut operator.ctx(), &settled.debited, &settled.withdrawal_batch)
        .context("expand")?;
    Ok((settled, expansion))
}

/// Follows input 0 of `tx` back through `splits`, returning the split txids passed and the
/// first outpoint outside of them.
pub fn trace_expander_input(
    tx: &Transaction,
    splits: &[Transaction],
) -> anyhow::Result<(Vec<Txid>, OutPoint)> {
    let mut hops = Vec::new();
    let mut outpoint = tx
        .input
        .first()
        .context("transaction has no inputs")?
        .previous_output;

    while let Some(split) = splits.iter().find(|s| s.compute_txid() == outpoint.txid) {
        ensure!(hops.len() < splits.len(), "split chain loops");
        hops.push(outpoint.txid);
        outpoint = split.input[0].previous_output;
    }

    Ok((hops, outpoint))
}
