//! Whole-batch aggregation and the records it produces.

use bitcoin::Transaction;
use catbridge_covenant_types::{
    AggregatorTx, BatchRequest, CovenantError, CovenantKind, DepositData, SumTree,
    WithdrawalData,
};
use catbridge_merkle::MerkleTree;
use catbridge_primitives::{constants::BATCH_SIZE, serde_helpers::consensus_hex_seq};
use catbridge_txbuilder::BuildContext;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    errors::AggregationError,
    leaf::{create_deposit_leaf, create_ownership_proof, create_withdrawal_leaf, LeafTx},
    merge::{merge_two, MergeOrigin},
};

/// A deposit batch aggregated into one deposit aggregator output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAggregation {
    pub requests: Vec<DepositData>,
    /// Merkle tree over the request digests; its root is the root output's state.
    pub tree: MerkleTree,
    #[serde(with = "consensus_hex_seq")]
    pub leaf_txs: Vec<Transaction>,
    /// Merge transactions level by level, the root last.
    #[serde(with = "consensus_hex_seq")]
    pub merge_txs: Vec<Transaction>,
    pub root: AggregatorTx,
    /// The two transactions the root merged, which settlement shows to the root's covenant.
    pub root_merged_from: [AggregatorTx; 2],
}

impl DepositAggregation {
    /// Amount locked in the root output.
    pub fn total(&self) -> u64 {
        self.root.contract.amount
    }
}

/// A withdrawal batch aggregated into one withdrawal aggregator output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalAggregation {
    pub requests: Vec<WithdrawalData>,
    pub tree: MerkleTree,
    #[serde(with = "consensus_hex_seq")]
    pub ownership_proof_txs: Vec<Transaction>,
    #[serde(with = "consensus_hex_seq")]
    pub leaf_txs: Vec<Transaction>,
    #[serde(with = "consensus_hex_seq")]
    pub merge_txs: Vec<Transaction>,
    pub root: AggregatorTx,
    pub root_merged_from: [AggregatorTx; 2],
    /// Amount sums over the batch, split back out by expansion.
    pub intermediate_sums: SumTree,
}

impl WithdrawalAggregation {
    /// Total amount the batch withdraws.
    pub fn total(&self) -> u64 {
        self.intermediate_sums.total()
    }
}

fn check_batch_size(len: usize) -> Result<(), AggregationError> {
    if len != BATCH_SIZE {
        return Err(AggregationError::InvalidBatchSize {
            expected: BATCH_SIZE,
            actual: len,
        });
    }
    Ok(())
}

fn batch_tree<R: BatchRequest>(requests: &[R]) -> Result<MerkleTree, AggregationError> {
    let leaves: Vec<_> = requests.iter().map(BatchRequest::leaf_hash).collect();
    Ok(MerkleTree::build(&leaves)?)
}

/// Merges leaves level by level until one output is left.
///
/// Returns the merge transactions, the root and the pair the root was merged from.
fn merge_levels(
    ctx: &mut BuildContext<'_>,
    kind: CovenantKind,
    leaves: &[LeafTx],
) -> Result<(Vec<Transaction>, AggregatorTx, [AggregatorTx; 2]), AggregationError> {
    let mut level: Vec<AggregatorTx> = leaves.iter().map(|leaf| leaf.template.clone()).collect();
    // The pair each output of the current level was merged from; empty at the leaf level.
    let mut merged_from: Vec<[AggregatorTx; 2]> = Vec::new();
    let mut txs = Vec::new();

    let mut depth = 0;
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2);
        let mut next_from = Vec::with_capacity(level.len() / 2);
        for (index, pair) in level.chunks(2).enumerate() {
            let [left, right] = pair else {
                return Err(CovenantError::BatchSize {
                    expected: BATCH_SIZE,
                    actual: leaves.len(),
                }
                .into());
            };
            let origin = if merged_from.is_empty() {
                MergeOrigin::Leaves([
                    leaves[2 * index].data.clone(),
                    leaves[2 * index + 1].data.clone(),
                ])
            } else {
                MergeOrigin::Merges([
                    merged_from[2 * index].clone(),
                    merged_from[2 * index + 1].clone(),
                ])
            };
            let merged = merge_two(ctx, kind, left, right, origin)?;
            txs.push(merged.tx);
            next.push(merged.template);
            next_from.push([left.clone(), right.clone()]);
        }

        depth += 1;
        debug!(%kind, depth, outputs = next.len(), "merged aggregation level");
        level = next;
        merged_from = next_from;
    }

    let root = level.pop().ok_or(AggregationError::EmptyTree)?;
    let root_merged_from = merged_from.pop().ok_or(AggregationError::EmptyTree)?;
    Ok((txs, root, root_merged_from))
}

/// Aggregates exactly [`BATCH_SIZE`] deposits into one deposit aggregator output.
#[instrument(skip_all, fields(requests = deposits.len()))]
pub fn aggregate_deposits(
    ctx: &mut BuildContext<'_>,
    deposits: &[DepositData],
) -> Result<DepositAggregation, AggregationError> {
    check_batch_size(deposits.len())?;
    let tree = batch_tree(deposits)?;

    let leaves = deposits
        .iter()
        .map(|deposit| create_deposit_leaf(ctx, deposit))
        .collect::<Result<Vec<_>, _>>()?;
    info!(leaves = leaves.len(), "created deposit leaves");

    let (merge_txs, root, root_merged_from) =
        merge_levels(ctx, CovenantKind::DepositAggregator, &leaves)?;
    if root.state_hash != tree.root() {
        return Err(CovenantError::StateHashMismatch.into());
    }
    info!(root = %root.state_hash, amount = root.contract.amount, "aggregated deposit batch");

    Ok(DepositAggregation {
        requests: deposits.to_vec(),
        tree,
        leaf_txs: leaves.into_iter().map(|leaf| leaf.tx).collect(),
        merge_txs,
        root,
        root_merged_from,
    })
}

/// Aggregates exactly [`BATCH_SIZE`] withdrawals into one withdrawal aggregator output.
///
/// Each withdrawal first gets an ownership proof paying its address, which its leaf then spends.
#[instrument(skip_all, fields(requests = withdrawals.len()))]
pub fn aggregate_withdrawals(
    ctx: &mut BuildContext<'_>,
    withdrawals: &[WithdrawalData],
) -> Result<WithdrawalAggregation, AggregationError> {
    check_batch_size(withdrawals.len())?;
    let tree = batch_tree(withdrawals)?;
    let intermediate_sums = SumTree::build(withdrawals)?;

    let mut ownership_proof_txs = Vec::with_capacity(withdrawals.len());
    let mut leaves = Vec::with_capacity(withdrawals.len());
    for withdrawal in withdrawals {
        let (proof_tx, proof) = create_ownership_proof(ctx, withdrawal)?;
        leaves.push(create_withdrawal_leaf(ctx, withdrawal, &proof)?);
        ownership_proof_txs.push(proof_tx);
    }
    info!(leaves = leaves.len(), "created withdrawal leaves");

    let (merge_txs, root, root_merged_from) =
        merge_levels(ctx, CovenantKind::WithdrawalAggregator, &leaves)?;
    if root.state_hash != tree.root() {
        return Err(CovenantError::StateHashMismatch.into());
    }
    info!(
        root = %root.state_hash,
        total = intermediate_sums.total(),
        "aggregated withdrawal batch"
    );

    Ok(WithdrawalAggregation {
        requests: withdrawals.to_vec(),
        tree,
        ownership_proof_txs,
        leaf_txs: leaves.into_iter().map(|leaf| leaf.tx).collect(),
        merge_txs,
        root,
        root_merged_from,
        intermediate_sums,
    })
}
