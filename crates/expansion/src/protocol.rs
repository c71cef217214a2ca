//! Full expansion of a settled withdrawal batch.

use bitcoin::Transaction;
use catbridge_aggregation::WithdrawalAggregation;
use catbridge_bridge::BridgeUtxo;
use catbridge_covenant_types::{SumTree, WithdrawalData};
use catbridge_primitives::serde_helpers::consensus_hex_seq;
use catbridge_txbuilder::BuildContext;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    errors::ExpansionError,
    payout::create_payout,
    split::{create_split, SplitChildren, SplitParent},
};

/// The transactions that expand one withdrawal batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionResult {
    /// Splits in the order they were built, the top split first.
    #[serde(with = "consensus_hex_seq")]
    pub split_txs: Vec<Transaction>,
    /// One payout per withdrawal, in batch order.
    #[serde(with = "consensus_hex_seq")]
    pub payout_txs: Vec<Transaction>,
}

struct Expansion<'t> {
    sums: &'t SumTree,
    requests: &'t [WithdrawalData],
    result: ExpansionResult,
}

impl Expansion<'_> {
    /// Splits the node at `(depth, index)` and then everything below it, left branch first.
    fn expand_node(
        &mut self,
        ctx: &mut BuildContext<'_>,
        parent: SplitParent,
        depth: usize,
        index: usize,
    ) -> Result<(), ExpansionError> {
        let node = *self
            .sums
            .node(depth, index)
            .ok_or(ExpansionError::SumTreeMismatch)?;
        let at_leaves = depth + 1 == self.sums.height();

        let children = if at_leaves {
            let pair = self
                .requests
                .get(2 * index..2 * index + 2)
                .ok_or(ExpansionError::SumTreeMismatch)?;
            SplitChildren::Leaves([pair[0], pair[1]])
        } else {
            let child = |branch| {
                self.sums
                    .node(depth + 1, 2 * index + branch)
                    .copied()
                    .ok_or(ExpansionError::SumTreeMismatch)
            };
            SplitChildren::Nodes([child(0)?, child(1)?])
        };

        let split = create_split(ctx, parent, &node, children)?;
        let child_states = [node.prev_hash_0, node.prev_hash_1];
        self.result.split_txs.push(split.tx);

        for branch in 0..2 {
            let position = 2 * index + branch;
            match &split.witness.children {
                SplitChildren::Leaves(leaves) => {
                    let payout =
                        create_payout(ctx, &split.template, child_states, branch, &leaves[branch])?;
                    self.result.payout_txs.push(payout.tx);
                }
                SplitChildren::Nodes(_) => {
                    let parent = SplitParent::Expander {
                        tx: split.template.clone(),
                        child_states,
                        branch,
                    };
                    self.expand_node(ctx, parent, depth + 1, position)?;
                }
            }
        }

        Ok(())
    }
}

/// Expands the expander output of a withdrawal settlement into one payout per request.
#[instrument(skip_all, fields(total = aggregation.total()))]
pub fn expand(
    ctx: &mut BuildContext<'_>,
    bridge: &BridgeUtxo,
    aggregation: &WithdrawalAggregation,
) -> Result<ExpansionResult, ExpansionError> {
    let expander = bridge
        .template
        .expander
        .as_ref()
        .ok_or(ExpansionError::NothingToExpand)?;

    let sums = &aggregation.intermediate_sums;
    if SumTree::build(&aggregation.requests)? != *sums || expander.amount != sums.total() {
        return Err(ExpansionError::SumTreeMismatch);
    }
    if bridge.state().expander_root != sums.root_hash() {
        return Err(ExpansionError::ExpanderRootMismatch);
    }

    let mut expansion = Expansion {
        sums,
        requests: &aggregation.requests,
        result: ExpansionResult {
            split_txs: Vec::new(),
            payout_txs: Vec::new(),
        },
    };
    expansion.expand_node(ctx, SplitParent::Bridge(bridge.template.clone()), 0, 0)?;

    info!(
        splits = expansion.result.split_txs.len(),
        payouts = expansion.result.payout_txs.len(),
        "expanded withdrawal batch"
    );
    Ok(expansion.result)
}

#[cfg(test)]
mod tests {
    use bitcoin::Amount;
    use catbridge_aggregation::aggregate_deposits;
    use catbridge_bridge::settle_deposits;
    use catbridge_covenant_types::scripts::payout_script;
    use catbridge_test_utils::{covenant_scripts, deposits, funded_allocator, operator_keys, params};

    use super::*;
    use crate::fixtures::{settled_withdrawals, WITHDRAWALS};

    #[test]
    fn test_expand_pays_every_withdrawal() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let (bridge, batch) = settled_withdrawals(&mut ctx, &keys);
        let result = expand(&mut ctx, &bridge, &batch).unwrap();

        assert_eq!(result.split_txs.len(), 3);
        assert_eq!(result.payout_txs.len(), 4);

        let top = &result.split_txs[0];
        assert_eq!(Some(top.input[0].previous_output), bridge.expander_outpoint());
        assert_eq!(top.output[0].value, Amount::from_sat(1_800));
        assert_eq!(top.output[1].value, Amount::from_sat(1_697));

        // Depth first: the left subtree is split and paid before the right one.
        assert_eq!(result.split_txs[1].input[0].previous_output.txid, top.compute_txid());
        assert_eq!(result.split_txs[1].input[0].previous_output.vout, 0);
        assert_eq!(result.split_txs[2].input[0].previous_output.vout, 1);

        let payout_script = payout_script(&keys.address_hash());
        for (payout, amount) in result.payout_txs.iter().zip(WITHDRAWALS) {
            assert_eq!(payout.output.len(), 2);
            assert_eq!(payout.output[0].value, Amount::from_sat(amount));
            assert_eq!(payout.output[0].script_pubkey, payout_script);
            assert!(!payout.input[0].witness.is_empty());
        }
        assert_eq!(
            result.payout_txs[3].input[0].previous_output.txid,
            result.split_txs[2].compute_txid()
        );

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(serde_json::from_str::<ExpansionResult>(&json).unwrap(), result);
    }

    #[test]
    fn test_deposit_settlement_has_nothing_to_expand() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let (bridge, withdrawal_batch) = settled_withdrawals(&mut ctx, &keys);
        let batch = aggregate_deposits(&mut ctx, &deposits(&keys, &[1_000; 4])).unwrap();
        let credited = settle_deposits(&mut ctx, &bridge, &batch).unwrap();

        assert_eq!(
            expand(&mut ctx, &credited, &withdrawal_batch).unwrap_err(),
            ExpansionError::NothingToExpand
        );
    }

    #[test]
    fn test_expand_rejects_other_batch() {
        let keys = operator_keys();
        let scripts = covenant_scripts();
        let params = params();
        let mut allocator = funded_allocator(&keys);
        let mut ctx = BuildContext::new(&mut allocator, &keys, &scripts, &params);

        let (bridge, batch) = settled_withdrawals(&mut ctx, &keys);

        let mut reordered = batch.clone();
        reordered.requests.swap(0, 1);
        assert_eq!(
            expand(&mut ctx, &bridge, &reordered).unwrap_err(),
            ExpansionError::SumTreeMismatch
        );

        let mut resummed = batch.clone();
        resummed.requests.swap(0, 1);
        resummed.intermediate_sums = SumTree::build(&resummed.requests).unwrap();
        assert_eq!(
            expand(&mut ctx, &bridge, &resummed).unwrap_err(),
            ExpansionError::ExpanderRootMismatch
        );
    }
}
