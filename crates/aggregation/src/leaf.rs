//! Leaf transactions and withdrawal ownership proofs.

use bitcoin::{Transaction, TxOut};
use catbridge_covenant_types::{
    scripts::{payout_script, state_output},
    AggregatorTx, BatchRequest, CovenantKind, CovenantTemplate, DepositData, OwnershipProofTx,
    TemplateInput, WithdrawalData, WitnessItems,
};
use catbridge_primitives::Buf32;
use catbridge_txbuilder::{BuildContext, CovenantTxDraft};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::errors::AggregationError;

/// The request behind a leaf, as a merge of two leaves checks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafData {
    Deposit(DepositData),
    Withdrawal {
        request: WithdrawalData,
        ownership_proof: OwnershipProofTx,
    },
}

impl LeafData {
    /// The digest the leaf transaction commits to.
    pub fn leaf_hash(&self) -> Buf32 {
        match self {
            Self::Deposit(deposit) => deposit.leaf_hash(),
            Self::Withdrawal { request, .. } => request.leaf_hash(),
        }
    }
}

impl WitnessItems for LeafData {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        match self {
            Self::Deposit(deposit) => deposit.append_to(items),
            Self::Withdrawal {
                request,
                ownership_proof,
            } => {
                request.append_to(items);
                ownership_proof.append_to(items);
            }
        }
    }
}

/// A leaf transaction: `[aggregator covenant, state, change]`.
#[derive(Clone, Debug)]
pub struct LeafTx {
    pub tx: Transaction,
    pub template: AggregatorTx,
    pub data: LeafData,
}

/// Locks a deposit's amount in the deposit aggregator, committing to the deposit.
pub fn create_deposit_leaf(
    ctx: &mut BuildContext<'_>,
    deposit: &DepositData,
) -> Result<LeafTx, AggregationError> {
    let scripts = ctx.scripts;
    let aggregator = scripts.get(CovenantKind::DepositAggregator);

    let draft = CovenantTxDraft::new()
        .output(aggregator.output(deposit.amount()))
        .output(state_output(&deposit.leaf_hash()));
    let sealed = ctx.seal(draft)?;
    let template = AggregatorTx::from_tx(&sealed.tx)?;
    trace!(txid = %sealed.tx.compute_txid(), amount = deposit.amount(), "deposit leaf");

    Ok(LeafTx {
        tx: sealed.tx,
        template,
        data: LeafData::Deposit(*deposit),
    })
}

/// Pays the withdrawal address, proving whoever funds the leaf controls it.
///
/// Only the operator's own address can be proven here, since the operator signs the leaf's
/// spend of the proof.
pub fn create_ownership_proof(
    ctx: &mut BuildContext<'_>,
    withdrawal: &WithdrawalData,
) -> Result<(Transaction, OwnershipProofTx), AggregationError> {
    if ctx.keys.address_hash() != withdrawal.address() {
        return Err(AggregationError::ForeignWithdrawer(withdrawal.address()));
    }

    let draft = CovenantTxDraft::new().output(TxOut {
        value: ctx.params.ownership_proof_amount(),
        script_pubkey: payout_script(&withdrawal.address()),
    });
    let sealed = ctx.seal(draft)?;
    let template = OwnershipProofTx::from_tx(&sealed.tx)?;
    Ok((sealed.tx, template))
}

/// Spends an ownership proof into the withdrawal aggregator, committing to the withdrawal.
pub fn create_withdrawal_leaf(
    ctx: &mut BuildContext<'_>,
    withdrawal: &WithdrawalData,
    ownership_proof: &OwnershipProofTx,
) -> Result<LeafTx, AggregationError> {
    let scripts = ctx.scripts;
    let aggregator = scripts.get(CovenantKind::WithdrawalAggregator);

    let proof_input = TemplateInput::new(ownership_proof.compute_txid(), 0);
    let draft = CovenantTxDraft::new()
        .payout_input(proof_input.outpoint(), ownership_proof.payout.to_txout())
        .output(aggregator.output(ctx.params.covenant_dust))
        .output(state_output(&withdrawal.leaf_hash()));
    let sealed = ctx.seal(draft)?;
    let template = AggregatorTx::from_tx(&sealed.tx)?;
    trace!(txid = %sealed.tx.compute_txid(), amount = withdrawal.amount(), "withdrawal leaf");

    Ok(LeafTx {
        tx: sealed.tx,
        template,
        data: LeafData::Withdrawal {
            request: *withdrawal,
            ownership_proof: ownership_proof.clone(),
        },
    })
}
