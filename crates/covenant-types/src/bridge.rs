//! Bridge covenant state and the ledger transition it enforces.

use bitcoin::{ScriptBuf, Transaction};
use catbridge_merkle::MerkleProof;
use catbridge_primitives::{
    constants::BATCH_SIZE,
    encoding::{checked_sum, padded_amount, with_compact_size},
    hash::hash_concat,
    Buf32,
};
use serde::{Deserialize, Serialize};

use crate::{
    data::{AccountData, BatchRequest},
    errors::CovenantError,
    scripts::{parse_state_output, state_script},
    template::{CovenantTemplate, OutputTemplate, TxFrame},
};

/// State committed by the bridge covenant's state output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub accounts_root: Buf32,
    pub deposit_aggregator_spk: ScriptBuf,
    pub withdrawal_aggregator_spk: ScriptBuf,
    /// Root of the withdrawal sum tree still being expanded, zero when none is.
    pub expander_root: Buf32,
}

impl BridgeState {
    pub fn new(
        accounts_root: Buf32,
        deposit_aggregator_spk: ScriptBuf,
        withdrawal_aggregator_spk: ScriptBuf,
    ) -> Self {
        Self {
            accounts_root,
            deposit_aggregator_spk,
            withdrawal_aggregator_spk,
            expander_root: Buf32::zero(),
        }
    }

    /// `sha256(accounts_root || len || deposit spk || len || withdrawal spk || expander_root)`.
    pub fn hash(&self) -> Buf32 {
        hash_concat(&[
            self.accounts_root.as_slice(),
            &with_compact_size(self.deposit_aggregator_spk.as_bytes()),
            &with_compact_size(self.withdrawal_aggregator_spk.as_bytes()),
            self.expander_root.as_slice(),
        ])
    }

    pub fn aggregator_spk(&self, direction: BatchDirection) -> &ScriptBuf {
        match direction {
            BatchDirection::Deposit => &self.deposit_aggregator_spk,
            BatchDirection::Withdrawal => &self.withdrawal_aggregator_spk,
        }
    }

    /// The state after settling a batch into the ledger.
    pub fn transition(&self, accounts_root: Buf32, expander_root: Buf32) -> Self {
        Self {
            accounts_root,
            expander_root,
            ..self.clone()
        }
    }
}

/// Bridge transaction: `[bridge, state, expander?, change]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTx {
    pub frame: TxFrame,
    pub bridge: OutputTemplate,
    pub state: BridgeState,
    pub expander: Option<OutputTemplate>,
    pub change: OutputTemplate,
}

impl BridgeTx {
    /// Output index of the expander output, when present.
    pub const EXPANDER_VOUT: u32 = 2;

    pub fn from_tx(tx: &Transaction, state: BridgeState) -> Result<Self, CovenantError> {
        let (bridge, state_out, expander, change) = match tx.output.as_slice() {
            [bridge, state_out, change] => (bridge, state_out, None, change),
            [bridge, state_out, expander, change] => {
                (bridge, state_out, Some(expander.into()), change)
            }
            _ => return Err(CovenantError::MalformedTemplate("bridge tx needs 3 or 4 outputs")),
        };

        if parse_state_output(state_out)? != state.hash() {
            return Err(CovenantError::StateHashMismatch);
        }

        Ok(Self {
            frame: TxFrame::from_tx(tx)?,
            bridge: bridge.into(),
            state,
            expander,
            change: change.into(),
        })
    }
}

impl CovenantTemplate for BridgeTx {
    fn frame(&self) -> &TxFrame {
        &self.frame
    }

    fn outputs(&self) -> Vec<OutputTemplate> {
        let mut outputs = vec![
            self.bridge.clone(),
            OutputTemplate::new(0, state_script(&self.state.hash())),
        ];
        outputs.extend(self.expander.clone());
        outputs.push(self.change.clone());
        outputs
    }

    fn state_hash(&self) -> Buf32 {
        self.state.hash()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchDirection {
    Deposit,
    Withdrawal,
}

/// One request applied to one ledger slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUpdate<R> {
    pub request: R,
    /// Proof of `request` in the batch tree, at the request's position in the batch.
    pub batch_proof: MerkleProof,
    pub slot: usize,
    /// The slot's account before the update.
    pub account: AccountData,
    /// Proof of `account` against the ledger root left by the previous update.
    pub account_proof: MerkleProof,
}

impl<R: BatchRequest> SlotUpdate<R> {
    /// The account after applying the request.
    pub fn updated_account(&self, direction: BatchDirection) -> Result<AccountData, CovenantError> {
        let balance = match direction {
            BatchDirection::Deposit => checked_sum([self.account.balance, self.request.amount()])?,
            BatchDirection::Withdrawal => {
                // Balances are unsigned 8-byte values; a debit below zero has no encoding.
                let balance = self
                    .account
                    .balance
                    .checked_sub(self.request.amount())
                    .ok_or(CovenantError::BalanceUnderflow)?;
                padded_amount(balance)?;
                balance
            }
        };
        Ok(AccountData::new(self.request.address(), balance))
    }
}

/// Applies a batch to the ledger committed by `accounts_root`, returning the new root.
///
/// Updates are applied in batch order; each account proof is checked against the root left by
/// the update before it.
pub fn apply_batch<R: BatchRequest>(
    accounts_root: &Buf32,
    batch_root: &Buf32,
    updates: &[SlotUpdate<R>],
    direction: BatchDirection,
) -> Result<Buf32, CovenantError> {
    if updates.len() != BATCH_SIZE {
        return Err(CovenantError::BatchSize {
            expected: BATCH_SIZE,
            actual: updates.len(),
        });
    }

    let mut root = *accounts_root;
    for (position, update) in updates.iter().enumerate() {
        if update.batch_proof.leaf_index() != position
            || update.batch_proof.verify(&update.request.leaf_hash()) != *batch_root
        {
            return Err(CovenantError::ProofMismatch);
        }

        if update.account_proof.leaf_index() != update.slot
            || update.account_proof.verify(&update.account.hash()) != root
        {
            return Err(CovenantError::AccountMismatch(update.slot));
        }

        let owner_matches = update.account.address == update.request.address();
        let slot_usable = match direction {
            BatchDirection::Deposit => owner_matches || update.account.is_empty(),
            BatchDirection::Withdrawal => owner_matches,
        };
        if !slot_usable {
            return Err(CovenantError::AccountMismatch(update.slot));
        }

        let account = update.updated_account(direction)?;
        root = update.account_proof.verify(&account.hash());
    }

    Ok(root)
}

/// Total amount moved by a batch.
pub fn batch_total<R: BatchRequest>(updates: &[SlotUpdate<R>]) -> Result<u64, CovenantError> {
    Ok(checked_sum(updates.iter().map(|u| u.request.amount()))?)
}
