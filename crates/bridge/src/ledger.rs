//! The operator's copy of the account ledger.

use catbridge_covenant_types::{AccountData, BatchDirection, BatchRequest, SlotUpdate};
use catbridge_merkle::{MerkleError, MerkleTree};
use catbridge_primitives::{constants::LEDGER_SIZE, Buf20, Buf32};
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Fixed-size ledger of accounts and the Merkle tree over their digests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    accounts: Vec<AccountData>,
    tree: MerkleTree,
}

impl AccountLedger {
    /// A ledger of [`LEDGER_SIZE`] empty accounts.
    pub fn new() -> Result<Self, MerkleError> {
        let accounts = vec![AccountData::default(); LEDGER_SIZE];
        let leaves: Vec<Buf32> = accounts.iter().map(AccountData::hash).collect();
        Ok(Self {
            tree: MerkleTree::build(&leaves)?,
            accounts,
        })
    }

    pub fn root(&self) -> Buf32 {
        self.tree.root()
    }

    pub fn accounts(&self) -> &[AccountData] {
        &self.accounts
    }

    pub fn account(&self, slot: usize) -> Option<&AccountData> {
        self.accounts.get(slot)
    }

    pub fn slot_of(&self, address: &Buf20) -> Option<usize> {
        self.accounts
            .iter()
            .position(|account| !account.is_empty() && &account.address == address)
    }

    /// The slot a deposit to `address` credits: its existing account, else the first empty one.
    pub fn slot_for_deposit(&self, address: &Buf20) -> Result<usize, BridgeError> {
        self.slot_of(address)
            .or_else(|| self.accounts.iter().position(AccountData::is_empty))
            .ok_or(BridgeError::LedgerFull)
    }

    fn set(&mut self, slot: usize, account: AccountData) -> Result<(), MerkleError> {
        self.tree.update_leaf(slot, account.hash())?;
        self.accounts[slot] = account;
        Ok(())
    }

    /// Plans a batch against this ledger.
    ///
    /// Returns one update per request, in batch order, each proven against the ledger as left by
    /// the updates before it, together with the ledger after the whole batch.
    pub fn prepare_updates<R: BatchRequest>(
        &self,
        requests: &[R],
        batch_tree: &MerkleTree,
        direction: BatchDirection,
    ) -> Result<(Vec<SlotUpdate<R>>, AccountLedger), BridgeError> {
        let mut working = self.clone();
        let mut updates = Vec::with_capacity(requests.len());

        for (position, request) in requests.iter().enumerate() {
            let address = request.address();
            let slot = match direction {
                BatchDirection::Deposit => working.slot_for_deposit(&address)?,
                BatchDirection::Withdrawal => working
                    .slot_of(&address)
                    .ok_or(BridgeError::AccountNotFound(address))?,
            };

            let account = working.accounts[slot];
            if direction == BatchDirection::Withdrawal && account.balance < request.amount() {
                return Err(BridgeError::InsufficientBalance {
                    slot,
                    balance: account.balance,
                    amount: request.amount(),
                });
            }

            let update = SlotUpdate {
                request: *request,
                batch_proof: batch_tree.proof(position)?,
                slot,
                account,
                account_proof: working.tree.proof(slot)?,
            };
            working.set(slot, update.updated_account(direction)?)?;
            updates.push(update);
        }

        Ok((updates, working))
    }
}
