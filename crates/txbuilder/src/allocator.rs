//! The operator's chain of change outputs.

use std::mem;

use bitcoin::{ScriptBuf, Transaction};
use catbridge_covenant_types::FeeInput;
use tracing::*;

use crate::errors::BuildError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum FundingState {
    Empty,
    Ready(FeeInput),
    InFlight,
}

/// Hands out the operator's current change output one transaction at a time.
///
/// Each transaction takes the current fee input and, once built, commits its last output as the
/// next one. Two transactions can never spend the same change output.
#[derive(Clone, Debug)]
pub struct FeeUtxoAllocator {
    fee_script: ScriptBuf,
    state: FundingState,
}

impl FeeUtxoAllocator {
    /// An allocator with nothing to spend yet.
    pub fn new(fee_script: ScriptBuf) -> Self {
        Self {
            fee_script,
            state: FundingState::Empty,
        }
    }

    pub fn seeded(fee: FeeInput) -> Self {
        Self {
            fee_script: fee.script.clone(),
            state: FundingState::Ready(fee),
        }
    }

    pub fn fee_script(&self) -> &ScriptBuf {
        &self.fee_script
    }

    /// The change output the next transaction will spend.
    pub fn current(&self) -> Option<&FeeInput> {
        match &self.state {
            FundingState::Ready(fee) => Some(fee),
            _ => None,
        }
    }

    pub fn balance(&self) -> u64 {
        self.current().map_or(0, |fee| fee.amount)
    }

    pub fn take(&mut self) -> Result<FeeInput, BuildError> {
        match mem::replace(&mut self.state, FundingState::InFlight) {
            FundingState::Ready(fee) => Ok(fee),
            FundingState::InFlight => Err(BuildError::FundingInFlight),
            FundingState::Empty => {
                self.state = FundingState::Empty;
                Err(BuildError::MissingFunding)
            }
        }
    }

    /// Returns a taken fee input whose transaction was abandoned.
    pub fn release(&mut self, fee: FeeInput) {
        self.state = FundingState::Ready(fee);
    }

    /// Records the last output of `tx` as the next fee input.
    pub fn commit(&mut self, tx: &Transaction) -> Result<(), BuildError> {
        let vout = tx
            .output
            .len()
            .checked_sub(1)
            .ok_or(BuildError::UnexpectedChangeScript)?;
        let change = &tx.output[vout];
        if change.script_pubkey != self.fee_script {
            return Err(BuildError::UnexpectedChangeScript);
        }

        let fee = FeeInput {
            txid: tx.compute_txid().into(),
            vout: vout as u32,
            amount: change.value.to_sat(),
            script: change.script_pubkey.clone(),
        };
        trace!(txid = %tx.compute_txid(), vout, amount = fee.amount, "fee utxo committed");
        self.state = FundingState::Ready(fee);
        Ok(())
    }
}
