//! Templates for aggregator covenant transactions and withdrawal ownership proofs.

use bitcoin::Transaction;
use catbridge_primitives::Buf32;
use serde::{Deserialize, Serialize};

use crate::{
    errors::CovenantError,
    scripts::{parse_state_output, state_script},
    template::{CovenantTemplate, OutputTemplate, TxFrame},
};

/// A deposit or withdrawal aggregator transaction: `[covenant, state, change]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorTx {
    pub frame: TxFrame,
    pub contract: OutputTemplate,
    pub state_hash: Buf32,
    pub change: OutputTemplate,
}

impl AggregatorTx {
    pub fn from_tx(tx: &Transaction) -> Result<Self, CovenantError> {
        let [contract, state, change] = tx.output.as_slice() else {
            return Err(CovenantError::MalformedTemplate("aggregator tx needs 3 outputs"));
        };
        Ok(Self {
            frame: TxFrame::from_tx(tx)?,
            contract: contract.into(),
            state_hash: parse_state_output(state)?,
            change: change.into(),
        })
    }
}

impl CovenantTemplate for AggregatorTx {
    fn frame(&self) -> &TxFrame {
        &self.frame
    }

    fn outputs(&self) -> Vec<OutputTemplate> {
        vec![
            self.contract.clone(),
            OutputTemplate::new(0, state_script(&self.state_hash)),
            self.change.clone(),
        ]
    }

    fn state_hash(&self) -> Buf32 {
        self.state_hash
    }
}

/// A transaction proving control of a withdrawal address: `[payout, change]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipProofTx {
    pub frame: TxFrame,
    pub payout: OutputTemplate,
    pub change: OutputTemplate,
}

impl OwnershipProofTx {
    pub fn from_tx(tx: &Transaction) -> Result<Self, CovenantError> {
        let [payout, change] = tx.output.as_slice() else {
            return Err(CovenantError::MalformedTemplate("ownership proof needs 2 outputs"));
        };
        Ok(Self {
            frame: TxFrame::from_tx(tx)?,
            payout: payout.into(),
            change: change.into(),
        })
    }
}

impl CovenantTemplate for OwnershipProofTx {
    fn frame(&self) -> &TxFrame {
        &self.frame
    }

    fn outputs(&self) -> Vec<OutputTemplate> {
        vec![self.payout.clone(), self.change.clone()]
    }

    /// Ownership proofs carry no state.
    fn state_hash(&self) -> Buf32 {
        Buf32::zero()
    }
}
