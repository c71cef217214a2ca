use bitcoin::Transaction;
use catbridge_primitives::Buf32;
use serde::{Deserialize, Serialize};

use crate::{
    errors::CovenantError,
    scripts::{parse_state_output, state_script},
    template::{CovenantTemplate, OutputTemplate, TxFrame},
};

/// Withdrawal expander split: `[branch 0, branch 1, state, change]`.
///
/// The state commits `H(child_0 || child_1)`, the hashes of the two subtrees the branches carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpanderTx {
    pub frame: TxFrame,
    pub branches: [OutputTemplate; 2],
    pub state_hash: Buf32,
    pub change: OutputTemplate,
}

impl ExpanderTx {
    pub fn from_tx(tx: &Transaction) -> Result<Self, CovenantError> {
        let [branch_0, branch_1, state, change] = tx.output.as_slice() else {
            return Err(CovenantError::MalformedTemplate("expander tx needs 4 outputs"));
        };
        Ok(Self {
            frame: TxFrame::from_tx(tx)?,
            branches: [branch_0.into(), branch_1.into()],
            state_hash: parse_state_output(state)?,
            change: change.into(),
        })
    }

    pub fn branch(&self, branch: usize) -> Result<&OutputTemplate, CovenantError> {
        self.branches
            .get(branch)
            .ok_or(CovenantError::MalformedTemplate("branch out of range"))
    }
}

impl CovenantTemplate for ExpanderTx {
    fn frame(&self) -> &TxFrame {
        &self.frame
    }

    fn outputs(&self) -> Vec<OutputTemplate> {
        vec![
            self.branches[0].clone(),
            self.branches[1].clone(),
            OutputTemplate::new(0, state_script(&self.state_hash)),
            self.change.clone(),
        ]
    }

    fn state_hash(&self) -> Buf32 {
        self.state_hash
    }
}
