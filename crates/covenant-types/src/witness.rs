//! Witness plans: the stack layout a covenant input is unlocked with.
//!
//! Every covenant input pushes its role first, then the records its script consumes, then the
//! script itself and its control block. Records know how to flatten themselves into stack items
//! through [`WitnessItems`], so call sites only list what goes on the stack.

use bitcoin::{consensus::encode::serialize, consensus::encode::VarInt, Witness};
use catbridge_crypto::SighashGrindArtifact;
use catbridge_merkle::MerkleProof;
use catbridge_primitives::encoding::{script_bool, script_num};
use serde::{Deserialize, Serialize};

use crate::{
    aggregator::{AggregatorTx, OwnershipProofTx},
    bridge::{BridgeState, BridgeTx, SlotUpdate},
    data::{AccountData, AggregationData, BatchRequest, DepositData, WithdrawalData},
    errors::CovenantError,
    expander::ExpanderTx,
    scripts::{CovenantKind, CovenantScript},
    template::{CovenantTemplate, FeeInput, OutputTemplate},
};

/// Which branch of its script a covenant input executes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum InputRole {
    /// Aggregator merging two leaf transactions.
    LeafMerge = 0,
    /// Aggregator merging two merge transactions.
    NodeMerge = 1,
    /// Aggregator root consumed next to the bridge.
    Finalize = 2,
    /// Bridge applying a batch.
    Settlement = 3,
    /// Expander splitting into two covenant outputs.
    Split = 4,
    /// Expander paying a withdrawer.
    Payout = 5,
}

/// Something that is pushed onto a witness stack as one or more items.
pub trait WitnessItems {
    fn append_to(&self, items: &mut Vec<Vec<u8>>);
}

#[derive(Clone, Debug)]
pub struct WitnessPlan {
    kind: CovenantKind,
    role: InputRole,
    items: Vec<Vec<u8>>,
}

impl WitnessPlan {
    pub fn new(kind: CovenantKind, role: InputRole) -> Self {
        Self {
            kind,
            role,
            items: vec![script_num(role as i64)],
        }
    }

    pub fn push(mut self, item: impl Into<Vec<u8>>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn number(self, value: i64) -> Self {
        self.push(script_num(value))
    }

    pub fn flag(self, value: bool) -> Self {
        self.push(script_bool(value))
    }

    pub fn with(mut self, record: &impl WitnessItems) -> Self {
        record.append_to(&mut self.items);
        self
    }

    pub fn with_all<'a, T: WitnessItems + 'a>(
        mut self,
        records: impl IntoIterator<Item = &'a T>,
    ) -> Self {
        for record in records {
            record.append_to(&mut self.items);
        }
        self
    }

    pub fn kind(&self) -> CovenantKind {
        self.kind
    }

    pub fn role(&self) -> InputRole {
        self.role
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    /// Appends the script and control block, producing the final witness.
    pub fn into_witness(self, script: &CovenantScript) -> Result<Witness, CovenantError> {
        if script.kind() != self.kind {
            return Err(CovenantError::ScriptMismatch);
        }

        let mut witness = Witness::new();
        for item in &self.items {
            witness.push(item);
        }
        witness.push(script.script().as_bytes());
        witness.push(script.control_block().serialize());
        Ok(witness)
    }
}

impl WitnessItems for SighashGrindArtifact {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        let p = &self.preimage;
        items.push(p.version.to_vec());
        items.push(p.lock_time.to_vec());
        items.push(p.hash_prevouts.as_slice().to_vec());
        items.push(p.hash_spent_amounts.as_slice().to_vec());
        items.push(p.hash_spent_scripts.as_slice().to_vec());
        items.push(p.hash_sequences.as_slice().to_vec());
        items.push(p.hash_outputs.as_slice().to_vec());
        items.push(vec![p.spend_type]);
        items.push(p.input_index.to_vec());
        items.push(p.leaf_hash.as_slice().to_vec());
        items.push(vec![p.key_version]);
        items.push(p.codesep_position.to_vec());
        items.push(self.challenge_minus_last_byte.to_vec());
        items.push(script_num(self.challenge_last_byte as i64));
    }
}

impl WitnessItems for OutputTemplate {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        items.push(self.amount.to_le_bytes().to_vec());
        items.push(self.script.to_bytes());
    }
}

impl WitnessItems for FeeInput {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        items.push(self.txid.as_slice().to_vec());
        items.push(self.vout.to_le_bytes().to_vec());
        items.push(self.amount.to_le_bytes().to_vec());
        items.push(self.script.to_bytes());
    }
}

/// Version, inputs (count-prefixed, as one item), every output, locktime.
fn append_template(template: &impl CovenantTemplate, items: &mut Vec<Vec<u8>>) {
    let frame = template.frame();
    items.push(frame.version.to_le_bytes().to_vec());

    let mut inputs = serialize(&VarInt(frame.inputs.len() as u64));
    for input in &frame.inputs {
        inputs.extend(input.encode());
    }
    items.push(inputs);

    for output in template.outputs() {
        output.append_to(items);
    }
    items.push(frame.lock_time.to_le_bytes().to_vec());
}

impl WitnessItems for AggregatorTx {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        append_template(self, items);
    }
}

impl WitnessItems for OwnershipProofTx {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        append_template(self, items);
    }
}

impl WitnessItems for ExpanderTx {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        append_template(self, items);
    }
}

impl WitnessItems for BridgeTx {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        // The state output is rebuilt from the state fields rather than pushed as a hash.
        self.state.append_to(items);
        append_template(self, items);
    }
}

impl WitnessItems for BridgeState {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        items.push(self.accounts_root.as_slice().to_vec());
        items.push(self.deposit_aggregator_spk.to_bytes());
        items.push(self.withdrawal_aggregator_spk.to_bytes());
        items.push(self.expander_root.as_slice().to_vec());
    }
}

fn append_request(request: &impl BatchRequest, items: &mut Vec<Vec<u8>>) {
    items.push(request.address().as_slice().to_vec());
    items.push(request.amount().to_le_bytes().to_vec());
}

impl WitnessItems for DepositData {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        append_request(self, items);
    }
}

impl WitnessItems for WithdrawalData {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        append_request(self, items);
    }
}

impl WitnessItems for AggregationData {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        items.push(self.prev_hash_0.as_slice().to_vec());
        items.push(self.prev_hash_1.as_slice().to_vec());
        items.push(self.sum_amount.to_le_bytes().to_vec());
    }
}

impl WitnessItems for AccountData {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        items.push(self.address.as_slice().to_vec());
        items.push(self.balance.to_le_bytes().to_vec());
    }
}

impl WitnessItems for MerkleProof {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        for node in self.nodes() {
            items.push(node.sibling.as_slice().to_vec());
            items.push(script_num(node.side.as_byte() as i64));
        }
    }
}

impl<R: BatchRequest + WitnessItems> WitnessItems for SlotUpdate<R> {
    fn append_to(&self, items: &mut Vec<Vec<u8>>) {
        self.request.append_to(items);
        self.batch_proof.append_to(items);
        items.push(script_num(self.slot as i64));
        self.account.append_to(items);
        self.account_proof.append_to(items);
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{opcodes::OP_TRUE, script::Builder, ScriptBuf};
    use catbridge_merkle::MerkleTree;
    use catbridge_primitives::{Buf20, Buf32};

    use super::*;

    fn script(kind: CovenantKind) -> CovenantScript {
        CovenantScript::new(kind, Builder::new().push_opcode(OP_TRUE).into_script()).unwrap()
    }

    #[test]
    fn test_plan_starts_with_role_and_ends_with_script() {
        let fee = FeeInput {
            txid: Buf32::new([1; 32]),
            vout: 2,
            amount: 5_000,
            script: ScriptBuf::from_bytes(vec![0x51]),
        };
        let cov = script(CovenantKind::WithdrawalExpander);
        let witness = WitnessPlan::new(CovenantKind::WithdrawalExpander, InputRole::Payout)
            .number(1)
            .flag(false)
            .with(&fee)
            .into_witness(&cov)
            .unwrap();

        // role, number, flag, 4 fee items, script, control block
        assert_eq!(witness.len(), 9);
        assert_eq!(&witness[0], &[5u8][..]);
        assert_eq!(&witness[1], &[1u8][..]);
        assert!(witness[2].is_empty());
        assert_eq!(&witness[4], &2u32.to_le_bytes()[..]);
        assert_eq!(&witness[7], cov.script().as_bytes());
        assert_eq!(witness[8].to_vec(), cov.control_block().serialize());
    }

    #[test]
    fn test_plan_rejects_other_script() {
        let plan = WitnessPlan::new(CovenantKind::Bridge, InputRole::Settlement);
        assert_eq!(
            plan.into_witness(&script(CovenantKind::DepositAggregator))
                .unwrap_err(),
            CovenantError::ScriptMismatch
        );
    }

    #[test]
    fn test_proof_items() {
        let leaves: Vec<_> = (0..4).map(|i| Buf32::new([i; 32])).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        let plan = WitnessPlan::new(CovenantKind::Bridge, InputRole::Settlement)
            .with(&tree.proof(1).unwrap());

        // role + 2 items per proof level
        assert_eq!(plan.items().len(), 1 + 2 * 4);
        assert_eq!(plan.items()[1], leaves[0].as_slice().to_vec());
        assert_eq!(plan.items()[2], vec![1]);
        assert!(plan.items()[8].is_empty());
    }

    #[test]
    fn test_requests_push_address_and_amount() {
        let deposits = [
            DepositData::new(Buf20::new([1; 20]), 1).unwrap(),
            DepositData::new(Buf20::new([2; 20]), 2).unwrap(),
        ];
        let plan = WitnessPlan::new(CovenantKind::DepositAggregator, InputRole::LeafMerge)
            .with_all(&deposits);
        assert_eq!(plan.items().len(), 5);
        assert_eq!(plan.items()[3], vec![2; 20]);
        assert_eq!(plan.role(), InputRole::LeafMerge);
        assert_eq!(plan.kind(), CovenantKind::DepositAggregator);
    }
}
