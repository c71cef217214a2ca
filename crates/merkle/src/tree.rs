use catbridge_primitives::{
    constants::{LEDGER_SIZE, MERKLE_PROOF_DEPTH},
    Buf32,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::MerkleError,
    hasher::hash_node,
    proof::{MerkleProof, NodeSide, ProofNode},
};

/// Merkle tree stored as its full list of levels, leaves first and the root last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    levels: Vec<Vec<Buf32>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`, duplicating the last node of every odd level.
    pub fn build(leaves: &[Buf32]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        if leaves.len() > LEDGER_SIZE {
            return Err(MerkleError::TooManyLeaves(leaves.len()));
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next = level
                .chunks(2)
                .map(|pair| hash_node(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> Buf32 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[Buf32] {
        &self.levels[0]
    }

    pub fn levels(&self) -> &[Vec<Buf32>] {
        &self.levels
    }

    /// Number of hashing levels above the leaves.
    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    fn check_index(&self, index: usize) -> Result<(), MerkleError> {
        let len = self.leaves().len();
        if index >= len {
            return Err(MerkleError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    /// Produces the inclusion proof of the leaf at `index`, padded to the fixed proof depth.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        self.check_index(index)?;

        let mut nodes = [ProofNode::default(); MERKLE_PROOF_DEPTH];
        let mut idx = index;
        for (node, level) in nodes.iter_mut().zip(&self.levels[..self.height()]) {
            let (sibling_idx, side) = if idx % 2 == 0 {
                (idx + 1, NodeSide::Right)
            } else {
                (idx - 1, NodeSide::Left)
            };
            // A missing right sibling is the duplicated node itself.
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            *node = ProofNode::new(sibling, side);
            idx /= 2;
        }

        Ok(MerkleProof::new(nodes))
    }

    /// Replaces one leaf and recomputes the path from it to the root.
    pub fn update_leaf(&mut self, index: usize, digest: Buf32) -> Result<(), MerkleError> {
        self.check_index(index)?;

        self.levels[0][index] = digest;
        let mut idx = index;
        for level in 1..self.levels.len() {
            let below = &self.levels[level - 1];
            let left_idx = idx & !1;
            let left = below[left_idx];
            let right = below.get(left_idx + 1).copied().unwrap_or(left);
            idx /= 2;
            self.levels[level][idx] = hash_node(&left, &right);
        }

        Ok(())
    }
}
