use catbridge_primitives::{constants::MERKLE_PROOF_DEPTH, Buf32};
use serde::{Deserialize, Serialize};

use crate::hasher::hash_node;

/// Position of the sibling relative to the node being proven.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeSide {
    /// Padding past the height of the tree.
    #[default]
    Invalid = 0,
    /// Sibling is the left child, so it is hashed first.
    Left = 1,
    /// Sibling is the right child.
    Right = 2,
}

impl NodeSide {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub sibling: Buf32,
    pub side: NodeSide,
}

impl ProofNode {
    pub fn new(sibling: Buf32, side: NodeSide) -> Self {
        Self { sibling, side }
    }
}

/// Inclusion proof of fixed depth, bottom level first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    nodes: [ProofNode; MERKLE_PROOF_DEPTH],
}

impl MerkleProof {
    pub fn new(nodes: [ProofNode; MERKLE_PROOF_DEPTH]) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ProofNode; MERKLE_PROOF_DEPTH] {
        &self.nodes
    }

    /// Number of non-padding entries.
    pub fn height(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.side != NodeSide::Invalid)
            .count()
    }

    /// Recomputes the root committed to by this proof for `leaf`.
    pub fn verify(&self, leaf: &Buf32) -> Buf32 {
        self.nodes.iter().fold(*leaf, |acc, node| match node.side {
            NodeSide::Invalid => acc,
            NodeSide::Left => hash_node(&node.sibling, &acc),
            NodeSide::Right => hash_node(&acc, &node.sibling),
        })
    }

    /// Index of the proven leaf, read off the sibling sides.
    pub fn leaf_index(&self) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.side == NodeSide::Left)
            .fold(0, |idx, (level, _)| idx | (1 << level))
    }
}
