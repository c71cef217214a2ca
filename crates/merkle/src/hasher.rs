use catbridge_primitives::Buf32;
use digest::{generic_array::GenericArray, Digest};
use sha2::Sha256;

/// Hashes a pair of child nodes into their parent.
pub trait MerkleHasher {
    fn hash_node(left: &Buf32, right: &Buf32) -> Buf32;
}

impl<D: Digest> MerkleHasher for D {
    fn hash_node(left: &Buf32, right: &Buf32) -> Buf32 {
        let mut context = D::new();
        context.update(left.as_slice());
        context.update(right.as_slice());
        let result: GenericArray<u8, D::OutputSize> = context.finalize();
        let bytes: [u8; 32] = result
            .as_slice()
            .try_into()
            .expect("merkle: digest output not 32 bytes");
        Buf32::new(bytes)
    }
}

/// `sha256(left || right)`, the node hash every tree in the protocol uses.
pub fn hash_node(left: &Buf32, right: &Buf32) -> Buf32 {
    <Sha256 as MerkleHasher>::hash_node(left, right)
}
