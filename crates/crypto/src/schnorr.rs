//! The generator-key Schnorr scheme covenant scripts verify.

use catbridge_primitives::{
    constants::{GENERATOR_X, RESERVED_CHALLENGE_BYTES},
    hash::{tagged_hash, BIP340_CHALLENGE_TAG},
    Buf32, Buf64,
};
use k256::{elliptic_curve::ops::Reduce, FieldBytes, Scalar, U256};
use secp256k1::{schnorr::Signature, Message, XOnlyPublicKey, SECP256K1};

/// BIP-340 challenge `e = H_tag(R.x || P.x || m) mod n`, big-endian.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Challenge(Buf32);

impl Challenge {
    fn scalar(&self) -> Scalar {
        <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(self.0.as_slice()))
    }

    pub fn as_buf(&self) -> &Buf32 {
        &self.0
    }

    pub fn last_byte(&self) -> u8 {
        self.0 .0[31]
    }

    pub fn without_last_byte(&self) -> [u8; 31] {
        let mut out = [0u8; 31];
        out.copy_from_slice(&self.0 .0[..31]);
        out
    }

    /// Whether the script cannot increment the last byte in place.
    pub fn is_reserved(&self) -> bool {
        RESERVED_CHALLENGE_BYTES.contains(&self.last_byte())
    }
}

/// The fixed key covenant signatures are made with: secret key 1, nonce 1.
///
/// Both the public key and the nonce point are the generator, so the challenge is derived from
/// `Gx || Gx || sighash` and the signature is `Gx || e + 1`.
#[derive(Copy, Clone, Debug)]
pub struct CovenantKey {
    secret: Scalar,
    nonce: Scalar,
}

impl CovenantKey {
    pub fn generator() -> Self {
        Self {
            secret: Scalar::ONE,
            nonce: Scalar::ONE,
        }
    }

    pub fn x_only_public_key(&self) -> Buf32 {
        Buf32::new(GENERATOR_X)
    }

    pub fn derive_challenge(&self, sighash: &Buf32) -> Challenge {
        let hash = tagged_hash(
            BIP340_CHALLENGE_TAG,
            &[&GENERATOR_X, &GENERATOR_X, sighash.as_slice()],
        );
        let e = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(hash.as_slice()));
        Challenge(Buf32::new(e.to_bytes().into()))
    }

    /// `s = k + e * x`, serialized after the nonce point's x coordinate.
    pub fn sign(&self, challenge: &Challenge) -> Buf64 {
        let s = self.nonce + challenge.scalar() * self.secret;
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&GENERATOR_X);
        sig[32..].copy_from_slice(&s.to_bytes());
        Buf64::new(sig)
    }
}

/// The signature a script assembles from the two challenge parts.
pub fn assemble_covenant_signature(challenge_minus_last_byte: &[u8; 31], last_byte: u8) -> Buf64 {
    let mut sig = [0u8; 64];
    sig[..32].copy_from_slice(&GENERATOR_X);
    sig[32..63].copy_from_slice(challenge_minus_last_byte);
    sig[63] = last_byte.wrapping_add(1);
    Buf64::new(sig)
}

/// Checks `sig` as a BIP-340 signature of `sighash` under the generator key.
pub fn verify_covenant_signature(sig: &Buf64, sighash: &Buf32) -> bool {
    let Ok(sig) = Signature::from_slice(sig.as_slice()) else {
        return false;
    };
    let Ok(pk) = XOnlyPublicKey::from_slice(&GENERATOR_X) else {
        return false;
    };
    SECP256K1
        .verify_schnorr(&sig, &Message::from_digest(sighash.0), &pk)
        .is_ok()
}
