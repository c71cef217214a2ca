//! Operator key handling.
//!
//! The operator funds and signs every non-covenant input: fee inputs are taproot key-path
//! outputs of its x-only key, and ownership proofs pay its compressed key's P2WPKH address.

use std::ops::Deref;

use bitcoin::{
    ecdsa,
    hashes::{hash160, Hash},
    sighash::{Prevouts, SighashCache},
    taproot::{self, TapTweakHash},
    Amount, EcdsaSighashType, ScriptBuf, TapSighashType, Transaction, TxOut, WPubkeyHash, Witness,
};
use catbridge_primitives::Buf20;
use secp256k1::{Keypair, Message, Parity, PublicKey, SecretKey, XOnlyPublicKey, SECP256K1};
use zeroize::Zeroizing;

use crate::errors::CryptoError;

/// Secret key whose x-only public key has even parity, negated on construction when needed.
#[derive(Debug, Clone, Copy)]
pub struct EvenSecretKey(SecretKey);

impl Deref for EvenSecretKey {
    type Target = SecretKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<SecretKey> for EvenSecretKey {
    fn from(value: SecretKey) -> Self {
        match value.x_only_public_key(SECP256K1).1 == Parity::Odd {
            true => Self(value.negate()),
            false => Self(value),
        }
    }
}

impl From<EvenSecretKey> for SecretKey {
    fn from(value: EvenSecretKey) -> Self {
        value.0
    }
}

/// The operator keypair used for fee inputs and ownership proofs.
#[derive(Debug, Clone)]
pub struct OperatorKeys {
    keypair: Keypair,
}

impl OperatorKeys {
    pub fn new(secret: EvenSecretKey) -> Self {
        Self {
            keypair: Keypair::from_secret_key(SECP256K1, &secret),
        }
    }

    /// Parses a 32-byte hex-encoded secret key.
    pub fn from_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode(secret_hex.trim()).map_err(|_| CryptoError::InvalidSecretKey)?,
        );
        let sk = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self::new(sk.into()))
    }

    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// HASH160 of the compressed public key, the operator's payout address.
    pub fn address_hash(&self) -> Buf20 {
        hash160::Hash::hash(&self.public_key().serialize()).into()
    }

    /// Key-path-only P2TR script holding the operator's fee balance.
    pub fn fee_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2tr(SECP256K1, self.x_only_public_key(), None)
    }

    /// P2WPKH script paying the operator's address.
    pub fn payout_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&WPubkeyHash::from(self.address_hash()))
    }

    /// Signs a key-path spend of [`Self::fee_script`] at `input_index`.
    pub fn sign_key_spend(
        &self,
        tx: &Transaction,
        prevouts: &[TxOut],
        input_index: usize,
    ) -> Result<Witness, CryptoError> {
        // Apply BIP341 taproot tweak
        let tweak = TapTweakHash::from_key_and_tweak(self.x_only_public_key(), None);
        let tweaked = self.keypair.add_xonly_tweak(SECP256K1, &tweak.to_scalar())?;

        let mut cache = SighashCache::new(tx);
        let sighash = cache
            .taproot_key_spend_signature_hash(
                input_index,
                &Prevouts::All(prevouts),
                TapSighashType::Default,
            )
            .map_err(|e| CryptoError::Sighash(e.to_string()))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = SECP256K1.sign_schnorr_no_aux_rand(&msg, &tweaked);
        Ok(Witness::p2tr_key_spend(&taproot::Signature {
            signature,
            sighash_type: TapSighashType::Default,
        }))
    }

    /// Signs a spend of [`Self::payout_script`] at `input_index`.
    pub fn sign_p2wpkh(
        &self,
        tx: &Transaction,
        input_index: usize,
        value: Amount,
    ) -> Result<Witness, CryptoError> {
        let mut cache = SighashCache::new(tx);
        let sighash = cache
            .p2wpkh_signature_hash(
                input_index,
                &self.payout_script(),
                value,
                EcdsaSighashType::All,
            )
            .map_err(|e| CryptoError::Sighash(e.to_string()))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = SECP256K1.sign_ecdsa(&msg, &self.keypair.secret_key());
        Ok(Witness::p2wpkh(
            &ecdsa::Signature {
                signature,
                sighash_type: EcdsaSighashType::All,
            },
            &self.public_key(),
        ))
    }
}
