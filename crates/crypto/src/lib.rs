//! Signature-hash and grinding engine.
//!
//! Covenant scripts cannot ask the interpreter for the hash of the transaction spending them.
//! Instead the witness carries the taproot sighash preimage split into its fields, and the
//! script proves the reassembled preimage is the real one by checking a Schnorr signature under
//! the generator key. With secret key 1 and nonce 1 that signature is `Gx || e + 1`, where `e`
//! is the BIP-340 challenge, so the script can build it from the challenge alone. The locktime is
//! ground until the last challenge byte can be incremented without a carry.

pub mod errors;
pub mod grind;
pub mod keys;
pub mod schnorr;
pub mod sighash;

pub use errors::CryptoError;
pub use grind::{grind_and_sign, grind_and_sign_inputs, try_sign, SighashGrindArtifact};
pub use keys::{EvenSecretKey, OperatorKeys};
pub use schnorr::{verify_covenant_signature, Challenge, CovenantKey};
pub use sighash::{compute_sighash, SighashPreimage};
