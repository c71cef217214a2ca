//! Primitive types shared by the covenant bridge crates.
//!
//! This holds the fixed-width buffers every commitment is expressed in, the hashing helpers the
//! covenant scripts mirror, the protocol constants and the byte encodings amounts and numbers take
//! when they are pushed onto a witness stack.

mod macros;

pub mod buf;
pub mod constants;
pub mod encoding;
pub mod errors;
pub mod hash;
pub mod params;
pub mod serde_helpers;

pub use buf::{Buf20, Buf32, Buf64};
pub use errors::AmountOverflow;
pub use params::ProtocolParams;
