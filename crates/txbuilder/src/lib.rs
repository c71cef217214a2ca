//! Construction of covenant transactions.
//!
//! Every transaction the bridge produces is paid for by the operator: it spends the operator's
//! current change output as its fee input and returns exactly one new change output as its last
//! output. [`FeeUtxoAllocator`] owns that chain of change outputs, [`CovenantTxDraft`] collects
//! inputs and outputs, and [`BuildContext::seal`] grinds the covenant inputs and signs the rest.

pub mod allocator;
pub mod draft;
pub mod errors;
pub mod funding;
pub mod utxo;

pub use allocator::FeeUtxoAllocator;
pub use draft::{BuildContext, CovenantTxDraft, SealedTx};
pub use errors::BuildError;
pub use funding::fund_operator;
pub use utxo::{SpendableUtxo, StaticUtxoSource, UtxoSource};
