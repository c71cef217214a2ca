use catbridge_covenant_types::CovenantError;
use catbridge_primitives::AmountOverflow;
use catbridge_txbuilder::BuildError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("bridge output has no pending expansion")]
    NothingToExpand,

    #[error("sum tree does not match the withdrawal requests")]
    SumTreeMismatch,

    #[error("expander root differs from the bridge state")]
    ExpanderRootMismatch,

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error("build: {0}")]
    Build(#[from] BuildError),

    #[error("covenant: {0}")]
    Covenant(#[from] CovenantError),
}
