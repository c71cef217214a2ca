use std::path::PathBuf;

use argh::FromArgs;

/// Builds covenant transaction trees for the bridge operator.
#[derive(FromArgs, PartialEq, Debug)]
pub(crate) struct TopLevel {
    /// path to the operator config file
    #[argh(option, short = 'c')]
    pub(crate) config: PathBuf,

    #[argh(subcommand)]
    pub(crate) cmd: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum Commands {
    AggregateDeposits(AggregateDepositsArgs),
    AggregateWithdrawals(AggregateWithdrawalsArgs),
}

/// Aggregates a batch of deposits into one deposit aggregator output
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "aggregate-deposits")]
pub(crate) struct AggregateDepositsArgs {
    /// JSON file holding an array of `{address, amount}` deposits
    #[argh(positional)]
    pub(crate) file: PathBuf,

    /// where to write the result; defaults to stdout
    #[argh(option, short = 'o')]
    pub(crate) out: Option<PathBuf>,
}

/// Aggregates a batch of withdrawals into one withdrawal aggregator output
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "aggregate-withdrawals")]
pub(crate) struct AggregateWithdrawalsArgs {
    /// JSON file holding an array of `{address, amount}` withdrawals
    #[argh(positional)]
    pub(crate) file: PathBuf,

    /// where to write the result; defaults to stdout
    #[argh(option, short = 'o')]
    pub(crate) out: Option<PathBuf>,
}
