//! Command handlers.

use std::{fs, path::Path};

use bitcoin::Transaction;
use catbridge_config::Config;
use catbridge_covenant_types::{CovenantScripts, DepositData, WithdrawalData};
use catbridge_crypto::OperatorKeys;
use catbridge_primitives::serde_helpers::consensus_hex;
use catbridge_txbuilder::{
    fund_operator, BuildContext, FeeUtxoAllocator, SpendableUtxo, StaticUtxoSource,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::*;

use crate::{
    args::{AggregateDepositsArgs, AggregateWithdrawalsArgs},
    errors::CliError,
};

/// The result record handed to a broadcaster: the funding transaction next to the batch.
#[derive(Serialize)]
struct BatchOutput<T> {
    #[serde(with = "consensus_hex")]
    funding_tx: Transaction,
    #[serde(flatten)]
    batch: T,
}

/// The operator, funded and ready to build.
struct Operator {
    keys: OperatorKeys,
    scripts: CovenantScripts,
    funding_tx: Transaction,
    allocator: FeeUtxoAllocator,
}

impl Operator {
    fn fund(config: &Config) -> Result<Self, CliError> {
        let keys = config.operator_keys().map_err(CliError::OperatorSetup)?;
        let scripts = config
            .covenant_scripts()
            .map_err(CliError::OperatorSetup)?;

        let utxos: Vec<SpendableUtxo> = read_json(&config.funding.utxos_file)?;
        let (funding_tx, allocator) =
            fund_operator(&StaticUtxoSource::new(utxos), &keys, &config.protocol)
                .map_err(CliError::Funding)?;
        info!(txid = %funding_tx.compute_txid(), "operator funded");

        Ok(Self {
            keys,
            scripts,
            funding_tx,
            allocator,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::MalformedJson {
        path: path.to_owned(),
        source,
    })
}

fn write_output<T: Serialize>(out: Option<&Path>, output: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(output).map_err(CliError::EncodeResult)?;
    match out {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::WriteFile {
                path: path.to_owned(),
                source,
            })?;
            info!(path = %path.display(), "wrote result");
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub(crate) fn aggregate_deposits(
    AggregateDepositsArgs { file, out }: AggregateDepositsArgs,
    config: &Config,
) -> Result<(), CliError> {
    let deposits: Vec<DepositData> = read_json(&file)?;
    let mut operator = Operator::fund(config)?;

    let mut ctx = BuildContext::new(
        &mut operator.allocator,
        &operator.keys,
        &operator.scripts,
        &config.protocol,
    );
    let batch = catbridge_aggregation::aggregate_deposits(&mut ctx, &deposits)?;

    write_output(
        out.as_deref(),
        &BatchOutput {
            funding_tx: operator.funding_tx,
            batch,
        },
    )
}

pub(crate) fn aggregate_withdrawals(
    AggregateWithdrawalsArgs { file, out }: AggregateWithdrawalsArgs,
    config: &Config,
) -> Result<(), CliError> {
    let withdrawals: Vec<WithdrawalData> = read_json(&file)?;
    let mut operator = Operator::fund(config)?;

    let mut ctx = BuildContext::new(
        &mut operator.allocator,
        &operator.keys,
        &operator.scripts,
        &config.protocol,
    );
    let batch = catbridge_aggregation::aggregate_withdrawals(&mut ctx, &withdrawals)?;

    write_output(
        out.as_deref(),
        &BatchOutput {
            funding_tx: operator.funding_tx,
            batch,
        },
    )
}
