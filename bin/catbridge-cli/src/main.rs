//! Operator CLI: reads request batches and writes the covenant transactions that aggregate them.

mod args;
mod cmd;
mod errors;

use std::process;

use args::{Commands, TopLevel};
use catbridge_common::logging::{self, FileLoggingConfig, LoggerConfig};
use catbridge_config::Config;
use errors::CliError;

const SERVICE_NAME: &str = "catbridge-cli";

fn main() {
    let args: TopLevel = argh::from_env();
    if let Err(e) = run(args) {
        eprintln!("{SERVICE_NAME}: {e}");
        process::exit(e.exit_code());
    }
}

fn run(TopLevel { config, cmd }: TopLevel) -> Result<(), CliError> {
    let config = Config::load(&config).map_err(|source| CliError::LoadConfig {
        path: config.clone(),
        source,
    })?;
    init_logging(&config);

    match cmd {
        Commands::AggregateDeposits(args) => cmd::aggregate_deposits(args, &config),
        Commands::AggregateWithdrawals(args) => cmd::aggregate_withdrawals(args, &config),
    }
}

fn init_logging(config: &Config) {
    let network = config.protocol.network.to_string();
    let service_name = logging::format_service_name(SERVICE_NAME, Some(&network));

    let mut logger_config =
        LoggerConfig::new(service_name).with_json_logging(config.logging.json);
    if let Some(dir) = &config.logging.file_directory {
        logger_config = logger_config.with_file_logging(
            FileLoggingConfig::new(dir.clone(), SERVICE_NAME.to_owned())
                .with_json_format(config.logging.json),
        );
    }
    logging::init(logger_config);
}
