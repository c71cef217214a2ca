use std::{
    fs,
    path::{Path, PathBuf},
};

use bitcoin::ScriptBuf;
use catbridge_covenant_types::{CovenantKind, CovenantScript, CovenantScripts};
use catbridge_crypto::OperatorKeys;
use catbridge_primitives::ProtocolParams;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub operator: OperatorConfig,

    #[serde(default)]
    pub protocol: ProtocolParams,

    pub scripts: ScriptsConfig,

    pub funding: FundingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Hex-encoded 32-byte secret key.
    pub secret_key: String,
}

/// Hex-encoded precompiled tapscripts, one per covenant kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    pub deposit_aggregator: String,
    pub withdrawal_aggregator: String,
    pub bridge: String,
    pub withdrawal_expander: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingConfig {
    /// JSON list of `{txid, vout, script_pubkey, amount}` records the operator may spend.
    pub utxos_file: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,

    /// Also write rolling log files here.
    pub file_directory: Option<PathBuf>,
}

impl Config {
    /// Reads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;

        config.operator_keys()?;
        config.covenant_scripts()?;

        debug!(path = %path.display(), network = %config.protocol.network, "loaded config");
        Ok(config)
    }

    pub fn operator_keys(&self) -> Result<OperatorKeys, ConfigError> {
        OperatorKeys::from_hex(&self.operator.secret_key).map_err(|_| ConfigError::InvalidSecretKey)
    }

    pub fn covenant_scripts(&self) -> Result<CovenantScripts, ConfigError> {
        let s = &self.scripts;
        Ok(CovenantScripts {
            deposit_aggregator: covenant_script(
                CovenantKind::DepositAggregator,
                &s.deposit_aggregator,
            )?,
            withdrawal_aggregator: covenant_script(
                CovenantKind::WithdrawalAggregator,
                &s.withdrawal_aggregator,
            )?,
            bridge: covenant_script(CovenantKind::Bridge, &s.bridge)?,
            withdrawal_expander: covenant_script(
                CovenantKind::WithdrawalExpander,
                &s.withdrawal_expander,
            )?,
        })
    }
}

fn covenant_script(kind: CovenantKind, script_hex: &str) -> Result<CovenantScript, ConfigError> {
    let bytes = hex::decode(script_hex.trim()).map_err(|e| ConfigError::InvalidScript {
        kind,
        reason: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(ConfigError::InvalidScript {
            kind,
            reason: "empty script".to_owned(),
        });
    }

    CovenantScript::new(kind, ScriptBuf::from_bytes(bytes)).map_err(|e| {
        ConfigError::InvalidScript {
            kind,
            reason: e.to_string(),
        }
    })
}
