//! Protocol parameters.

use bitcoin::{Amount, Network};
use serde::{Deserialize, Serialize};

/// Flat amounts and network used when building covenant transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    #[serde(default = "default_network")]
    pub network: Network,

    /// Flat fee paid by every transaction, deducted from the operator change.
    #[serde(default = "default_tx_fee")]
    pub tx_fee: u64,

    /// Amount locked in covenant outputs that carry no value of their own.
    #[serde(default = "default_covenant_dust")]
    pub covenant_dust: u64,

    /// Amount locked in the bridge covenant at deployment.
    #[serde(default = "default_bridge_initial_amount")]
    pub bridge_initial_amount: u64,

    /// Amount paid to the withdrawer's address by an ownership proof.
    #[serde(default = "default_ownership_proof_amount")]
    pub ownership_proof_amount: u64,
}

fn default_network() -> Network {
    Network::Regtest
}

fn default_tx_fee() -> u64 {
    3_000
}

fn default_covenant_dust() -> u64 {
    330
}

fn default_bridge_initial_amount() -> u64 {
    1_000
}

fn default_ownership_proof_amount() -> u64 {
    1_000
}

impl ProtocolParams {
    pub fn tx_fee(&self) -> Amount {
        Amount::from_sat(self.tx_fee)
    }

    pub fn covenant_dust(&self) -> Amount {
        Amount::from_sat(self.covenant_dust)
    }

    pub fn ownership_proof_amount(&self) -> Amount {
        Amount::from_sat(self.ownership_proof_amount)
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            network: default_network(),
            tx_fee: default_tx_fee(),
            covenant_dust: default_covenant_dust(),
            bridge_initial_amount: default_bridge_initial_amount(),
            ownership_proof_amount: default_ownership_proof_amount(),
        }
    }
}
