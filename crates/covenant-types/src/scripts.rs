//! Precompiled covenant scripts and the outputs that lock to them.

use std::fmt;

use bitcoin::{
    opcodes::all::{OP_PUSHBYTES_32, OP_RETURN},
    taproot::{ControlBlock, LeafVersion, TapLeafHash, TaprootBuilder},
    Amount, ScriptBuf, TxOut, WPubkeyHash,
};
use catbridge_primitives::{constants::NUMS_INTERNAL_KEY, Buf20, Buf32};
use secp256k1::{XOnlyPublicKey, SECP256K1};
use serde::{Deserialize, Serialize};

use crate::errors::CovenantError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantKind {
    DepositAggregator,
    WithdrawalAggregator,
    Bridge,
    WithdrawalExpander,
}

impl fmt::Display for CovenantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CovenantKind::DepositAggregator => "deposit-aggregator",
            CovenantKind::WithdrawalAggregator => "withdrawal-aggregator",
            CovenantKind::Bridge => "bridge",
            CovenantKind::WithdrawalExpander => "withdrawal-expander",
        };
        f.write_str(name)
    }
}

/// A covenant tapscript committed as the only leaf under the unspendable internal key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CovenantScript {
    kind: CovenantKind,
    script: ScriptBuf,
    control_block: ControlBlock,
    leaf_hash: Buf32,
    script_pubkey: ScriptBuf,
}

impl CovenantScript {
    pub fn new(kind: CovenantKind, script: ScriptBuf) -> Result<Self, CovenantError> {
        let internal_key = XOnlyPublicKey::from_slice(&NUMS_INTERNAL_KEY)
            .map_err(|e| CovenantError::Taproot(e.to_string()))?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(0, script.clone())
            .map_err(|e| CovenantError::Taproot(e.to_string()))?
            .finalize(SECP256K1, internal_key)
            .map_err(|_| CovenantError::Taproot("could not finalize taproot tree".to_string()))?;

        let control_block = spend_info
            .control_block(&(script.clone(), LeafVersion::TapScript))
            .ok_or_else(|| CovenantError::Taproot("leaf missing from tree".to_string()))?;

        let leaf_hash = TapLeafHash::from_script(&script, LeafVersion::TapScript).into();
        let script_pubkey = ScriptBuf::new_p2tr_tweaked(spend_info.output_key());

        Ok(Self {
            kind,
            script,
            control_block,
            leaf_hash,
            script_pubkey,
        })
    }

    pub fn kind(&self) -> CovenantKind {
        self.kind
    }

    pub fn script(&self) -> &ScriptBuf {
        &self.script
    }

    pub fn control_block(&self) -> &ControlBlock {
        &self.control_block
    }

    pub fn leaf_hash(&self) -> &Buf32 {
        &self.leaf_hash
    }

    pub fn script_pubkey(&self) -> &ScriptBuf {
        &self.script_pubkey
    }

    /// An output locking `amount` to this covenant.
    pub fn output(&self, amount: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(amount),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// The four covenant scripts of one bridge instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CovenantScripts {
    pub deposit_aggregator: CovenantScript,
    pub withdrawal_aggregator: CovenantScript,
    pub bridge: CovenantScript,
    pub withdrawal_expander: CovenantScript,
}

impl CovenantScripts {
    pub fn from_scripts(
        deposit_aggregator: ScriptBuf,
        withdrawal_aggregator: ScriptBuf,
        bridge: ScriptBuf,
        withdrawal_expander: ScriptBuf,
    ) -> Result<Self, CovenantError> {
        Ok(Self {
            deposit_aggregator: CovenantScript::new(
                CovenantKind::DepositAggregator,
                deposit_aggregator,
            )?,
            withdrawal_aggregator: CovenantScript::new(
                CovenantKind::WithdrawalAggregator,
                withdrawal_aggregator,
            )?,
            bridge: CovenantScript::new(CovenantKind::Bridge, bridge)?,
            withdrawal_expander: CovenantScript::new(
                CovenantKind::WithdrawalExpander,
                withdrawal_expander,
            )?,
        })
    }

    pub fn get(&self, kind: CovenantKind) -> &CovenantScript {
        match kind {
            CovenantKind::DepositAggregator => &self.deposit_aggregator,
            CovenantKind::WithdrawalAggregator => &self.withdrawal_aggregator,
            CovenantKind::Bridge => &self.bridge,
            CovenantKind::WithdrawalExpander => &self.withdrawal_expander,
        }
    }
}

/// `OP_RETURN <hash>` script carrying a state commitment.
pub fn state_script(hash: &Buf32) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(34);
    bytes.push(OP_RETURN.to_u8());
    bytes.push(OP_PUSHBYTES_32.to_u8());
    bytes.extend_from_slice(hash.as_slice());
    ScriptBuf::from_bytes(bytes)
}

/// Zero-value output carrying a state commitment.
pub fn state_output(hash: &Buf32) -> TxOut {
    TxOut {
        value: Amount::ZERO,
        script_pubkey: state_script(hash),
    }
}

/// Reads the commitment back out of a state output.
pub fn parse_state_output(output: &TxOut) -> Result<Buf32, CovenantError> {
    let bytes = output.script_pubkey.as_bytes();
    if output.value != Amount::ZERO
        || bytes.len() != 34
        || bytes[0] != OP_RETURN.to_u8()
        || bytes[1] != OP_PUSHBYTES_32.to_u8()
    {
        return Err(CovenantError::MalformedTemplate("not a state output"));
    }
    Buf32::try_from(&bytes[2..]).map_err(|_| CovenantError::MalformedTemplate("not a state output"))
}

/// P2WPKH script paying `address`.
pub fn payout_script(address: &Buf20) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&WPubkeyHash::from(*address))
}
