//! Shared fixtures for the bridge crates' tests.
//!
//! Everything here is deterministic: the same operator key, the same placeholder covenant
//! scripts and the same funding outputs every time.

use bitcoin::{
    hashes::Hash,
    opcodes::{all::OP_DROP, OP_TRUE},
    script::Builder,
    ScriptBuf, Transaction, Txid,
};
use catbridge_covenant_types::{CovenantScripts, DepositData, WithdrawalData};
use catbridge_crypto::OperatorKeys;
use catbridge_primitives::ProtocolParams;
use catbridge_txbuilder::{fund_operator, FeeUtxoAllocator, SpendableUtxo, StaticUtxoSource};

/// Secret key of the test operator.
pub const OPERATOR_SECRET_KEY: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

/// Amount of each funding output handed to the operator.
pub const FUNDING_UTXO_AMOUNT: u64 = 5_000_000;

pub fn operator_keys() -> OperatorKeys {
    OperatorKeys::from_hex(OPERATOR_SECRET_KEY).expect("test: valid operator key")
}

/// A placeholder tapscript for covenant `tag`: `<tag> OP_DROP OP_TRUE`.
///
/// Distinct tags give distinct leaf hashes and output scripts, which is all the builders need.
pub fn placeholder_script(tag: i64) -> ScriptBuf {
    Builder::new()
        .push_int(tag)
        .push_opcode(OP_DROP)
        .push_opcode(OP_TRUE)
        .into_script()
}

pub fn covenant_scripts() -> CovenantScripts {
    CovenantScripts::from_scripts(
        placeholder_script(1),
        placeholder_script(2),
        placeholder_script(3),
        placeholder_script(4),
    )
    .expect("test: placeholder scripts build")
}

pub fn params() -> ProtocolParams {
    ProtocolParams::default()
}

/// Two outputs paying the operator's fee script.
pub fn funding_source(keys: &OperatorKeys) -> StaticUtxoSource {
    StaticUtxoSource::new(
        (0..2u8)
            .map(|i| SpendableUtxo {
                txid: Txid::from_byte_array([0xf0 + i; 32]),
                vout: i as u32,
                script_pubkey: keys.fee_script(),
                amount: FUNDING_UTXO_AMOUNT,
            })
            .collect(),
    )
}

/// Consolidates [`funding_source`] and returns the funding transaction with its allocator.
pub fn funded_operator(keys: &OperatorKeys) -> (Transaction, FeeUtxoAllocator) {
    fund_operator(&funding_source(keys), keys, &params()).expect("test: operator funds")
}

pub fn funded_allocator(keys: &OperatorKeys) -> FeeUtxoAllocator {
    funded_operator(keys).1
}

/// Deposits to the operator's address.
pub fn deposits(keys: &OperatorKeys, amounts: &[u64]) -> Vec<DepositData> {
    amounts
        .iter()
        .map(|amount| DepositData::new(keys.address_hash(), *amount).expect("test: amount in range"))
        .collect()
}

/// Withdrawals to the operator's address.
pub fn withdrawals(keys: &OperatorKeys, amounts: &[u64]) -> Vec<WithdrawalData> {
    amounts
        .iter()
        .map(|amount| {
            WithdrawalData::new(keys.address_hash(), *amount).expect("test: amount in range")
        })
        .collect()
}
