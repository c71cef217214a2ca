//! Consolidation of the operator's spendable outputs into the first fee input.

use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, Sequence, Transaction, TxIn, TxOut,
};
use catbridge_covenant_types::FeeInput;
use catbridge_crypto::OperatorKeys;
use catbridge_primitives::{AmountOverflow, ProtocolParams};
use tracing::*;

use crate::{allocator::FeeUtxoAllocator, errors::BuildError, utxo::UtxoSource};

/// Spends every output `source` holds for the operator fee script into a single change output,
/// and returns the funding transaction with an allocator seeded from that output.
pub fn fund_operator(
    source: &impl UtxoSource,
    keys: &OperatorKeys,
    params: &ProtocolParams,
) -> Result<(Transaction, FeeUtxoAllocator), BuildError> {
    let fee_script = keys.fee_script();
    let utxos = source.spendable_utxos(&fee_script);

    let available = utxos
        .iter()
        .try_fold(0u64, |acc, utxo| acc.checked_add(utxo.amount))
        .unwrap_or(u64::MAX);
    if utxos.is_empty() || available <= params.tx_fee {
        let needed = params
            .tx_fee
            .checked_add(1)
            .ok_or(AmountOverflow(params.tx_fee))?;
        return Err(BuildError::InsufficientFunds { needed, available });
    }

    let change = available - params.tx_fee;
    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: utxos
            .iter()
            .map(|utxo| TxIn {
                previous_output: utxo.outpoint(),
                sequence: Sequence::MAX,
                ..Default::default()
            })
            .collect(),
        output: vec![TxOut {
            value: Amount::from_sat(change),
            script_pubkey: fee_script.clone(),
        }],
    };

    let prevouts: Vec<TxOut> = utxos.iter().map(|utxo| utxo.prevout()).collect();
    let witnesses = (0..tx.input.len())
        .map(|index| keys.sign_key_spend(&tx, &prevouts, index))
        .collect::<Result<Vec<_>, _>>()?;
    for (input, witness) in tx.input.iter_mut().zip(witnesses) {
        input.witness = witness;
    }

    let txid = tx.compute_txid();
    info!(%txid, inputs = utxos.len(), amount = change, "funded operator");

    let allocator = FeeUtxoAllocator::seeded(FeeInput {
        txid: txid.into(),
        vout: 0,
        amount: change,
        script: fee_script,
    });
    Ok((tx, allocator))
}
