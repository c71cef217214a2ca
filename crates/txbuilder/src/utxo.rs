//! Spendable outputs supplied from outside the builder.

use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};
use serde::{Deserialize, Serialize};

/// An output the operator can spend with its fee key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableUtxo {
    pub txid: Txid,
    pub vout: u32,
    pub script_pubkey: ScriptBuf,
    pub amount: u64,
}

impl SpendableUtxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }

    pub fn prevout(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// Supplies the outputs locked to a script.
pub trait UtxoSource {
    fn spendable_utxos(&self, script_pubkey: &ScriptBuf) -> Vec<SpendableUtxo>;
}

/// A fixed list of outputs, typically loaded from a file.
#[derive(Clone, Debug, Default)]
pub struct StaticUtxoSource {
    utxos: Vec<SpendableUtxo>,
}

impl StaticUtxoSource {
    pub fn new(utxos: Vec<SpendableUtxo>) -> Self {
        Self { utxos }
    }
}

impl UtxoSource for StaticUtxoSource {
    fn spendable_utxos(&self, script_pubkey: &ScriptBuf) -> Vec<SpendableUtxo> {
        self.utxos
            .iter()
            .filter(|utxo| &utxo.script_pubkey == script_pubkey)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    #[test]
    fn test_filters_by_script() {
        let mine = ScriptBuf::from_bytes(vec![0x51]);
        let other = ScriptBuf::from_bytes(vec![0x52]);
        let source = StaticUtxoSource::new(vec![
            SpendableUtxo {
                txid: Txid::from_byte_array([1; 32]),
                vout: 0,
                script_pubkey: mine.clone(),
                amount: 10,
            },
            SpendableUtxo {
                txid: Txid::from_byte_array([2; 32]),
                vout: 1,
                script_pubkey: other,
                amount: 20,
            },
        ]);

        let found = source.spendable_utxos(&mine);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, 10);
    }

    #[test]
    fn test_deserializes_utxo_file_entry() {
        let json = r#"{
            "txid": "0101010101010101010101010101010101010101010101010101010101010101",
            "vout": 3,
            "script_pubkey": "51",
            "amount": 50000
        }"#;
        let utxo: SpendableUtxo = serde_json::from_str(json).unwrap();
        assert_eq!(utxo.vout, 3);
        assert_eq!(utxo.script_pubkey, ScriptBuf::from_bytes(vec![0x51]));
        assert_eq!(utxo.prevout().value.to_sat(), 50_000);
    }
}
