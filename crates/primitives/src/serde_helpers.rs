//! Serde adapters encoding bitcoin types as consensus-serialized hex strings.

/// `#[serde(with = "consensus_hex")]` for a single consensus-encodable value.
pub mod consensus_hex {
    use bitcoin::consensus::{
        encode::{deserialize as consensus_deserialize, serialize_hex},
        Decodable, Encodable,
    };
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Encodable, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&serialize_hex(value))
    }

    pub fn deserialize<'de, T: Decodable, D: Deserializer<'de>>(d: D) -> Result<T, D::Error> {
        let hex_str = String::deserialize(d)?;
        let bytes = hex::decode(hex_str).map_err(D::Error::custom)?;
        consensus_deserialize(&bytes).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "consensus_hex_seq")]` for a `Vec` of consensus-encodable values.
pub mod consensus_hex_seq {
    use bitcoin::consensus::{
        encode::{deserialize as consensus_deserialize, serialize_hex},
        Decodable, Encodable,
    };
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Encodable, S: Serializer>(values: &[T], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&serialize_hex(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, T: Decodable, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<T>, D::Error> {
        Vec::<String>::deserialize(d)?
            .into_iter()
            .map(|hex_str| {
                let bytes = hex::decode(hex_str).map_err(D::Error::custom)?;
                consensus_deserialize(&bytes).map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{absolute::LockTime, transaction::Version, Transaction};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapped {
        #[serde(with = "consensus_hex")]
        tx: Transaction,
        #[serde(with = "consensus_hex_seq")]
        txs: Vec<Transaction>,
    }

    fn empty_tx(lock: u32) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(lock),
            input: vec![],
            output: vec![],
        }
    }

    #[test]
    fn test_transactions_serialize_as_hex() {
        let wrapped = Wrapped {
            tx: empty_tx(0),
            txs: vec![empty_tx(1), empty_tx(2)],
        };
        let value = serde_json::to_value(&wrapped).unwrap();
        assert!(value["tx"].as_str().unwrap().starts_with("02000000"));
        assert_eq!(value["txs"].as_array().unwrap().len(), 2);
    }
}
