//! Request, account and aggregation records, and the digests they commit to.

use catbridge_primitives::{
    constants::REQUEST_LEAF_TAG,
    encoding::padded_amount,
    hash::{hash_concat, sha256d},
    AmountOverflow, Buf20, Buf32,
};
use serde::{Deserialize, Serialize};

/// A batched request: who it is for and how much it moves.
pub trait BatchRequest: Copy {
    fn address(&self) -> Buf20;

    fn amount(&self) -> u64;

    /// `sha256d(REQUEST_LEAF_TAG || address || amount)`, the request's leaf in the batch tree.
    fn leaf_hash(&self) -> Buf32 {
        sha256d(
            &[
                REQUEST_LEAF_TAG,
                self.address().as_slice(),
                &self.amount().to_le_bytes(),
            ]
            .concat(),
        )
    }
}

/// A request as read from JSON, before its amount is range-checked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequest {
    pub address: Buf20,
    pub amount: u64,
}

macro_rules! impl_request {
    ($name:ident) => {
        impl $name {
            /// Fails if `amount` is outside the covenant amount range.
            pub fn new(address: Buf20, amount: u64) -> Result<Self, AmountOverflow> {
                padded_amount(amount)?;
                Ok(Self { address, amount })
            }
        }

        impl BatchRequest for $name {
            fn address(&self) -> Buf20 {
                self.address
            }

            fn amount(&self) -> u64 {
                self.amount
            }
        }

        impl TryFrom<RawRequest> for $name {
            type Error = AmountOverflow;

            fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
                Self::new(raw.address, raw.amount)
            }
        }

        impl From<$name> for RawRequest {
            fn from(value: $name) -> Self {
                RawRequest {
                    address: value.address,
                    amount: value.amount,
                }
            }
        }
    };
}

/// A deposit crediting `amount` to `address`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest", into = "RawRequest")]
pub struct DepositData {
    address: Buf20,
    amount: u64,
}
impl_request!(DepositData);

/// A withdrawal debiting `amount` from `address` and eventually paying it there.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest", into = "RawRequest")]
pub struct WithdrawalData {
    address: Buf20,
    amount: u64,
}
impl_request!(WithdrawalData);

/// One internal node of the withdrawal amount-sum tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationData {
    pub prev_hash_0: Buf32,
    pub prev_hash_1: Buf32,
    pub sum_amount: u64,
}

impl AggregationData {
    /// `sha256(prev_hash_0 || prev_hash_1 || sum_amount)`.
    pub fn hash(&self) -> Buf32 {
        hash_concat(&[
            self.prev_hash_0.as_slice(),
            self.prev_hash_1.as_slice(),
            &self.sum_amount.to_le_bytes(),
        ])
    }

    /// The node directly above two requests.
    pub fn from_leaves<R: BatchRequest>(left: &R, right: &R) -> Result<Self, AmountOverflow> {
        Ok(Self {
            prev_hash_0: left.leaf_hash(),
            prev_hash_1: right.leaf_hash(),
            sum_amount: sum_pair(left.amount(), right.amount())?,
        })
    }

    /// The node directly above two other nodes.
    pub fn from_nodes(left: &Self, right: &Self) -> Result<Self, AmountOverflow> {
        Ok(Self {
            prev_hash_0: left.hash(),
            prev_hash_1: right.hash(),
            sum_amount: sum_pair(left.sum_amount, right.sum_amount)?,
        })
    }

    pub fn child_hash(&self, branch: usize) -> Buf32 {
        if branch == 0 {
            self.prev_hash_0
        } else {
            self.prev_hash_1
        }
    }
}

fn sum_pair(a: u64, b: u64) -> Result<u64, AmountOverflow> {
    let sum = a.checked_add(b).ok_or(AmountOverflow(u64::MAX))?;
    padded_amount(sum)?;
    Ok(sum)
}

/// One slot of the account ledger.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    pub address: Buf20,
    pub balance: u64,
}

impl AccountData {
    pub fn new(address: Buf20, balance: u64) -> Self {
        Self { address, balance }
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_zero() && self.balance == 0
    }

    /// `sha256d(address || balance)`.
    pub fn hash(&self) -> Buf32 {
        sha256d(&[self.address.as_slice(), &self.balance.to_le_bytes()].concat())
    }
}

#[cfg(test)]
mod tests {
    use catbridge_primitives::constants::MAX_SCRIPT_AMOUNT;

    use super::*;

    fn addr(b: u8) -> Buf20 {
        Buf20::new([b; 20])
    }

    #[test]
    fn test_leaf_hash_is_tagged_double_sha() {
        let deposit = DepositData::new(addr(1), 1329).unwrap();
        let mut fields = [1u8; 28];
        fields[20..].copy_from_slice(&1329u64.to_le_bytes());
        assert_eq!(
            deposit.leaf_hash(),
            sha256d(&[REQUEST_LEAF_TAG, fields.as_slice()].concat())
        );
        assert_ne!(deposit.leaf_hash(), sha256d(&fields));

        // Same fields, same leaf, regardless of direction.
        let withdrawal = WithdrawalData::new(addr(1), 1329).unwrap();
        assert_eq!(withdrawal.leaf_hash(), deposit.leaf_hash());
        assert_ne!(deposit.leaf_hash(), AccountData::new(addr(1), 1329).hash());
    }

    #[test]
    fn test_request_amount_range() {
        assert!(DepositData::new(addr(1), MAX_SCRIPT_AMOUNT + 1).is_err());
        let json = format!(
            r#"{{"address":"{}","amount":{}}}"#,
            "11".repeat(20),
            MAX_SCRIPT_AMOUNT + 1
        );
        assert!(serde_json::from_str::<WithdrawalData>(&json).is_err());
    }

    #[test]
    fn test_request_json_shape() {
        let json = format!(r#"{{"address":"{}","amount":1400}}"#, "ab".repeat(20));
        let deposit: DepositData = serde_json::from_str(&json).unwrap();
        assert_eq!(deposit.amount(), 1400);
        assert_eq!(deposit.address(), Buf20::new([0xab; 20]));
        assert_eq!(serde_json::to_string(&deposit).unwrap(), json);
    }

    #[test]
    fn test_aggregation_data_sums() {
        let w0 = WithdrawalData::new(addr(1), 1000).unwrap();
        let w1 = WithdrawalData::new(addr(2), 800).unwrap();
        let node = AggregationData::from_leaves(&w0, &w1).unwrap();
        assert_eq!(node.sum_amount, 1800);
        assert_eq!(node.child_hash(0), w0.leaf_hash());
        assert_eq!(node.child_hash(1), w1.leaf_hash());

        let parent = AggregationData::from_nodes(&node, &node).unwrap();
        assert_eq!(parent.sum_amount, 3600);
        assert_eq!(parent.prev_hash_0, node.hash());
    }

    #[test]
    fn test_empty_account() {
        assert!(AccountData::default().is_empty());
        assert!(!AccountData::new(addr(1), 0).is_empty());
    }
}
