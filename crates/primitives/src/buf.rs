//! Fixed-width byte buffers.

use bitcoin::{
    hashes::{hash160, sha256, Hash},
    taproot::TapLeafHash,
    Txid, WPubkeyHash,
};

use crate::macros::internal::*;

/// 20-byte buffer, used for HASH160 payout addresses.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Buf20(pub [u8; 20]);
impl_buf_core!(Buf20, 20);
impl_buf_fmt!(Buf20, 20);
impl_buf_serde!(Buf20, 20);

/// 32-byte buffer, used for every digest and commitment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Buf32(pub [u8; 32]);
impl_buf_core!(Buf32, 32);
impl_buf_fmt!(Buf32, 32);
impl_buf_serde!(Buf32, 32);

/// 64-byte buffer, used for Schnorr signatures and tag prefixes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Buf64(pub [u8; 64]);
impl_buf_core!(Buf64, 64);
impl_buf_fmt!(Buf64, 64);
impl_buf_serde!(Buf64, 64);

// Txids are kept in their internal (little-endian) byte order, the order they take inside a
// serialized outpoint.
impl From<Txid> for Buf32 {
    fn from(value: Txid) -> Self {
        Self(value.to_byte_array())
    }
}

impl From<Buf32> for Txid {
    fn from(value: Buf32) -> Self {
        Txid::from_byte_array(value.0)
    }
}

impl From<TapLeafHash> for Buf32 {
    fn from(value: TapLeafHash) -> Self {
        Self(value.to_byte_array())
    }
}

impl From<sha256::Hash> for Buf32 {
    fn from(value: sha256::Hash) -> Self {
        Self(value.to_byte_array())
    }
}

impl From<hash160::Hash> for Buf20 {
    fn from(value: hash160::Hash) -> Self {
        Self(value.to_byte_array())
    }
}

impl From<Buf20> for WPubkeyHash {
    fn from(value: Buf20) -> Self {
        WPubkeyHash::from_byte_array(value.0)
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::Txid;
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_buf32_serde_hex() {
        let buf = Buf32::new(hex!(
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        ));
        let json = serde_json::to_string(&buf).unwrap();
        assert_eq!(
            json,
            "\"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\""
        );

        let prefixed = "\"0x79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\"";
        let decoded: Buf32 = serde_json::from_str(prefixed).unwrap();
        assert_eq!(decoded, buf);
    }

    #[test]
    fn test_buf_serde_rejects_wrong_length() {
        let res: Result<Buf20, _> = serde_json::from_str("\"abcd\"");
        assert!(res.is_err());
    }

    #[test]
    fn test_display_truncates() {
        let buf = Buf32::new([0xab; 32]);
        assert_eq!(buf.to_string(), "ababab..ababab");
    }

    #[test]
    fn test_txid_roundtrip_keeps_internal_order() {
        let buf = Buf32::new([7; 32]);
        let txid = Txid::from(buf);
        assert_eq!(Buf32::from(txid), buf);
    }

    #[test]
    fn test_zero() {
        assert!(Buf64::zero().is_zero());
        assert!(!Buf20::new([1; 20]).is_zero());
        assert_eq!(Buf32::default(), Buf32::zero());
    }
}
