//! Byte encodings for values pushed onto covenant witness stacks.

use bitcoin::consensus::encode::{serialize, VarInt};

use crate::{constants::MAX_SCRIPT_AMOUNT, errors::AmountOverflow};

/// Encodes an amount as the 8-byte little-endian value used in outputs and state hashes.
///
/// Amounts are rejected once they leave the range scripts can add together.
pub fn padded_amount(amount: u64) -> Result<[u8; 8], AmountOverflow> {
    if amount > MAX_SCRIPT_AMOUNT {
        return Err(AmountOverflow(amount));
    }
    Ok(amount.to_le_bytes())
}

/// Sums amounts, failing once the running total leaves the covenant amount range.
pub fn checked_sum(amounts: impl IntoIterator<Item = u64>) -> Result<u64, AmountOverflow> {
    amounts.into_iter().try_fold(0u64, |acc, amount| {
        let sum = acc.saturating_add(amount);
        if sum > MAX_SCRIPT_AMOUNT {
            Err(AmountOverflow(sum))
        } else {
            Ok(sum)
        }
    })
}

/// Minimal script number encoding, as `OP_PUSHBYTES` data.
pub fn script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }

    // The sign lives in the top bit of the last byte.
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

/// Script boolean encoding: `[0x01]` for true, empty for false.
pub fn script_bool(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Prefixes `bytes` with their compact-size length.
pub fn with_compact_size(bytes: &[u8]) -> Vec<u8> {
    let mut out = serialize(&VarInt(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out
}
