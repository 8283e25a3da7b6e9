//! State-key codec and numeric helpers.
//!
//! Keys must be byte-identical to the FSM's key-value layout: every key
//! is a sequence of length-prefixed segments where each length is a
//! single byte and empty segments are skipped entirely.

use crate::error::{PluginError, Result};

/// Key-space prefix for account rows.
pub const ACCOUNT_PREFIX: &[u8] = &[0x01];

/// Key-space prefix for the fee pool.
pub const POOL_PREFIX: &[u8] = &[0x02];

/// Key-space prefix for governance parameters.
pub const PARAMS_PREFIX: &[u8] = &[0x07];

/// Parameter-space suffix selecting the fee params record.
const FEE_PARAMS_SEGMENT: &[u8] = b"/f/";

/// Length of a raw address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A validated 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Construct from a raw byte slice; fails unless exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| PluginError::InvalidAddress)?;
        Ok(Self(raw))
    }

    /// Raw bytes of the address.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Owned copy of the raw bytes, for wire fields.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = PluginError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

/// Join segments with single-byte length prefixes, skipping empty ones.
///
/// Segment lengths above 255 cannot be represented; callers only pass
/// fixed short segments so this is a debug-time invariant.
pub fn join_len_prefixed(segments: &[&[u8]]) -> Vec<u8> {
    let total: usize = segments.iter().map(|s| s.len() + 1).sum();
    let mut out = Vec::with_capacity(total);
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        debug_assert!(segment.len() <= u8::MAX as usize);
        out.push(segment.len() as u8);
        out.extend_from_slice(segment);
    }
    out
}

/// Key of the account row for `addr`.
pub fn key_for_account(addr: &Address) -> Vec<u8> {
    join_len_prefixed(&[ACCOUNT_PREFIX, addr.as_bytes()])
}

/// Key of the fee pool for `chain_id`.
pub fn key_for_fee_pool(chain_id: u64) -> Vec<u8> {
    join_len_prefixed(&[POOL_PREFIX, &format_uint64(chain_id)])
}

/// Key of the governance fee parameters record.
pub fn key_for_fee_params() -> Vec<u8> {
    join_len_prefixed(&[PARAMS_PREFIX, FEE_PARAMS_SEGMENT])
}

/// Big-endian encoding of an unsigned 64-bit value.
#[inline]
pub fn format_uint64(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

/// True iff the value is a well-formed raw address.
#[inline]
pub fn validate_address(bytes: &[u8]) -> bool {
    bytes.len() == ADDRESS_LEN
}

/// True iff the value is a valid transfer amount.
#[inline]
pub fn validate_amount(amount: u64) -> bool {
    amount > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_key_layout() {
        let addr = Address::from_slice(&[0xAB; 20]).unwrap();
        let key = key_for_account(&addr);

        let mut expected = vec![0x01, 0x01, 0x14];
        expected.extend_from_slice(&[0xAB; 20]);
        assert_eq!(key, expected);
    }

    #[test]
    fn test_fee_pool_key_layout() {
        let key = key_for_fee_pool(1);
        assert_eq!(key, vec![0x01, 0x02, 0x08, 0, 0, 0, 0, 0, 0, 0, 1]);

        let key = key_for_fee_pool(0x0102030405060708);
        assert_eq!(
            key,
            vec![0x01, 0x02, 0x08, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn test_fee_params_key_layout() {
        assert_eq!(
            key_for_fee_params(),
            vec![0x01, 0x07, 0x03, b'/', b'f', b'/']
        );
    }

    #[test]
    fn test_keys_are_deterministic() {
        let addr = Address::from_slice(&[7; 20]).unwrap();
        assert_eq!(key_for_account(&addr), key_for_account(&addr));
        assert_eq!(key_for_fee_pool(9), key_for_fee_pool(9));
        assert_eq!(key_for_fee_params(), key_for_fee_params());
    }

    #[test]
    fn test_joiner_skips_empty_segments() {
        assert_eq!(join_len_prefixed(&[b"", b"ab", b"", b"c"]), b"\x02ab\x01c");
        assert!(join_len_prefixed(&[b"", b""]).is_empty());
    }

    #[test]
    fn test_format_uint64_big_endian() {
        assert_eq!(format_uint64(0), [0; 8]);
        assert_eq!(format_uint64(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(format_uint64(u64::MAX), [0xFF; 8]);
    }

    #[test]
    fn test_validate_address_length() {
        assert!(validate_address(&[0; 20]));
        assert!(!validate_address(&[0; 19]));
        assert!(!validate_address(&[0; 21]));
        assert!(!validate_address(&[]));
    }

    #[test]
    fn test_validate_amount_rejects_zero() {
        assert!(!validate_amount(0));
        assert!(validate_amount(1));
        assert!(validate_amount(u64::MAX));
    }

    #[test]
    fn test_address_from_slice() {
        assert!(Address::from_slice(&[1; 20]).is_ok());
        let err = Address::from_slice(&[1; 19]).unwrap_err();
        assert_eq!(err.code(), 12);
    }
}
