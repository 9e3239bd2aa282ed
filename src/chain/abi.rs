//! Minimal ABI encoding for the handful of marketplace calls we make.
//!
//! Selectors are computed at runtime with keccak-256 rather than hardcoded,
//! so the call signatures below are the single source of truth.

use sha3::{Digest, Keccak256};

use crate::error::{Result, WatchError};

pub const WORD: usize = 32;

/// 4-byte function selector for a canonical signature like
/// `getRentalData(uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

pub fn encode_u256(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Selector followed by statically encoded arguments.
pub fn encode_call(signature: &str, args: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// The `index`-th 32-byte word of a return buffer.
pub fn word(buf: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    let end = start + WORD;
    if buf.len() < end {
        return Err(WatchError::Abi(format!(
            "return data too short: want word {}, got {} bytes",
            index,
            buf.len()
        )));
    }
    Ok(&buf[start..end])
}

pub fn decode_u64(word: &[u8]) -> Result<u64> {
    if word[..WORD - 8].iter().any(|&b| b != 0) {
        return Err(WatchError::Abi("uint256 overflows u64".to_string()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(bytes))
}

pub fn decode_u128(word: &[u8]) -> Result<u128> {
    if word[..WORD - 16].iter().any(|&b| b != 0) {
        return Err(WatchError::Abi("uint256 overflows u128".to_string()));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[WORD - 16..]);
    Ok(u128::from_be_bytes(bytes))
}

pub fn decode_bool(word: &[u8]) -> Result<bool> {
    match decode_u64(word)? {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(WatchError::Abi(format!("invalid bool value: {}", v))),
    }
}

/// Address encoded as the low 20 bytes of a word, rendered `0x`-prefixed.
pub fn decode_address(word: &[u8]) -> Result<String> {
    if word[..WORD - 20].iter().any(|&b| b != 0) {
        return Err(WatchError::Abi("address has non-zero padding".to_string()));
    }
    Ok(format!("0x{}", hex::encode(&word[WORD - 20..])))
}

/// Dynamic string whose offset lives in head word `head_index`.
///
/// The offset and length words come straight off the wire, so all range
/// arithmetic is checked rather than trusted.
pub fn decode_string(buf: &[u8], head_index: usize) -> Result<String> {
    let offset = decode_u64(word(buf, head_index)?)? as usize;
    let start = offset
        .checked_add(WORD)
        .filter(|&start| buf.len() >= start)
        .ok_or_else(|| WatchError::Abi("string offset out of range".to_string()))?;
    let len = decode_u64(&buf[offset..start])? as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| buf.len() >= end)
        .ok_or_else(|| WatchError::Abi("string data out of range".to_string()))?;
    String::from_utf8(buf[start..end].to_vec())
        .map_err(|e| WatchError::Abi(format!("string not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_shape() {
        let a = selector("lastTokenId()");
        let b = selector("getRentalData(uint256)");
        // Deterministic and signature-dependent.
        assert_eq!(a, selector("lastTokenId()"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_u256_layout() {
        let w = encode_u256(0x0102);
        assert_eq!(&w[..30], &[0u8; 30]);
        assert_eq!(w[30], 0x01);
        assert_eq!(w[31], 0x02);
    }

    #[test]
    fn test_encode_call_layout() {
        let data = encode_call("getRentalData(uint256)", &[encode_u256(7)]);
        assert_eq!(data.len(), 4 + WORD);
        assert_eq!(&data[..4], &selector("getRentalData(uint256)"));
        assert_eq!(data[4 + WORD - 1], 7);
    }

    #[test]
    fn test_decode_u64_roundtrip() {
        assert_eq!(decode_u64(&encode_u256(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(decode_u64(&encode_u256(0)).unwrap(), 0);

        let mut overflow = [0u8; WORD];
        overflow[0] = 1;
        assert!(decode_u64(&overflow).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(!decode_bool(&encode_u256(0)).unwrap());
        assert!(decode_bool(&encode_u256(1)).unwrap());
        assert!(decode_bool(&encode_u256(2)).is_err());
    }

    #[test]
    fn test_decode_address() {
        let mut w = [0u8; WORD];
        w[WORD - 20..].copy_from_slice(&[0x11; 20]);
        assert_eq!(
            decode_address(&w).unwrap(),
            "0x1111111111111111111111111111111111111111"
        );

        w[0] = 1;
        assert!(decode_address(&w).is_err());
    }

    #[test]
    fn test_decode_string() {
        // Single head word pointing at a tail holding "hi".
        let mut buf = Vec::new();
        buf.extend_from_slice(&encode_u256(32)); // offset
        buf.extend_from_slice(&encode_u256(2)); // length
        let mut tail = [0u8; WORD];
        tail[..2].copy_from_slice(b"hi");
        buf.extend_from_slice(&tail);

        assert_eq!(decode_string(&buf, 0).unwrap(), "hi");
    }

    #[test]
    fn test_decode_string_out_of_range() {
        let buf = encode_u256(64).to_vec();
        assert!(decode_string(&buf, 0).is_err());
    }

    #[test]
    fn test_decode_string_rejects_huge_offset() {
        // A hostile reply with an offset near u64::MAX must error, not wrap.
        let buf = encode_u256(u64::MAX).to_vec();
        assert!(matches!(
            decode_string(&buf, 0),
            Err(WatchError::Abi(_))
        ));
    }

    #[test]
    fn test_decode_string_rejects_huge_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&encode_u256(32)); // offset
        buf.extend_from_slice(&encode_u256(u64::MAX)); // length
        assert!(matches!(
            decode_string(&buf, 0),
            Err(WatchError::Abi(_))
        ));
    }
}
