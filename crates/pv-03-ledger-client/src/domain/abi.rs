//! # Contract ABI
//!
//! Just enough Solidity ABI for the document registry contract: every
//! function takes one `string`, and only `verifyDocument` returns a value
//! (`bool`).
//!
//! Call data layout for `f(string s)`:
//!
//! ```text
//! selector (4) | offset = 0x20 (32) | len(s) (32) | s, zero padded to 32
//! ```

use crate::domain::errors::{LedgerError, LedgerResult};
use sha3::{Digest, Keccak256};

pub const VERIFY_DOCUMENT: &str = "verifyDocument(string)";
pub const UPLOAD_DOCUMENT: &str = "uploadDocument(string)";
pub const REVOKE_DOCUMENT: &str = "revokeDocument(string)";

const WORD: usize = 32;

/// First four bytes of the Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word_from_usize(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn usize_from_word(word: &[u8]) -> LedgerResult<usize> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(LedgerError::Abi("integer word exceeds 64 bits".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..WORD]);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|e| LedgerError::Abi(e.to_string()))
}

/// Encode a call to a single-`string` function.
pub fn encode_string_call(signature: &str, arg: &str) -> Vec<u8> {
    let bytes = arg.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(4 + 2 * WORD + padded);
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&word_from_usize(WORD));
    out.extend_from_slice(&word_from_usize(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(4 + 2 * WORD + padded, 0);
    out
}

/// Split call data produced by `encode_string_call` back into selector and
/// argument.
pub fn decode_string_call(data: &[u8]) -> LedgerResult<([u8; 4], String)> {
    if data.len() < 4 + 2 * WORD {
        return Err(LedgerError::Abi(format!(
            "call data too short: {} bytes",
            data.len()
        )));
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&data[..4]);
    let body = &data[4..];

    let offset = usize_from_word(&body[..WORD])?;
    let len_end = offset
        .checked_add(WORD)
        .filter(|end| *end <= body.len())
        .ok_or_else(|| LedgerError::Abi("string offset out of range".into()))?;
    let len = usize_from_word(&body[offset..len_end])?;
    let raw = body
        .get(len_end..len_end.saturating_add(len))
        .filter(|raw| raw.len() == len)
        .ok_or_else(|| LedgerError::Abi("string length out of range".into()))?;

    let arg = String::from_utf8(raw.to_vec()).map_err(|e| LedgerError::Abi(e.to_string()))?;
    Ok((sel, arg))
}

/// Decode a `bool` return value.
pub fn decode_bool(data: &[u8]) -> LedgerResult<bool> {
    let word = data
        .get(..WORD)
        .ok_or_else(|| LedgerError::Abi(format!("bool needs 32 bytes, got {}", data.len())))?;
    if word[..WORD - 1].iter().any(|b| *b != 0) {
        return Err(LedgerError::Abi("dirty high bytes in bool".into()));
    }
    match word[WORD - 1] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LedgerError::Abi(format!("invalid bool byte {}", other))),
    }
}

/// Encode a `bool` return value.
pub fn encode_bool(value: bool) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 1] = value as u8;
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_string_call_layout() {
        let data = encode_string_call(UPLOAD_DOCUMENT, "hash1");
        assert_eq!(data.len(), 4 + 32 * 3);
        assert_eq!(&data[..4], &selector(UPLOAD_DOCUMENT));
        assert_eq!(data[4 + 31], 0x20);
        assert_eq!(data[4 + 63], 5);
        assert_eq!(&data[4 + 64..4 + 69], b"hash1");
        assert!(data[4 + 69..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_exact_word_string_has_no_extra_padding() {
        let arg = "a".repeat(32);
        assert_eq!(encode_string_call(VERIFY_DOCUMENT, &arg).len(), 4 + 32 * 3);
        assert_eq!(encode_string_call(VERIFY_DOCUMENT, "").len(), 4 + 32 * 2);
    }

    #[test]
    fn test_decode_string_call() {
        let data = encode_string_call(REVOKE_DOCUMENT, "0xdeadbeef");
        let (sel, arg) = decode_string_call(&data).unwrap();
        assert_eq!(sel, selector(REVOKE_DOCUMENT));
        assert_eq!(arg, "0xdeadbeef");

        assert!(decode_string_call(&data[..40]).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(&encode_bool(true)).unwrap());
        assert!(!decode_bool(&encode_bool(false)).unwrap());
        assert!(decode_bool(&[0u8; 31]).is_err());

        let mut dirty = encode_bool(true);
        dirty[0] = 1;
        assert!(decode_bool(&dirty).is_err());

        let mut two = [0u8; 32];
        two[31] = 2;
        assert!(decode_bool(&two).is_err());
    }
}
