//! PKCS#1 v1.5 block formatting.
//!
//! Signature blocks: `00 01 FF..FF 00 <digest-info>`.
//! Encryption blocks: `00 02 <nonzero random> 00 <payload>`.
//! Both are exactly the modulus length with at least eight padding bytes.
//! Parsing is byte-exact; any deviation is `BadData`.

use zeroize::Zeroizing;

use crate::crypto::fill_nonzero_random;
use crate::error::{CryptError, Result};

/// Smallest number of padding bytes in a block.
pub const MIN_PADDING: usize = 8;

/// Fixed bytes around the padding: the two-byte prefix and the separator.
const FRAMING: usize = 3;

const BLOCK_TYPE_SIGN: u8 = 0x01;
const BLOCK_TYPE_ENCRYPT: u8 = 0x02;

/// Largest payload an encryption block of `modulus_len` bytes can carry.
pub fn max_payload(modulus_len: usize) -> usize {
    modulus_len.saturating_sub(FRAMING + MIN_PADDING)
}

fn padding_len(modulus_len: usize, payload_len: usize) -> Option<usize> {
    modulus_len
        .checked_sub(FRAMING + payload_len)
        .filter(|&pad| pad >= MIN_PADDING)
}

/// Build a signature block around `digest_info`. Fails `BadParam(1)` when
/// the key is too small for the digest.
pub fn pad_signature(digest_info: &[u8], modulus_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let pad = padding_len(modulus_len, digest_info.len()).ok_or(CryptError::BadParam(1))?;
    let mut block = Zeroizing::new(Vec::with_capacity(modulus_len));
    block.push(0x00);
    block.push(BLOCK_TYPE_SIGN);
    block.resize(2 + pad, 0xFF);
    block.push(0x00);
    block.extend_from_slice(digest_info);
    Ok(block)
}

/// Build an encryption block around `payload` with fresh random padding.
pub fn pad_encryption(payload: &[u8], modulus_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let pad = padding_len(modulus_len, payload.len()).ok_or(CryptError::BadParam(2))?;
    let mut block = Zeroizing::new(vec![0u8; modulus_len]);
    block[1] = BLOCK_TYPE_ENCRYPT;
    fill_nonzero_random(&mut block[2..2 + pad]);
    block[2 + pad] = 0x00;
    block[FRAMING + pad..].copy_from_slice(payload);
    Ok(block)
}

/// Strip a block of `block_type`, returning the payload.
fn unpad(block: &[u8], block_type: u8) -> Result<&[u8]> {
    if block.len() < FRAMING + MIN_PADDING || block[0] != 0x00 || block[1] != block_type {
        return Err(CryptError::BadData);
    }
    let body = &block[2..];
    let separator = body.iter().position(|&b| b == 0x00).ok_or(CryptError::BadData)?;
    if separator < MIN_PADDING {
        return Err(CryptError::BadData);
    }
    if block_type == BLOCK_TYPE_SIGN && body[..separator].iter().any(|&b| b != 0xFF) {
        return Err(CryptError::BadData);
    }
    Ok(&body[separator + 1..])
}

pub fn unpad_signature(block: &[u8]) -> Result<&[u8]> {
    unpad(block, BLOCK_TYPE_SIGN)
}

pub fn unpad_encryption(block: &[u8]) -> Result<&[u8]> {
    unpad(block, BLOCK_TYPE_ENCRYPT)
}
