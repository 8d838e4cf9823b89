//! Hash function adapters and the message digest record.
//!
//! The digest record is what SignedData and the PKCS#1 signature block carry:
//! an algorithm id plus a fixed-size digest. On the wire it is encoded as a
//! DER `DigestInfo`, using the fixed prefixes below instead of a general
//! ASN.1 encoder.

use md2::Md2;
use md4::Md4;
use md5::Md5;
use ripemd::Ripemd160;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptError, Result};
use crate::types::Algorithm;

/// Largest digest of any registered hash (SHA-256).
pub const MAX_HASH_SIZE: usize = 32;

const MD2_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x02, 0x05, 0x00,
    0x04, 0x10,
];
const MD4_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x04, 0x05, 0x00,
    0x04, 0x10,
];
const MD5_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05, 0x05, 0x00,
    0x04, 0x10,
];
const SHA1_PREFIX: &[u8] = &[
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];
const RIPEMD160_PREFIX: &[u8] = &[
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x24, 0x03, 0x02, 0x01, 0x05, 0x00, 0x04, 0x14,
];
const SHA256_PREFIX: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// Digest size in bytes, or `None` for non-hash algorithms.
pub fn digest_size(algorithm: Algorithm) -> Option<usize> {
    match algorithm {
        Algorithm::Md2 | Algorithm::Md4 | Algorithm::Md5 => Some(16),
        Algorithm::Sha1 | Algorithm::Ripemd160 => Some(20),
        Algorithm::Sha256 => Some(32),
        _ => None,
    }
}

fn digest_info_prefix(algorithm: Algorithm) -> Option<&'static [u8]> {
    match algorithm {
        Algorithm::Md2 => Some(MD2_PREFIX),
        Algorithm::Md4 => Some(MD4_PREFIX),
        Algorithm::Md5 => Some(MD5_PREFIX),
        Algorithm::Sha1 => Some(SHA1_PREFIX),
        Algorithm::Ripemd160 => Some(RIPEMD160_PREFIX),
        Algorithm::Sha256 => Some(SHA256_PREFIX),
        _ => None,
    }
}

/// Running hash state.
#[derive(Clone)]
pub enum HashState {
    Md2(Md2),
    Md4(Md4),
    Md5(Md5),
    Sha1(Sha1),
    Ripemd160(Ripemd160),
    Sha256(Sha256),
}

impl HashState {
    pub fn new(algorithm: Algorithm) -> Result<Self> {
        let state = match algorithm {
            Algorithm::Md2 => HashState::Md2(Md2::new()),
            Algorithm::Md4 => HashState::Md4(Md4::new()),
            Algorithm::Md5 => HashState::Md5(Md5::new()),
            Algorithm::Sha1 => HashState::Sha1(Sha1::new()),
            Algorithm::Ripemd160 => HashState::Ripemd160(Ripemd160::new()),
            Algorithm::Sha256 => HashState::Sha256(Sha256::new()),
            _ => return Err(CryptError::NoAlgo),
        };
        Ok(state)
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            HashState::Md2(_) => Algorithm::Md2,
            HashState::Md4(_) => Algorithm::Md4,
            HashState::Md5(_) => Algorithm::Md5,
            HashState::Sha1(_) => Algorithm::Sha1,
            HashState::Ripemd160(_) => Algorithm::Ripemd160,
            HashState::Sha256(_) => Algorithm::Sha256,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            HashState::Md2(h) => h.update(data),
            HashState::Md4(h) => h.update(data),
            HashState::Md5(h) => h.update(data),
            HashState::Sha1(h) => h.update(data),
            HashState::Ripemd160(h) => h.update(data),
            HashState::Sha256(h) => h.update(data),
        }
    }

    /// Finish the hash, leaving the state reset for reuse.
    pub fn finalize_reset(&mut self) -> MessageDigest {
        let algorithm = self.algorithm();
        match self {
            HashState::Md2(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
            HashState::Md4(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
            HashState::Md5(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
            HashState::Sha1(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
            HashState::Ripemd160(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
            HashState::Sha256(h) => MessageDigest::new(algorithm, &h.finalize_reset()),
        }
    }
}

/// One-shot hash over a list of byte strings.
pub fn hash_parts(algorithm: Algorithm, parts: &[&[u8]]) -> Result<MessageDigest> {
    let mut state = HashState::new(algorithm)?;
    for part in parts {
        state.update(part);
    }
    Ok(state.finalize_reset())
}

/// Algorithm id plus digest bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageDigest {
    pub algorithm: Algorithm,
    digest: [u8; MAX_HASH_SIZE],
    len: usize,
}

impl MessageDigest {
    fn new(algorithm: Algorithm, bytes: &[u8]) -> Self {
        let mut digest = [0u8; MAX_HASH_SIZE];
        digest[..bytes.len()].copy_from_slice(bytes);
        Self {
            algorithm,
            digest,
            len: bytes.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.digest[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the DER `DigestInfo` encoding.
    pub fn digest_info_len(&self) -> usize {
        digest_info_prefix(self.algorithm).map_or(0, <[u8]>::len) + self.len
    }

    /// Encode as a DER `DigestInfo`.
    pub fn to_digest_info(&self) -> Vec<u8> {
        let prefix = digest_info_prefix(self.algorithm).unwrap_or_default();
        let mut out = Vec::with_capacity(prefix.len() + self.len);
        out.extend_from_slice(prefix);
        out.extend_from_slice(self.as_bytes());
        out
    }

    /// Parse a DER `DigestInfo`. The encoding must match one of the known
    /// prefixes byte for byte and carry exactly the digest, nothing more.
    pub fn from_digest_info(bytes: &[u8]) -> Result<Self> {
        for algorithm in Algorithm::ALL.iter().copied().filter(|a| a.is_hash()) {
            let (Some(prefix), Some(size)) = (digest_info_prefix(algorithm), digest_size(algorithm))
            else {
                continue;
            };
            if bytes.len() == prefix.len() + size && bytes.starts_with(prefix) {
                return Ok(Self::new(algorithm, &bytes[prefix.len()..]));
            }
        }
        Err(CryptError::BadData)
    }
}

impl std::fmt::Debug for MessageDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDigest")
            .field("algorithm", &self.algorithm)
            .field("digest", &hex::encode(self.as_bytes()))
            .finish()
    }
}

impl Drop for MessageDigest {
    fn drop(&mut self) {
        self.digest.zeroize();
    }
}
