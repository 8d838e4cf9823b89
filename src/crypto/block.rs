//! Block cipher adapters.
//!
//! Wraps the RustCrypto block ciphers behind one enum so the mode code can
//! drive any of them with a plain byte slice.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use des::{Des, TdesEde2, TdesEde3};
use idea::Idea;
use rc2::Rc2;

use crate::error::{CryptError, Result};
use crate::types::Algorithm;

/// Largest block size of any registered cipher (AES).
pub const MAX_BLOCK_SIZE: usize = 16;

/// A keyed block cipher instance.
pub enum BlockCipher {
    Des(Des),
    TdesEde2(TdesEde2),
    TdesEde3(TdesEde3),
    Idea(Idea),
    Rc2(Rc2),
    Blowfish(Blowfish),
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

fn keyed<C: KeyInit>(key: &[u8]) -> Result<C> {
    C::new_from_slice(key).map_err(|_| CryptError::BadParam(2))
}

fn encrypt_with<C: BlockEncrypt>(cipher: &C, block: &mut [u8]) {
    cipher.encrypt_block(GenericArray::from_mut_slice(block));
}

fn decrypt_with<C: BlockDecrypt>(cipher: &C, block: &mut [u8]) {
    cipher.decrypt_block(GenericArray::from_mut_slice(block));
}

impl BlockCipher {
    /// Run the key schedule for `algorithm`.
    ///
    /// `rc2_effective_bits` overrides RC2's effective key length; every other
    /// cipher ignores it.
    pub fn new(algorithm: Algorithm, key: &[u8], rc2_effective_bits: Option<usize>) -> Result<Self> {
        let cipher = match algorithm {
            Algorithm::Des => BlockCipher::Des(keyed(key)?),
            Algorithm::TripleDes => match key.len() {
                16 => BlockCipher::TdesEde2(keyed(key)?),
                24 => BlockCipher::TdesEde3(keyed(key)?),
                _ => return Err(CryptError::BadParam(2)),
            },
            Algorithm::Idea => BlockCipher::Idea(keyed(key)?),
            Algorithm::Rc2 => {
                if key.is_empty() || key.len() > 128 {
                    return Err(CryptError::BadParam(2));
                }
                let bits = rc2_effective_bits.unwrap_or(key.len() * 8);
                BlockCipher::Rc2(Rc2::new_with_eff_key_len(key, bits))
            }
            Algorithm::Blowfish => BlockCipher::Blowfish(keyed(key)?),
            Algorithm::Aes => match key.len() {
                16 => BlockCipher::Aes128(keyed(key)?),
                24 => BlockCipher::Aes192(keyed(key)?),
                32 => BlockCipher::Aes256(keyed(key)?),
                _ => return Err(CryptError::BadParam(2)),
            },
            _ => return Err(CryptError::NoAlgo),
        };
        Ok(cipher)
    }

    pub fn block_size(&self) -> usize {
        match self {
            BlockCipher::Aes128(_) | BlockCipher::Aes192(_) | BlockCipher::Aes256(_) => 16,
            _ => 8,
        }
    }

    /// Encrypt exactly one block in place.
    pub fn encrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), self.block_size());
        match self {
            BlockCipher::Des(c) => encrypt_with(c, block),
            BlockCipher::TdesEde2(c) => encrypt_with(c, block),
            BlockCipher::TdesEde3(c) => encrypt_with(c, block),
            BlockCipher::Idea(c) => encrypt_with(c, block),
            BlockCipher::Rc2(c) => encrypt_with(c, block),
            BlockCipher::Blowfish(c) => encrypt_with(c, block),
            BlockCipher::Aes128(c) => encrypt_with(c, block),
            BlockCipher::Aes192(c) => encrypt_with(c, block),
            BlockCipher::Aes256(c) => encrypt_with(c, block),
        }
    }

    /// Decrypt exactly one block in place.
    pub fn decrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), self.block_size());
        match self {
            BlockCipher::Des(c) => decrypt_with(c, block),
            BlockCipher::TdesEde2(c) => decrypt_with(c, block),
            BlockCipher::TdesEde3(c) => decrypt_with(c, block),
            BlockCipher::Idea(c) => decrypt_with(c, block),
            BlockCipher::Rc2(c) => decrypt_with(c, block),
            BlockCipher::Blowfish(c) => decrypt_with(c, block),
            BlockCipher::Aes128(c) => decrypt_with(c, block),
            BlockCipher::Aes192(c) => decrypt_with(c, block),
            BlockCipher::Aes256(c) => decrypt_with(c, block),
        }
    }
}
