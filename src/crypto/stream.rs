//! RC4 stream cipher adapter.
//!
//! The keystream position lives inside the cipher state, so chunked calls
//! need no extra bookkeeping.

use rc4::consts::U16;
use rc4::{KeyInit, Rc4, StreamCipher};

use crate::error::{CryptError, Result};

/// RC4 key size in bytes.
pub const RC4_KEY_SIZE: usize = 16;

pub struct StreamState {
    cipher: Rc4<U16>,
}

impl StreamState {
    pub fn new(key: &[u8]) -> Result<Self> {
        let cipher = Rc4::<U16>::new_from_slice(key).map_err(|_| CryptError::BadParam(2))?;
        Ok(Self { cipher })
    }

    /// XOR the keystream into `data`. Encryption and decryption are the same.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }
}
