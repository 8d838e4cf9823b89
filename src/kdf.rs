//! Passphrase-based key derivation.
//!
//! The initial state hashes a header naming the target algorithm, mode and
//! key length together with the passphrase, so the same passphrase yields
//! unrelated keys for different uses. Each round then walks the key buffer
//! one digest-sized segment at a time: the state is re-hashed, and the hash
//! of (state ‖ passphrase) is XORed into the segment. Every round depends on
//! the previous state, so rounds cannot run in parallel.

use zeroize::Zeroizing;

use crate::config::MAX_KDF_ITERATIONS;
use crate::context::{ContextHandle, KdfInfo};
use crate::crypto::hash::hash_parts;
use crate::engine::Engine;
use crate::error::{CryptError, Result};
use crate::types::{Algorithm, Mode};

/// Derive `key_len` bytes for (`algorithm`, `mode`) from `passphrase`.
pub fn derive_key_bytes(
    algorithm: Algorithm,
    mode: Mode,
    key_len: usize,
    passphrase: &[u8],
    hash: Algorithm,
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>> {
    if !hash.is_hash() {
        return Err(CryptError::BadParam(5));
    }
    if !(1..=MAX_KDF_ITERATIONS).contains(&iterations) {
        return Err(CryptError::BadParam(6));
    }
    let key_len_bytes = u16::try_from(key_len).map_err(|_| CryptError::BadParam(3))?;
    let len_be = key_len_bytes.to_be_bytes();
    let header = [algorithm.id(), mode.id(), len_be[0], len_be[1]];

    let mut key = Zeroizing::new(vec![0u8; key_len]);
    let mut state = hash_parts(hash, &[&header, passphrase])?;
    for _ in 0..iterations {
        for segment in key.chunks_mut(state.len()) {
            state = hash_parts(hash, &[state.as_bytes()])?;
            let block = hash_parts(hash, &[state.as_bytes(), passphrase])?;
            for (k, b) in segment.iter_mut().zip(block.as_bytes()) {
                *k ^= b;
            }
        }
    }
    Ok(key)
}

impl Engine {
    /// Derive a key from `passphrase` and load it into a conventional
    /// context. `None` picks the configured hash and iteration count.
    pub fn derive_key(
        &mut self,
        handle: ContextHandle,
        passphrase: &[u8],
        hash: Option<Algorithm>,
        iterations: Option<u32>,
    ) -> Result<()> {
        let hash = hash.unwrap_or(self.config.hash_algorithm);
        let iterations = iterations.unwrap_or(self.config.kdf_iterations);
        if passphrase.is_empty() {
            return Err(CryptError::BadParam(2));
        }
        if !hash.is_hash() || !self.registry.algo_available(hash) {
            return Err(CryptError::BadParam(3));
        }
        if !(1..=MAX_KDF_ITERATIONS).contains(&iterations) {
            return Err(CryptError::BadParam(4));
        }

        let context = self.context_mut(handle)?;
        let cap = context.capability;
        if cap.is_hash() || cap.is_pkc() {
            return Err(CryptError::BadParam(1));
        }

        let key = derive_key_bytes(cap.algorithm, cap.mode, cap.key_size, passphrase, hash, iterations)?;
        context.load_key(&key)?;
        context.kdf = Some(KdfInfo {
            hash_algorithm: hash,
            iterations,
        });
        log::debug!(
            "Derived {}-byte {} key ({} rounds)",
            cap.key_size,
            cap.name,
            iterations
        );
        Ok(())
    }
}
