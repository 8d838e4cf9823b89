//! Algorithm adapters.
//!
//! Each submodule wraps one family of primitives from the RustCrypto crates.
//! `AlgorithmState` is the per-context storage the engine dispatches on: a
//! closed set of variants, so every operation is an exhaustive `match`.

pub mod block;
pub mod dh;
pub mod hash;
pub mod modes;
pub mod rsa;
pub mod stream;
pub mod utils;

pub use block::{BlockCipher, MAX_BLOCK_SIZE};
pub use dh::{DhComponents, DhKey};
pub use hash::{HashState, MessageDigest, MAX_HASH_SIZE};
pub use rsa::{RsaComponents, RsaKey};
pub use stream::StreamState;
pub use utils::{fill_nonzero_random, generate_random_bytes};

use serde::{Deserialize, Serialize};

use crate::error::{CryptError, Result};
use crate::types::{Algorithm, Mode};
use modes::Chain;

/// Per-instance configuration passed at context creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtendedParams {
    /// RC2 effective key length in bits (1..=1024).
    Rc2 { effective_bits: usize },
}

/// Public-key components for `load_pkc_key`.
#[derive(Clone)]
pub enum PkcKey {
    Rsa(RsaComponents),
    Dh(DhComponents),
}

/// Algorithm-specific state held by a context.
pub enum AlgorithmState {
    Block {
        cipher: Option<BlockCipher>,
        chain: Option<Chain>,
        rc2_effective_bits: Option<usize>,
    },
    Stream(Option<StreamState>),
    Hash {
        state: HashState,
        result: Option<MessageDigest>,
    },
    Rsa(Option<RsaKey>),
    Dh(Option<DhKey>),
}

impl AlgorithmState {
    /// Init slot: empty state for `algorithm`, applying extended params.
    pub fn init(algorithm: Algorithm, ext: Option<ExtendedParams>) -> Result<Self> {
        let state = match algorithm {
            Algorithm::Rc4 => AlgorithmState::Stream(None),
            Algorithm::Rsa => AlgorithmState::Rsa(None),
            Algorithm::Dh => AlgorithmState::Dh(None),
            algo if algo.is_hash() => AlgorithmState::Hash {
                state: HashState::new(algo)?,
                result: None,
            },
            _ => {
                let rc2_effective_bits = match ext {
                    Some(ExtendedParams::Rc2 { effective_bits }) => {
                        if !(1..=1024).contains(&effective_bits) {
                            return Err(CryptError::BadParam(3));
                        }
                        Some(effective_bits)
                    }
                    None => None,
                };
                AlgorithmState::Block {
                    cipher: None,
                    chain: None,
                    rc2_effective_bits,
                }
            }
        };
        Ok(state)
    }

    /// Key-load slot for conventional algorithms.
    pub fn load_key(&mut self, algorithm: Algorithm, key: &[u8]) -> Result<()> {
        match self {
            AlgorithmState::Block {
                cipher,
                chain,
                rc2_effective_bits,
            } => {
                *cipher = Some(BlockCipher::new(algorithm, key, *rc2_effective_bits)?);
                *chain = None;
            }
            AlgorithmState::Stream(state) => *state = Some(StreamState::new(key)?),
            AlgorithmState::Hash { .. } => return Err(CryptError::BadParam(1)),
            AlgorithmState::Rsa(_) | AlgorithmState::Dh(_) => return Err(CryptError::BadParam(2)),
        }
        Ok(())
    }

    /// Key-load slot for PKC algorithms.
    pub fn load_pkc_key(&mut self, key: &PkcKey) -> Result<()> {
        match (self, key) {
            (AlgorithmState::Rsa(slot), PkcKey::Rsa(components)) => {
                *slot = Some(RsaKey::load(components)?);
            }
            (AlgorithmState::Dh(slot), PkcKey::Dh(components)) => {
                *slot = Some(DhKey::load(components)?);
            }
            _ => return Err(CryptError::BadParam(2)),
        }
        Ok(())
    }

    /// IV-load slot. Restarts the chaining state; an IV loaded before the
    /// key has nothing to chain from and is dropped.
    pub fn load_iv(&mut self, mode: Mode, iv: &[u8]) -> Result<()> {
        if let AlgorithmState::Block { cipher, chain, .. } = self {
            *chain = match cipher {
                Some(cipher) => Some(Chain::new(cipher, mode, iv)?),
                None => None,
            };
        }
        Ok(())
    }

    /// Encrypt slot. Hash contexts absorb the data, and an empty buffer
    /// finishes the hash.
    pub fn encrypt(&mut self, mode: Mode, data: &mut [u8]) -> Result<()> {
        match self {
            AlgorithmState::Block { cipher, chain, .. } => {
                let cipher = cipher.as_ref().ok_or(CryptError::NoKey)?;
                modes::encrypt(cipher, mode, chain.as_mut(), data)
            }
            AlgorithmState::Stream(state) => {
                state.as_mut().ok_or(CryptError::NoKey)?.apply(data);
                Ok(())
            }
            AlgorithmState::Hash { state, result } => {
                if result.is_some() {
                    return Err(CryptError::Complete);
                }
                if data.is_empty() {
                    *result = Some(state.finalize_reset());
                } else {
                    state.update(data);
                }
                Ok(())
            }
            AlgorithmState::Rsa(key) => {
                let key = key.as_ref().ok_or(CryptError::NoKey)?;
                let mut out = key.public_op(data)?;
                data.copy_from_slice(&out);
                utils::clear_bytes(&mut out);
                Ok(())
            }
            AlgorithmState::Dh(key) => key.as_mut().ok_or(CryptError::NoKey)?.phase1(data),
        }
    }

    /// Decrypt slot. For RSA this is the private-key operation, which is also
    /// what signing uses.
    pub fn decrypt(&mut self, mode: Mode, data: &mut [u8]) -> Result<()> {
        match self {
            AlgorithmState::Block { cipher, chain, .. } => {
                let cipher = cipher.as_ref().ok_or(CryptError::NoKey)?;
                modes::decrypt(cipher, mode, chain.as_mut(), data)
            }
            AlgorithmState::Stream(state) => {
                state.as_mut().ok_or(CryptError::NoKey)?.apply(data);
                Ok(())
            }
            AlgorithmState::Hash { .. } => Err(CryptError::BadParam(1)),
            AlgorithmState::Rsa(key) => {
                let key = key.as_ref().ok_or(CryptError::NoKey)?;
                let mut out = key.private_op(data)?;
                data.copy_from_slice(&out);
                utils::clear_bytes(&mut out);
                Ok(())
            }
            AlgorithmState::Dh(key) => key.as_ref().ok_or(CryptError::NoKey)?.phase2(data),
        }
    }

    /// Hash state-export slot.
    pub fn hash_value(&self) -> Result<MessageDigest> {
        match self {
            AlgorithmState::Hash { result, .. } => result.clone().ok_or(CryptError::Incomplete),
            _ => Err(CryptError::BadParam(1)),
        }
    }

    pub fn reset_hash(&mut self) -> Result<()> {
        match self {
            AlgorithmState::Hash { state, result } => {
                *state = HashState::new(state.algorithm())?;
                *result = None;
                Ok(())
            }
            _ => Err(CryptError::BadParam(1)),
        }
    }

    /// Modulus length in bytes for PKC state with a loaded key.
    pub fn modulus_len(&self) -> Option<usize> {
        match self {
            AlgorithmState::Rsa(Some(key)) => Some(key.modulus_len()),
            AlgorithmState::Dh(Some(key)) => Some(key.modulus_len()),
            _ => None,
        }
    }

    pub fn rsa(&self) -> Option<&RsaKey> {
        match self {
            AlgorithmState::Rsa(Some(key)) => Some(key),
            _ => None,
        }
    }

    pub fn dh(&self) -> Option<&DhKey> {
        match self {
            AlgorithmState::Dh(Some(key)) => Some(key),
            _ => None,
        }
    }
}
