//! Context records.
//!
//! A context is the mutable state bound to one capability: the key, the IV,
//! the algorithm state and a few caller-visible attributes. Contexts live in
//! the engine's `ContextTable` and are reached through `ContextHandle`s.

pub mod table;

pub use table::ContextHandle;

use serde::Serialize;
use zeroize::{Zeroize, Zeroizing};

use crate::capability::Capability;
use crate::crypto::hash::hash_parts;
use crate::crypto::utils::generate_random_bytes;
use crate::crypto::{AlgorithmState, ExtendedParams, MessageDigest, PkcKey};
use crate::error::{CryptError, Result};
use crate::types::{Algorithm, Mode};

/// Length of a key cookie in bytes.
pub const COOKIE_SIZE: usize = 8;

const COOKIE_LABEL: &[u8] = b"key-cookie";

/// Short fingerprint of a conventional key, bound to the algorithm and mode
/// it is used with.
pub fn key_cookie(algorithm: Algorithm, mode: Mode, key: &[u8]) -> Result<[u8; COOKIE_SIZE]> {
    let digest = hash_parts(
        Algorithm::Sha1,
        &[COOKIE_LABEL, &[algorithm.id(), mode.id()], key],
    )?;
    let mut cookie = [0u8; COOKIE_SIZE];
    cookie.copy_from_slice(&digest.as_bytes()[..COOKIE_SIZE]);
    Ok(cookie)
}

/// How a derived key was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfInfo {
    pub hash_algorithm: Algorithm,
    pub iterations: u32,
}

/// Snapshot of a context's public attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub algorithm: Algorithm,
    pub mode: Mode,
    pub block_size: usize,
    /// Loaded key length, or the modulus length for PKC contexts.
    pub key_size: usize,
    pub key_set: bool,
    pub iv_set: bool,
    pub is_public_key: bool,
    pub key_id: Option<Vec<u8>>,
    pub key_cookie: Option<[u8; COOKIE_SIZE]>,
    pub control_vector: u32,
    pub kdf: Option<KdfInfo>,
}

pub struct Context {
    pub(crate) capability: Capability,
    pub(crate) state: AlgorithmState,
    key: Zeroizing<Vec<u8>>,
    iv: Zeroizing<Vec<u8>>,
    key_set: bool,
    iv_set: bool,
    is_public: bool,
    pub(crate) key_id: Option<Vec<u8>>,
    cookie: Option<[u8; COOKIE_SIZE]>,
    pub(crate) control_vector: u32,
    pub(crate) kdf: Option<KdfInfo>,
}

impl Context {
    /// Bind a fresh context to `capability`. Hash contexts need neither key
    /// nor IV, so both start out set.
    pub fn new(capability: Capability, ext: Option<ExtendedParams>) -> Result<Self> {
        if !capability.self_test_ok {
            return Err(CryptError::SelfTest);
        }
        if ext.is_some() && !capability.has_extended_init() {
            return Err(CryptError::BadParam(3));
        }
        let state = AlgorithmState::init(capability.algorithm, ext)?;
        let keyless = capability.is_hash();
        Ok(Self {
            capability,
            state,
            key: Zeroizing::new(Vec::new()),
            iv: Zeroizing::new(Vec::new()),
            key_set: keyless,
            iv_set: keyless,
            is_public: false,
            key_id: None,
            cookie: None,
            control_vector: 0,
            kdf: None,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.capability.algorithm
    }

    pub fn mode(&self) -> Mode {
        self.capability.mode
    }

    pub fn key_set(&self) -> bool {
        self.key_set
    }

    pub fn iv_set(&self) -> bool {
        self.iv_set
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn cookie(&self) -> Option<[u8; COOKIE_SIZE]> {
        self.cookie
    }

    pub(crate) fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Load a conventional key. The key is copied into a buffer sized
    /// exactly to it so that nothing is left behind by a reallocation.
    pub fn load_key(&mut self, key: &[u8]) -> Result<()> {
        if self.capability.is_hash() {
            return Err(CryptError::BadParam(1));
        }
        if self.capability.is_pkc() {
            return Err(CryptError::BadParam(2));
        }
        if !self.capability.key_size_ok(key.len()) {
            return Err(CryptError::BadParam(2));
        }

        let mut buf = Zeroizing::new(Vec::with_capacity(key.len()));
        buf.extend_from_slice(key);
        self.state.load_key(self.capability.algorithm, &buf)?;
        self.cookie = Some(key_cookie(self.capability.algorithm, self.capability.mode, &buf)?);
        self.key = buf;
        self.key_set = true;
        self.iv_set = !self.capability.mode.needs_iv();
        self.kdf = None;
        Ok(())
    }

    /// Load a random key of the recommended size.
    pub fn generate_key(&mut self) -> Result<()> {
        if self.capability.is_hash() || self.capability.is_pkc() {
            return Err(CryptError::BadParam(1));
        }
        let key = generate_random_bytes(self.capability.key_size);
        self.load_key(&key)
    }

    pub fn load_pkc_key(&mut self, key: &PkcKey) -> Result<()> {
        if !self.capability.is_pkc() {
            return Err(CryptError::BadParam(1));
        }
        self.state.load_pkc_key(key)?;
        let (key_id, is_public) = match (self.state.rsa(), self.state.dh()) {
            (Some(rsa), _) => (rsa.key_id()?, !rsa.is_private()),
            (_, Some(dh)) => (dh.key_id()?, false),
            _ => return Err(CryptError::BadParam(2)),
        };
        self.key_id = Some(key_id);
        self.is_public = is_public;
        self.key_set = true;
        self.iv_set = true;
        Ok(())
    }

    pub fn load_iv(&mut self, iv: &[u8]) -> Result<()> {
        let cap = &self.capability;
        if !cap.mode.needs_iv() {
            return Err(CryptError::BadParam(1));
        }
        if !(cap.min_iv_size..=cap.max_iv_size).contains(&iv.len()) {
            return Err(CryptError::BadParam(2));
        }
        self.iv = Zeroizing::new(iv.to_vec());
        self.state.load_iv(cap.mode, iv)?;
        self.iv_set = true;
        Ok(())
    }

    /// The IV as originally loaded, before any feedback.
    pub fn retrieve_iv(&self) -> Result<Vec<u8>> {
        if !self.capability.mode.needs_iv() {
            return Err(CryptError::BadParam(1));
        }
        if !self.iv_set {
            return Err(CryptError::NoIV);
        }
        Ok(self.iv.to_vec())
    }

    /// Generate and load a random IV if the mode needs one and none is
    /// loaded yet.
    pub(crate) fn ensure_iv(&mut self) -> Result<()> {
        if self.capability.mode.needs_iv() && !self.iv_set {
            let iv = generate_random_bytes(self.capability.iv_size);
            self.load_iv(&iv)?;
            log::debug!("Generated IV for {} context", self.capability.name);
        }
        Ok(())
    }

    pub fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        if !self.key_set {
            return Err(CryptError::NoKey);
        }
        self.ensure_iv()?;
        self.state.encrypt(self.capability.mode, data)
    }

    pub fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        if !self.key_set {
            return Err(CryptError::NoKey);
        }
        if !self.iv_set {
            return Err(CryptError::NoIV);
        }
        self.state.decrypt(self.capability.mode, data)
    }

    pub fn hash_value(&self) -> Result<MessageDigest> {
        self.state.hash_value()
    }

    pub fn reset_hash(&mut self) -> Result<()> {
        self.state.reset_hash()
    }

    /// Modulus length for PKC contexts, loaded key length otherwise.
    pub fn key_size(&self) -> usize {
        self.state.modulus_len().unwrap_or(self.key.len())
    }

    pub fn info(&self) -> ContextInfo {
        ContextInfo {
            algorithm: self.capability.algorithm,
            mode: self.capability.mode,
            block_size: self.capability.block_size,
            key_size: self.key_size(),
            key_set: self.key_set,
            iv_set: self.iv_set,
            is_public_key: self.is_public,
            key_id: self.key_id.clone(),
            key_cookie: self.cookie,
            control_vector: self.control_vector,
            kdf: self.kdf,
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.cookie.zeroize();
        self.key_id.zeroize();
        self.control_vector = 0;
    }
}
