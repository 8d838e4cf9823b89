//! Engine option table.
//!
//! A small set of process defaults (which hash, PKC and cipher to pick when
//! the caller asks for "the default", how many KDF rounds to run) readable
//! and writable through `CryptOption` / `OptionValue`.

use serde::{Deserialize, Serialize};

use crate::error::{CryptError, Result};
use crate::types::{Algorithm, AlgorithmClass, Mode};

/// Default number of key-derivation rounds.
pub const DEFAULT_KDF_ITERATIONS: u32 = 500;

/// Upper bound on key-derivation rounds.
pub const MAX_KDF_ITERATIONS: u32 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub hash_algorithm: Algorithm,
    pub pkc_algorithm: Algorithm,
    pub cipher_algorithm: Algorithm,
    pub cipher_mode: Mode,
    pub kdf_iterations: u32,
    /// Recorded only. Page locking is not performed.
    pub memory_lock: bool,
    /// Whether exported objects carry the key cookie.
    pub export_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_algorithm: Algorithm::Sha1,
            pkc_algorithm: Algorithm::Rsa,
            cipher_algorithm: Algorithm::TripleDes,
            cipher_mode: Mode::Cbc,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            memory_lock: false,
            export_cookies: true,
        }
    }
}

/// Selects one entry of the option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptOption {
    HashAlgorithm,
    PkcAlgorithm,
    CipherAlgorithm,
    CipherMode,
    KdfIterations,
    MemoryLock,
    ExportCookies,
}

/// Value read from or written to the option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Algorithm(Algorithm),
    Mode(Mode),
    Number(u32),
    Flag(bool),
}

impl Config {
    /// Parse a JSON snapshot, validating every entry.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).map_err(|e| {
            log::warn!("Rejected config snapshot: {}", e);
            CryptError::BadParam(1)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| CryptError::BadData)
    }

    /// Check that every default names an algorithm of the right class and
    /// that the iteration count is in range.
    pub fn validate(&self) -> Result<()> {
        let classes_ok = self.hash_algorithm.class() == AlgorithmClass::Hash
            && self.pkc_algorithm.class() == AlgorithmClass::Pkc
            && self.cipher_algorithm.class() == AlgorithmClass::Cipher;
        if !classes_ok || !iterations_ok(self.kdf_iterations) {
            return Err(CryptError::BadParam(1));
        }
        Ok(())
    }

    pub fn get(&self, option: CryptOption) -> OptionValue {
        match option {
            CryptOption::HashAlgorithm => OptionValue::Algorithm(self.hash_algorithm),
            CryptOption::PkcAlgorithm => OptionValue::Algorithm(self.pkc_algorithm),
            CryptOption::CipherAlgorithm => OptionValue::Algorithm(self.cipher_algorithm),
            CryptOption::CipherMode => OptionValue::Mode(self.cipher_mode),
            CryptOption::KdfIterations => OptionValue::Number(self.kdf_iterations),
            CryptOption::MemoryLock => OptionValue::Flag(self.memory_lock),
            CryptOption::ExportCookies => OptionValue::Flag(self.export_cookies),
        }
    }

    /// Update one entry. A value of the wrong type or outside the entry's
    /// range fails `BadParam(2)` and leaves the table untouched.
    pub fn set(&mut self, option: CryptOption, value: OptionValue) -> Result<()> {
        match (option, value) {
            (CryptOption::HashAlgorithm, OptionValue::Algorithm(algo)) if algo.is_hash() => {
                self.hash_algorithm = algo;
            }
            (CryptOption::PkcAlgorithm, OptionValue::Algorithm(algo)) if algo.is_pkc() => {
                self.pkc_algorithm = algo;
            }
            (CryptOption::CipherAlgorithm, OptionValue::Algorithm(algo))
                if algo.class() == AlgorithmClass::Cipher =>
            {
                self.cipher_algorithm = algo;
            }
            (CryptOption::CipherMode, OptionValue::Mode(mode))
                if !matches!(mode, Mode::None | Mode::Pkc) =>
            {
                self.cipher_mode = mode;
            }
            (CryptOption::KdfIterations, OptionValue::Number(n)) if iterations_ok(n) => {
                self.kdf_iterations = n;
            }
            (CryptOption::MemoryLock, OptionValue::Flag(flag)) => {
                if flag {
                    log::warn!("Memory locking requested but not supported, recording policy only");
                }
                self.memory_lock = flag;
            }
            (CryptOption::ExportCookies, OptionValue::Flag(flag)) => {
                self.export_cookies = flag;
            }
            _ => return Err(CryptError::BadParam(2)),
        }
        log::debug!("Option {:?} set to {:?}", option, value);
        Ok(())
    }
}

fn iterations_ok(n: u32) -> bool {
    (1..=MAX_KDF_ITERATIONS).contains(&n)
}
