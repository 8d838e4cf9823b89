//! Capability registry.
//!
//! One immutable descriptor per (algorithm, mode) pair, built once per
//! process. Self-tests run once per algorithm during the build and the result
//! is stamped onto every descriptor of that algorithm; a failed algorithm
//! stays listed but refuses context creation.

pub mod selftest;

use std::sync::{Arc, OnceLock};

use crate::crypto::rsa::{RSA_MAX_BITS, RSA_MIN_BITS};
use crate::crypto::stream::RC4_KEY_SIZE;
use crate::error::{CryptError, Result};
use crate::types::{Algorithm, Mode};

/// Immutable description of one (algorithm, mode) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub algorithm: Algorithm,
    pub mode: Mode,
    pub name: &'static str,
    /// Block size in bytes (1 for stream ciphers, digest size for hashes).
    pub block_size: usize,
    pub min_key_size: usize,
    pub key_size: usize,
    pub max_key_size: usize,
    pub min_iv_size: usize,
    pub iv_size: usize,
    pub max_iv_size: usize,
    /// Relative speed, higher is faster.
    pub speed: u8,
    pub self_test_ok: bool,
}

impl Capability {
    /// Whether the algorithm accepts extended init parameters.
    pub fn has_extended_init(&self) -> bool {
        self.algorithm == Algorithm::Rc2
    }

    /// Key-size check. Ciphers with a key schedule that only accepts some
    /// lengths inside their range answer the tighter question here.
    pub fn key_size_ok(&self, len: usize) -> bool {
        match self.algorithm {
            Algorithm::TripleDes => len == 16 || len == 24,
            Algorithm::Aes => matches!(len, 16 | 24 | 32),
            _ => (self.min_key_size..=self.max_key_size).contains(&len),
        }
    }

    pub fn is_hash(&self) -> bool {
        self.algorithm.is_hash()
    }

    pub fn is_pkc(&self) -> bool {
        self.algorithm.is_pkc()
    }
}

fn descriptor(
    algorithm: Algorithm,
    mode: Mode,
    name: &'static str,
    block_size: usize,
    keys: (usize, usize, usize),
    speed: u8,
) -> Capability {
    let (min_iv_size, iv_size, max_iv_size) = if mode.needs_iv() {
        (block_size, block_size, block_size)
    } else {
        (0, 0, 0)
    };
    Capability {
        algorithm,
        mode,
        name,
        block_size,
        min_key_size: keys.0,
        key_size: keys.1,
        max_key_size: keys.2,
        min_iv_size,
        iv_size,
        max_iv_size,
        speed,
        self_test_ok: false,
    }
}

/// The built-in descriptor table, self-test results not yet filled in.
fn builtin_capabilities() -> Vec<Capability> {
    let block_ciphers: [(Algorithm, &'static str, usize, (usize, usize, usize), u8); 6] = [
        (Algorithm::Des, "DES", 8, (8, 8, 8), 60),
        (Algorithm::TripleDes, "3DES", 8, (16, 24, 24), 20),
        (Algorithm::Idea, "IDEA", 8, (16, 16, 16), 50),
        (Algorithm::Rc2, "RC2", 8, (1, 16, 128), 60),
        (Algorithm::Blowfish, "Blowfish", 8, (4, 16, 56), 90),
        (Algorithm::Aes, "AES", 16, (16, 16, 32), 110),
    ];

    let mut caps = Vec::new();
    for (algorithm, name, block_size, keys, speed) in block_ciphers {
        for mode in [Mode::Ecb, Mode::Cbc, Mode::Cfb, Mode::Ofb] {
            caps.push(descriptor(algorithm, mode, name, block_size, keys, speed));
        }
    }

    caps.push(descriptor(
        Algorithm::Rc4,
        Mode::Stream,
        "RC4",
        1,
        (RC4_KEY_SIZE, RC4_KEY_SIZE, RC4_KEY_SIZE),
        200,
    ));

    let hashes: [(Algorithm, &'static str, usize, u8); 6] = [
        (Algorithm::Md2, "MD2", 16, 10),
        (Algorithm::Md4, "MD4", 16, 200),
        (Algorithm::Md5, "MD5", 16, 150),
        (Algorithm::Sha1, "SHA", 20, 100),
        (Algorithm::Ripemd160, "RIPEMD-160", 20, 80),
        (Algorithm::Sha256, "SHA-256", 32, 70),
    ];
    for (algorithm, name, size, speed) in hashes {
        caps.push(descriptor(algorithm, Mode::None, name, size, (0, 0, 0), speed));
    }

    let pkc_keys = (RSA_MIN_BITS / 8, 128, RSA_MAX_BITS / 8);
    caps.push(descriptor(Algorithm::Dh, Mode::Pkc, "Diffie-Hellman", 0, pkc_keys, 2));
    caps.push(descriptor(Algorithm::Rsa, Mode::Pkc, "RSA", 0, pkc_keys, 2));
    caps
}

/// The process-wide set of capabilities.
#[derive(Debug)]
pub struct Registry {
    capabilities: Vec<Capability>,
}

impl Registry {
    /// Build the built-in table and run every algorithm's self-test.
    pub fn new() -> Self {
        Self::build(builtin_capabilities(), selftest::run)
    }

    /// Built-in table with a caller-supplied self-test.
    #[cfg(test)]
    pub(crate) fn build_with(self_test: impl Fn(Algorithm) -> bool) -> Self {
        Self::build(builtin_capabilities(), self_test)
    }

    /// Run `self_test` once per distinct algorithm and copy the result onto
    /// every descriptor sharing that algorithm.
    pub(crate) fn build(mut capabilities: Vec<Capability>, self_test: impl Fn(Algorithm) -> bool) -> Self {
        let mut tested: Vec<(Algorithm, bool)> = Vec::new();
        for cap in capabilities.iter_mut() {
            let passed = match tested.iter().find(|(algo, _)| *algo == cap.algorithm) {
                Some(&(_, passed)) => passed,
                None => {
                    let passed = self_test(cap.algorithm);
                    if passed {
                        log::debug!("Self-test passed for {}", cap.name);
                    } else {
                        log::warn!("Self-test failed for {}, algorithm disabled", cap.name);
                    }
                    tested.push((cap.algorithm, passed));
                    passed
                }
            };
            cap.self_test_ok = passed;
        }
        Self { capabilities }
    }

    /// Find the descriptor for (algorithm, mode). `Mode::None` matches the
    /// first descriptor registered for the algorithm.
    pub fn find(&self, algorithm: Algorithm, mode: Mode) -> Option<&Capability> {
        self.capabilities
            .iter()
            .find(|cap| cap.algorithm == algorithm && (mode == Mode::None || cap.mode == mode))
    }

    /// Like `find`, but reports which half of the lookup failed.
    pub fn lookup(&self, algorithm: Algorithm, mode: Mode) -> Result<&Capability> {
        if !self.algo_available(algorithm) {
            return Err(CryptError::NoAlgo);
        }
        self.find(algorithm, mode).ok_or(CryptError::NoMode)
    }

    pub fn algo_available(&self, algorithm: Algorithm) -> bool {
        self.find(algorithm, Mode::None).is_some()
    }

    pub fn mode_available(&self, algorithm: Algorithm, mode: Mode) -> bool {
        self.capabilities
            .iter()
            .any(|cap| cap.algorithm == algorithm && cap.mode == mode)
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

/// Build the process-wide registry. A second call does nothing and reports
/// `Inited`.
pub fn init() -> Result<()> {
    let mut built = false;
    REGISTRY.get_or_init(|| {
        built = true;
        let registry = Registry::new();
        log::info!(
            "Capability registry initialised ({} capabilities)",
            registry.capabilities.len()
        );
        Arc::new(registry)
    });
    if built {
        Ok(())
    } else {
        Err(CryptError::Inited)
    }
}

/// The process-wide registry, if `init` has run.
pub fn registry() -> Result<Arc<Registry>> {
    REGISTRY.get().cloned().ok_or(CryptError::NotInited)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_descriptor_per_pair() {
        let caps = builtin_capabilities();
        for (i, a) in caps.iter().enumerate() {
            for b in &caps[i + 1..] {
                assert!(
                    !(a.algorithm == b.algorithm && a.mode == b.mode),
                    "duplicate {:?}/{:?}",
                    a.algorithm,
                    a.mode
                );
            }
        }
        for algo in Algorithm::ALL {
            assert!(caps.iter().any(|c| c.algorithm == algo), "{:?} missing", algo);
        }
    }

    #[test]
    fn test_mode_none_is_wildcard() {
        let registry = Registry::build(builtin_capabilities(), |_| true);
        let cap = registry.find(Algorithm::Blowfish, Mode::None).unwrap();
        assert_eq!(cap.algorithm, Algorithm::Blowfish);
        assert_eq!(registry.find(Algorithm::Blowfish, Mode::Ofb).unwrap().mode, Mode::Ofb);
        assert!(registry.find(Algorithm::Rc4, Mode::Cbc).is_none());
        assert!(registry.mode_available(Algorithm::Sha1, Mode::None));
        assert!(!registry.mode_available(Algorithm::Sha1, Mode::Cbc));
        assert_eq!(registry.lookup(Algorithm::Rc4, Mode::Cbc), Err(CryptError::NoMode));
    }

    #[test]
    fn test_self_test_runs_once_per_algorithm() {
        let calls = std::cell::RefCell::new(Vec::new());
        let registry = Registry::build(builtin_capabilities(), |algo| {
            calls.borrow_mut().push(algo);
            algo != Algorithm::Idea
        });
        let calls = calls.into_inner();
        assert_eq!(calls.len(), Algorithm::ALL.len());
        for cap in registry.capabilities() {
            assert_eq!(cap.self_test_ok, cap.algorithm != Algorithm::Idea);
        }
    }

    #[test]
    fn test_key_size_checks() {
        let registry = Registry::build(builtin_capabilities(), |_| true);
        let aes = registry.find(Algorithm::Aes, Mode::Cbc).unwrap();
        assert!(aes.key_size_ok(24));
        assert!(!aes.key_size_ok(20));
        let bf = registry.find(Algorithm::Blowfish, Mode::Cfb).unwrap();
        assert!(bf.key_size_ok(4) && bf.key_size_ok(56));
        assert!(!bf.key_size_ok(57));
        let tdes = registry.find(Algorithm::TripleDes, Mode::Ecb).unwrap();
        assert!(!tdes.key_size_ok(20));
    }

    #[test]
    fn test_repeated_init_reports_inited() {
        let _ = init();
        assert_eq!(init(), Err(CryptError::Inited));
        assert!(registry().is_ok());
    }
}
