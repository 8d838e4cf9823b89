//! Raw RSA primitive over `rsa::BigUint`.
//!
//! Only the bare modular exponentiation lives here. Padding is applied by the
//! signature and key-wrap layers, which call `public_op` (encrypt slot) and
//! `private_op` (decrypt slot) on full modulus-sized blocks.

use rsa::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::hash;
use crate::error::{CryptError, Result};
use crate::types::Algorithm;

/// Smallest accepted modulus, in bits.
pub const RSA_MIN_BITS: usize = 512;

/// Largest accepted modulus, in bits.
pub const RSA_MAX_BITS: usize = 4096;

/// RSA key components as big-endian byte strings.
///
/// A key without `d` is a public key. `p` and `q` are optional and only used
/// to cross-check the modulus.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct RsaComponents {
    pub n: Vec<u8>,
    pub e: Vec<u8>,
    pub d: Option<Vec<u8>>,
    pub p: Option<Vec<u8>>,
    pub q: Option<Vec<u8>>,
}

/// Loaded RSA key.
pub struct RsaKey {
    n: BigUint,
    e: BigUint,
    d: Option<BigUint>,
    modulus_len: usize,
}

impl RsaKey {
    pub fn load(components: &RsaComponents) -> Result<Self> {
        let n = BigUint::from_bytes_be(&components.n);
        let e = BigUint::from_bytes_be(&components.e);

        let bits = n.bits();
        if !(RSA_MIN_BITS..=RSA_MAX_BITS).contains(&bits) {
            return Err(CryptError::BadParam(2));
        }
        if e.bits() < 2 || e >= n {
            return Err(CryptError::BadParam(2));
        }

        let d = match &components.d {
            Some(bytes) => {
                let d = BigUint::from_bytes_be(bytes);
                if d.bits() == 0 || d >= n {
                    return Err(CryptError::BadParam(2));
                }
                Some(d)
            }
            None => None,
        };

        if let (Some(p), Some(q)) = (&components.p, &components.q) {
            let product = BigUint::from_bytes_be(p) * BigUint::from_bytes_be(q);
            if product != n {
                return Err(CryptError::BadParam(2));
            }
        }

        let key = Self {
            modulus_len: bits.div_ceil(8),
            n,
            e,
            d,
        };

        // A private key must invert its own public operation.
        if key.d.is_some() {
            let mut probe = vec![0u8; key.modulus_len];
            probe[key.modulus_len - 1] = 2;
            let encrypted = key.public_op(&probe)?;
            let mut recovered = key.private_op(&encrypted)?;
            let consistent = recovered == probe;
            recovered.zeroize();
            if !consistent {
                return Err(CryptError::BadParam(2));
            }
        }

        Ok(key)
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus_len
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Key identifier: SHA-1 over the public components.
    pub fn key_id(&self) -> Result<Vec<u8>> {
        let n = self.n.to_bytes_be();
        let e = self.e.to_bytes_be();
        let digest = hash::hash_parts(Algorithm::Sha1, &[&n, &e])?;
        Ok(digest.as_bytes().to_vec())
    }

    /// `block^e mod n`.
    pub fn public_op(&self, block: &[u8]) -> Result<Vec<u8>> {
        let m = self.to_int(block)?;
        Ok(self.to_block(&m.modpow(&self.e, &self.n)))
    }

    /// `block^d mod n`. Fails `NoKey` on a public-only key.
    pub fn private_op(&self, block: &[u8]) -> Result<Vec<u8>> {
        let d = self.d.as_ref().ok_or(CryptError::NoKey)?;
        let mut c = self.to_int(block)?;
        let mut m = c.modpow(d, &self.n);
        let out = self.to_block(&m);
        m.zeroize();
        c.zeroize();
        Ok(out)
    }

    fn to_int(&self, block: &[u8]) -> Result<BigUint> {
        if block.len() != self.modulus_len {
            return Err(CryptError::BadParam(2));
        }
        let value = BigUint::from_bytes_be(block);
        if value >= self.n {
            return Err(CryptError::BadData);
        }
        Ok(value)
    }

    /// Left-pad to exactly the modulus length.
    fn to_block(&self, value: &BigUint) -> Vec<u8> {
        let mut bytes = value.to_bytes_be();
        let mut out = vec![0u8; self.modulus_len];
        let start = self.modulus_len - bytes.len();
        out[start..].copy_from_slice(&bytes);
        bytes.zeroize();
        out
    }
}

impl Drop for RsaKey {
    fn drop(&mut self) {
        if let Some(d) = self.d.as_mut() {
            d.zeroize();
        }
    }
}
