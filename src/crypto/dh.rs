//! Diffie-Hellman key agreement over `rsa::BigUint`.
//!
//! Phase 1 (the encrypt slot) turns random private bytes into the public
//! value `g^x mod p` and keeps `x`. Phase 2 (the decrypt slot) turns the
//! peer's public value into the shared secret `y^x mod p`.

use rsa::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::hash;
use crate::error::{CryptError, Result};
use crate::types::Algorithm;

pub const DH_MIN_BITS: usize = 512;
pub const DH_MAX_BITS: usize = 4096;

/// DH domain parameters as big-endian byte strings.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct DhComponents {
    pub p: Vec<u8>,
    pub g: Vec<u8>,
}

pub struct DhKey {
    p: BigUint,
    g: BigUint,
    x: Option<BigUint>,
    modulus_len: usize,
}

impl DhKey {
    pub fn load(components: &DhComponents) -> Result<Self> {
        let p = BigUint::from_bytes_be(&components.p);
        let g = BigUint::from_bytes_be(&components.g);

        let bits = p.bits();
        if !(DH_MIN_BITS..=DH_MAX_BITS).contains(&bits) {
            return Err(CryptError::BadParam(2));
        }
        if g.bits() < 2 || g >= p {
            return Err(CryptError::BadParam(2));
        }

        Ok(Self {
            modulus_len: bits.div_ceil(8),
            p,
            g,
            x: None,
        })
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus_len
    }

    /// Whether phase 1 has run, so a shared secret can be computed.
    pub fn has_private(&self) -> bool {
        self.x.is_some()
    }

    /// Key identifier: SHA-1 over the domain parameters, identical for both
    /// parties of an exchange.
    pub fn key_id(&self) -> Result<Vec<u8>> {
        let p = self.p.to_bytes_be();
        let g = self.g.to_bytes_be();
        let digest = hash::hash_parts(Algorithm::Sha1, &[&p, &g])?;
        Ok(digest.as_bytes().to_vec())
    }

    /// Replace the contents of `buf` (random private bytes) with `g^x mod p`.
    pub fn phase1(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.modulus_len {
            return Err(CryptError::BadParam(2));
        }
        let x = BigUint::from_bytes_be(&buf[1..]);
        if x.bits() < 2 {
            return Err(CryptError::BadParam(2));
        }
        let y = self.g.modpow(&x, &self.p);
        if let Some(old) = self.x.as_mut() {
            old.zeroize();
        }
        self.x = Some(x);
        write_padded(&y, buf);
        Ok(())
    }

    /// Replace the peer's public value in `buf` with the shared secret.
    pub fn phase2(&self, buf: &mut [u8]) -> Result<()> {
        let x = self.x.as_ref().ok_or(CryptError::NoKey)?;
        if buf.len() != self.modulus_len {
            return Err(CryptError::BadParam(2));
        }
        let y = BigUint::from_bytes_be(buf);
        if y.bits() < 2 || y >= self.p {
            return Err(CryptError::BadData);
        }
        let mut secret = y.modpow(x, &self.p);
        write_padded(&secret, buf);
        secret.zeroize();
        Ok(())
    }
}

fn write_padded(value: &BigUint, buf: &mut [u8]) {
    let mut bytes = value.to_bytes_be();
    buf.zeroize();
    let start = buf.len() - bytes.len();
    buf[start..].copy_from_slice(&bytes);
    bytes.zeroize();
}

impl Drop for DhKey {
    fn drop(&mut self) {
        if let Some(x) = self.x.as_mut() {
            x.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::utils::generate_random_bytes;
    use crate::test_keys;

    #[test]
    fn test_both_parties_agree() {
        let mut alice = DhKey::load(&test_keys::dh_params()).unwrap();
        let mut bob = DhKey::load(&test_keys::dh_params()).unwrap();
        let len = alice.modulus_len();

        let mut ya = generate_random_bytes(len).to_vec();
        alice.phase1(&mut ya).unwrap();
        let mut yb = generate_random_bytes(len).to_vec();
        bob.phase1(&mut yb).unwrap();

        let mut alice_secret = yb.clone();
        alice.phase2(&mut alice_secret).unwrap();
        let mut bob_secret = ya.clone();
        bob.phase2(&mut bob_secret).unwrap();

        assert_eq!(alice_secret, bob_secret);
        assert_eq!(alice.key_id().unwrap(), bob.key_id().unwrap());
    }

    #[test]
    fn test_phase2_needs_phase1() {
        let key = DhKey::load(&test_keys::dh_params()).unwrap();
        let mut buf = vec![3u8; key.modulus_len()];
        assert_eq!(key.phase2(&mut buf), Err(CryptError::NoKey));
    }

    #[test]
    fn test_degenerate_peer_value_rejected() {
        let mut key = DhKey::load(&test_keys::dh_params()).unwrap();
        let mut own = generate_random_bytes(key.modulus_len()).to_vec();
        key.phase1(&mut own).unwrap();
        let mut one = vec![0u8; key.modulus_len()];
        *one.last_mut().unwrap() = 1;
        assert_eq!(key.phase2(&mut one), Err(CryptError::BadData));
    }
}
