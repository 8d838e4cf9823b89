//! One-call envelopes built from the object codec.
//!
//! `seal_data` produces `EncryptedData { RawData { data } }` and
//! `sign_data` produces `SignedData { RawData { data } }` followed by a
//! detached `Signature` over the inner object.

use zeroize::Zeroizing;

use crate::context::ContextHandle;
use crate::crypto::generate_random_bytes;
use crate::engine::Engine;
use crate::error::{CryptError, Result};
use crate::object::{query_object, ObjectType};
use crate::types::Mode;

/// Parse a RawData object and return its data bytes. Trailing filler after
/// the object is ignored.
fn raw_payload(inner: &[u8]) -> Result<&[u8]> {
    let info = query_object(inner)?;
    if info.object_type != ObjectType::RawData || info.total_len() > inner.len() {
        return Err(CryptError::BadData);
    }
    Ok(&inner[info.header_len..info.total_len()])
}

impl Engine {
    /// Wrap `data` in a RawData object.
    fn raw_object(&mut self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let header_len = self.export_object(None, ObjectType::RawData, data.len(), None)?;
        let mut object = Zeroizing::new(vec![0u8; header_len]);
        self.export_object(Some(&mut object[..]), ObjectType::RawData, data.len(), None)?;
        object.extend_from_slice(data);
        Ok(object)
    }

    /// Encrypt `data` under the conventional key in `context`.
    ///
    /// Every call loads a fresh IV when the mode uses one. For ECB and CBC
    /// the inner object is followed by zero filler up to a whole block.
    pub fn seal_data(&mut self, context: ContextHandle, data: &[u8]) -> Result<Vec<u8>> {
        let ctx = self.context_mut(context)?;
        if ctx.capability.is_hash() || ctx.capability.is_pkc() {
            return Err(CryptError::BadParam(1));
        }
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        let mode = ctx.mode();
        let block_size = ctx.capability.block_size;
        if mode.needs_iv() {
            let iv = generate_random_bytes(ctx.capability.iv_size);
            ctx.load_iv(&iv)?;
        }

        let mut inner = self.raw_object(data)?;
        if mode.needs_whole_blocks() {
            let padded = inner.len().div_ceil(block_size) * block_size;
            inner.resize(padded, 0);
        }

        let header_len = self.export_object(None, ObjectType::EncryptedData, inner.len(), Some(context))?;
        let mut sealed = vec![0u8; header_len];
        self.export_object(Some(&mut sealed[..]), ObjectType::EncryptedData, inner.len(), Some(context))?;
        self.encrypt(context, &mut inner)?;
        sealed.extend_from_slice(&inner);
        Ok(sealed)
    }

    /// Reverse of `seal_data`. A key that does not match the embedded
    /// cookie fails `WrongKey`.
    pub fn open_data(&mut self, context: ContextHandle, bytes: &[u8]) -> Result<Vec<u8>> {
        let imported = self.import_object(bytes, Some(context))?;
        if imported.info.object_type != ObjectType::EncryptedData {
            return Err(CryptError::BadData);
        }
        let payload = &bytes[imported.payload_offset..imported.payload_offset + imported.payload_len];
        let mut inner = Zeroizing::new(payload.to_vec());
        self.decrypt(context, &mut inner)?;
        Ok(raw_payload(&inner)?.to_vec())
    }

    /// Sign `data` with the private RSA key in `sig_context`, hashing with
    /// the configured default hash algorithm.
    pub fn sign_data(&mut self, sig_context: ContextHandle, data: &[u8]) -> Result<Vec<u8>> {
        let inner = self.raw_object(data)?;
        let header_len = self.export_object(None, ObjectType::SignedData, inner.len(), Some(sig_context))?;
        let mut signed = vec![0u8; header_len];
        self.export_object(Some(&mut signed[..]), ObjectType::SignedData, inner.len(), Some(sig_context))?;
        signed.extend_from_slice(&inner);

        let hash = self.create_context(self.config.hash_algorithm, Mode::None)?;
        let result = self.hash_data(hash, &inner).and_then(|_| {
            let size = self.create_signature(None, sig_context, hash)?;
            let start = signed.len();
            signed.resize(start + size, 0);
            self.create_signature(Some(&mut signed[start..]), sig_context, hash)
        });
        self.destroy_context(hash)?;
        result?;
        Ok(signed)
    }

    /// Check a `sign_data` envelope against the key in `sig_context` and
    /// return the signed data.
    pub fn verify_data(&mut self, sig_context: ContextHandle, bytes: &[u8]) -> Result<Vec<u8>> {
        let imported = self.import_object(bytes, None)?;
        let hash = match (imported.info.object_type, imported.hash_context) {
            (ObjectType::SignedData, Some(hash)) => hash,
            _ => return Err(CryptError::BadData),
        };
        let inner = &bytes[imported.payload_offset..imported.payload_offset + imported.payload_len];
        let signature = &bytes[imported.info.total_len()..];
        let result = self
            .hash_data(hash, inner)
            .and_then(|_| self.check_signature(signature, sig_context, hash));
        self.destroy_context(hash)?;
        result?;
        Ok(raw_payload(inner)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PkcKey;
    use crate::test_keys;
    use crate::types::Algorithm;

    #[test]
    fn test_seal_open_every_mode() {
        let mut engine = Engine::new().unwrap();
        let cases = [
            (Algorithm::Des, Mode::Ecb, 8),
            (Algorithm::TripleDes, Mode::Cbc, 24),
            (Algorithm::Rc2, Mode::Cfb, 16),
            (Algorithm::Blowfish, Mode::Ofb, 20),
            (Algorithm::Aes, Mode::Cbc, 32),
        ];
        for (algorithm, mode, key_len) in cases {
            let ctx = engine.create_context(algorithm, mode).unwrap();
            engine.load_key(ctx, &vec![0x3C; key_len]).unwrap();
            for n in [0usize, 1, 15, 16, 100] {
                let data: Vec<u8> = (0..n).map(|i| i as u8).collect();
                let sealed = engine.seal_data(ctx, &data).unwrap();
                assert_eq!(engine.open_data(ctx, &sealed).unwrap(), data, "{:?} {:?} n={}", algorithm, mode, n);
            }
        }
    }

    #[test]
    fn test_seal_twice_with_one_context() {
        let mut engine = Engine::new().unwrap();
        let ctx = engine.create_context(Algorithm::Aes, Mode::Cbc).unwrap();
        engine.load_key(ctx, &[1u8; 16]).unwrap();
        let first = engine.seal_data(ctx, b"same plaintext").unwrap();
        let second = engine.seal_data(ctx, b"same plaintext").unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.open_data(ctx, &second).unwrap(), b"same plaintext");
        assert_eq!(engine.open_data(ctx, &first).unwrap(), b"same plaintext");
    }

    #[test]
    fn test_open_with_wrong_key() {
        let mut engine = Engine::new().unwrap();
        let ctx = engine.create_context(Algorithm::Blowfish, Mode::Cfb).unwrap();
        let other = engine.create_context(Algorithm::Blowfish, Mode::Cfb).unwrap();
        engine.load_key(ctx, &[1u8; 16]).unwrap();
        engine.load_key(other, &[2u8; 16]).unwrap();
        let sealed = engine.seal_data(ctx, b"secret").unwrap();
        assert_eq!(engine.open_data(other, &sealed), Err(CryptError::WrongKey));
    }

    #[test]
    fn test_sign_verify_envelope() {
        let mut engine = Engine::new().unwrap();
        let signer = engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        engine
            .load_pkc_key(signer, &PkcKey::Rsa(test_keys::rsa_private_a()))
            .unwrap();
        let verifier = engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        engine
            .load_pkc_key(verifier, &PkcKey::Rsa(test_keys::rsa_public_a()))
            .unwrap();
        let live = engine.live_contexts();

        let envelope = engine.sign_data(signer, b"signed payload").unwrap();
        assert_eq!(engine.verify_data(verifier, &envelope).unwrap(), b"signed payload");
        assert_eq!(engine.live_contexts(), live);

        let mut tampered = envelope.clone();
        // First data byte, after the SignedData and RawData headers.
        let at = query_object(&envelope).unwrap().header_len + 2;
        tampered[at] ^= 0x20;
        assert_eq!(engine.verify_data(verifier, &tampered), Err(CryptError::BadSig));
        assert_eq!(engine.live_contexts(), live);
    }
}
