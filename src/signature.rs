//! Signature creation and checking.
//!
//! A signature is a PKCS#1 type-1 block around the DER `DigestInfo` of a
//! finished hash, put through the private-key operation (the decrypt slot of
//! the PKC context). Checking runs the public operation (the encrypt slot),
//! strips the block byte for byte and compares the embedded digest with the
//! caller's hash.

use zeroize::Zeroizing;

use crate::context::ContextHandle;
use crate::crypto::MessageDigest;
use crate::engine::Engine;
use crate::error::{CryptError, Result};
use crate::object::header::{long_field_size, short_field_size, write_header, write_long_field, write_short_field, Reader};
use crate::object::sink::{run_export, Sink};
use crate::object::ObjectType;
use crate::pkcs1;
use crate::types::{Algorithm, Mode};

/// Parsed Signature object.
struct SignatureRecord<'a> {
    pkc_algorithm: Algorithm,
    key_id: &'a [u8],
    hash_algorithm: Algorithm,
    signature: &'a [u8],
}

fn parse_signature(bytes: &[u8]) -> Result<SignatureRecord<'_>> {
    let mut reader = Reader::new(bytes);
    let (object_type, content_len) = reader.read_header()?;
    if object_type != ObjectType::Signature {
        return Err(CryptError::BadData);
    }
    let content_end = reader.position() + content_len;
    let pkc_algorithm = Algorithm::from_id(reader.read_u8()?).map_err(|_| CryptError::BadData)?;
    let key_id = reader.read_short_field()?;
    let hash_algorithm = Algorithm::from_id(reader.read_u8()?).map_err(|_| CryptError::BadData)?;
    let signature = reader.read_long_field()?;
    if reader.position() != content_end || !hash_algorithm.is_hash() {
        return Err(CryptError::BadData);
    }
    Ok(SignatureRecord {
        pkc_algorithm,
        key_id,
        hash_algorithm,
        signature,
    })
}

impl Engine {
    /// Finished digest of a hash context.
    fn finished_digest(&self, hash_context: ContextHandle) -> Result<MessageDigest> {
        let ctx = self.context(hash_context)?;
        if !ctx.capability.is_hash() {
            return Err(CryptError::BadParam(3));
        }
        ctx.hash_value()
    }

    /// Sign the finished hash in `hash_context` with the private RSA key in
    /// `sig_context`, writing a Signature object to `out`. With `out` set to
    /// `None` only the object size is computed.
    pub fn create_signature(
        &mut self,
        out: Option<&mut [u8]>,
        sig_context: ContextHandle,
        hash_context: ContextHandle,
    ) -> Result<usize> {
        let digest = self.finished_digest(hash_context)?;
        let ctx = self.context_mut(sig_context)?;
        if ctx.algorithm() != Algorithm::Rsa {
            return Err(CryptError::BadParam(2));
        }
        if !ctx.key_set() || ctx.is_public() {
            return Err(CryptError::NoKey);
        }
        let key_id = ctx.key_id.clone().ok_or(CryptError::NoKey)?;
        let modulus_len = ctx.key_size();
        let digest_info = Zeroizing::new(digest.to_digest_info());
        let mut block = pkcs1::pad_signature(&digest_info, modulus_len)?;

        let fields_len = 1 + short_field_size(key_id.len()) + 1 + long_field_size(modulus_len);
        let write = |sink: &mut dyn Sink, signature: &[u8]| {
            write_header(sink, ObjectType::Signature, fields_len)?;
            sink.write_u8(Algorithm::Rsa.id())?;
            write_short_field(sink, &key_id)?;
            sink.write_u8(digest.algorithm.id())?;
            write_long_field(sink, signature)
        };

        match out {
            None => {
                let placeholder = vec![0u8; modulus_len];
                run_export(None, |sink| write(sink, &placeholder))
            }
            Some(buf) => {
                ctx.state.decrypt(Mode::Pkc, &mut block)?;
                let written = run_export(Some(buf), |sink| write(sink, &block))?;
                log::debug!("Created {}-byte signature", modulus_len);
                Ok(written)
            }
        }
    }

    /// Check a Signature object against the finished hash in `hash_context`
    /// using the RSA key in `sig_context`.
    ///
    /// A signature made by a different key fails `WrongKey`; a malformed
    /// object or block fails `BadData`; a well-formed signature over a
    /// different digest fails `BadSig`.
    pub fn check_signature(
        &mut self,
        signature: &[u8],
        sig_context: ContextHandle,
        hash_context: ContextHandle,
    ) -> Result<()> {
        let digest = self.finished_digest(hash_context)?;
        let record = parse_signature(signature)?;

        let ctx = self.context_mut(sig_context)?;
        if ctx.algorithm() != Algorithm::Rsa {
            return Err(CryptError::BadParam(2));
        }
        if record.pkc_algorithm != Algorithm::Rsa {
            return Err(CryptError::BadData);
        }
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        if ctx.key_id.as_deref() != Some(record.key_id) {
            return Err(CryptError::WrongKey);
        }
        if record.signature.len() != ctx.key_size() {
            return Err(CryptError::BadData);
        }

        let mut block = Zeroizing::new(record.signature.to_vec());
        ctx.state.encrypt(Mode::Pkc, &mut block)?;
        let digest_info = pkcs1::unpad_signature(&block)?;
        let signed = MessageDigest::from_digest_info(digest_info)?;

        if signed.algorithm != record.hash_algorithm
            || signed.algorithm != digest.algorithm
            || signed.as_bytes() != digest.as_bytes()
        {
            log::debug!("Signature digest does not match");
            return Err(CryptError::BadSig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PkcKey;
    use crate::test_keys;

    struct Fixture {
        engine: Engine,
        signer: ContextHandle,
        verifier: ContextHandle,
    }

    fn fixture() -> Fixture {
        let mut engine = Engine::new().unwrap();
        let signer = engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        engine
            .load_pkc_key(signer, &PkcKey::Rsa(test_keys::rsa_private_a()))
            .unwrap();
        let verifier = engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        engine
            .load_pkc_key(verifier, &PkcKey::Rsa(test_keys::rsa_public_a()))
            .unwrap();
        Fixture {
            engine,
            signer,
            verifier,
        }
    }

    fn hash(engine: &mut Engine, algorithm: Algorithm, data: &[u8]) -> ContextHandle {
        let h = engine.create_context(algorithm, Mode::None).unwrap();
        engine.hash_data(h, data).unwrap();
        h
    }

    fn sign(engine: &mut Engine, signer: ContextHandle, hash: ContextHandle) -> Vec<u8> {
        let size = engine.create_signature(None, signer, hash).unwrap();
        let mut buf = vec![0u8; size];
        assert_eq!(engine.create_signature(Some(&mut buf[..]), signer, hash).unwrap(), size);
        buf
    }

    #[test]
    fn test_sign_and_check_abcde() {
        let mut f = fixture();
        let h = hash(&mut f.engine, Algorithm::Sha1, b"abcde");
        let sig = sign(&mut f.engine, f.signer, h);
        f.engine.check_signature(&sig, f.verifier, h).unwrap();
        f.engine.check_signature(&sig, f.signer, h).unwrap();
    }

    #[test]
    fn test_every_algorithm_fits_512_bit_key() {
        let mut f = fixture();
        for algorithm in [
            Algorithm::Md2,
            Algorithm::Md4,
            Algorithm::Md5,
            Algorithm::Sha1,
            Algorithm::Ripemd160,
            Algorithm::Sha256,
        ] {
            let h = hash(&mut f.engine, algorithm, b"message");
            let sig = sign(&mut f.engine, f.signer, h);
            f.engine.check_signature(&sig, f.verifier, h).unwrap();
        }
    }

    #[test]
    fn test_signature_byte_flips_rejected() {
        let mut f = fixture();
        let h = hash(&mut f.engine, Algorithm::Sha1, b"abcde");
        let sig = sign(&mut f.engine, f.signer, h);
        // [tag][len][pkc_algo][key_id_len][key_id]...
        assert_eq!(sig[1] as usize, sig.len() - 2);
        let key_id = 4..4 + sig[3] as usize;
        for i in 0..sig.len() {
            let mut tampered = sig.clone();
            tampered[i] ^= 0x01;
            let result = f.engine.check_signature(&tampered, f.verifier, h);
            if key_id.contains(&i) {
                // Names some other signer.
                assert_eq!(result, Err(CryptError::WrongKey), "flip at {}", i);
            } else {
                assert!(
                    matches!(result, Err(CryptError::BadSig) | Err(CryptError::BadData)),
                    "flip at {} gave {:?}",
                    i,
                    result
                );
            }
        }
    }

    #[test]
    fn test_different_message_is_bad_sig() {
        let mut f = fixture();
        let h = hash(&mut f.engine, Algorithm::Sha1, b"abcde");
        let sig = sign(&mut f.engine, f.signer, h);
        let other = hash(&mut f.engine, Algorithm::Sha1, b"abcdf");
        assert_eq!(f.engine.check_signature(&sig, f.verifier, other), Err(CryptError::BadSig));
        let md5 = hash(&mut f.engine, Algorithm::Md5, b"abcde");
        assert_eq!(f.engine.check_signature(&sig, f.verifier, md5), Err(CryptError::BadSig));
    }

    #[test]
    fn test_other_key_is_wrong_key() {
        let mut f = fixture();
        let h = hash(&mut f.engine, Algorithm::Sha1, b"abcde");
        let sig = sign(&mut f.engine, f.signer, h);
        let other = f.engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        f.engine
            .load_pkc_key(other, &PkcKey::Rsa(test_keys::rsa_public_b()))
            .unwrap();
        assert_eq!(f.engine.check_signature(&sig, other, h), Err(CryptError::WrongKey));
    }

    #[test]
    fn test_preconditions() {
        let mut f = fixture();
        let open = f.engine.create_context(Algorithm::Sha1, Mode::None).unwrap();
        f.engine.encrypt(open, &mut b"abc".to_vec()).unwrap();
        assert_eq!(
            f.engine.create_signature(None, f.signer, open),
            Err(CryptError::Incomplete)
        );
        let h = hash(&mut f.engine, Algorithm::Sha1, b"abc");
        assert_eq!(f.engine.create_signature(None, f.verifier, h), Err(CryptError::NoKey));
        assert_eq!(f.engine.create_signature(None, f.signer, f.signer), Err(CryptError::BadParam(3)));
    }
}
