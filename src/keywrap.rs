//! Session-key export and import.
//!
//! Three ways to move a session key:
//! - conventional: a key-info record encrypted under another conventional
//!   key, written as an EncryptedKey object with a fresh IV every time. An
//!   RC4 key does not wrap with its own running keystream: each object
//!   carries a random nonce in the IV field and is encrypted under
//!   SHA-1(key ‖ nonce);
//! - RSA: the key-info record in a PKCS#1 type-2 block under a public key,
//!   written as a PKCEncryptedKey object;
//! - Diffie-Hellman: no key travels. Export contributes a public value, and
//!   import turns the peer's value into a shared secret whose low-order
//!   bytes become the session key.
//!
//! Key-info record: `algo mode control_vector:u32be key_len key cookie_len
//! cookie`, followed by random filler up to a whole block for block modes.

use zeroize::Zeroizing;

use crate::context::{key_cookie, ContextHandle};
use crate::crypto::generate_random_bytes;
use crate::crypto::hash::hash_parts;
use crate::crypto::stream::{StreamState, RC4_KEY_SIZE};
use crate::engine::Engine;
use crate::error::{CryptError, Result};
use crate::object::header::{
    long_field_size, short_field_size, write_header, write_long_field, write_short_field, Reader,
};
use crate::object::sink::{run_export, Sink};
use crate::object::ObjectType;
use crate::pkcs1;
use crate::types::{Algorithm, AlgorithmClass, Mode};

/// Nonce carried in the IV field of an RC4-wrapped key.
const STREAM_NONCE_SIZE: usize = 16;

/// One-object RC4 state for wrapping under `key`.
fn stream_wrapper(key: &[u8], nonce: &[u8]) -> Result<StreamState> {
    let digest = hash_parts(Algorithm::Sha1, &[key, nonce])?;
    StreamState::new(&digest.as_bytes()[..RC4_KEY_SIZE])
}

/// Decoded key-info record.
struct KeyInfo {
    algorithm: Algorithm,
    mode: Mode,
    control_vector: u32,
    key: Zeroizing<Vec<u8>>,
    cookie: Vec<u8>,
}

impl KeyInfo {
    fn encoded_len(&self) -> usize {
        2 + 4 + short_field_size(self.key.len()) + short_field_size(self.cookie.len())
    }

    fn encode(&self, block_size: usize) -> Result<Zeroizing<Vec<u8>>> {
        let len = self.encoded_len();
        let padded = len.div_ceil(block_size) * block_size;
        let mut out = Zeroizing::new(Vec::with_capacity(padded));
        out.push(self.algorithm.id());
        out.push(self.mode.id());
        out.extend_from_slice(&self.control_vector.to_be_bytes());
        out.push(u8::try_from(self.key.len()).map_err(|_| CryptError::BadParam(3))?);
        out.extend_from_slice(&self.key);
        out.push(u8::try_from(self.cookie.len()).map_err(|_| CryptError::BadParam(3))?);
        out.extend_from_slice(&self.cookie);
        out.extend_from_slice(&generate_random_bytes(padded - len));
        Ok(out)
    }

    /// Parse a record, ignoring trailing filler. Garbage from decrypting
    /// under the wrong key lands here as `BadData`.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let algorithm = Algorithm::from_id(reader.read_u8()?).map_err(|_| CryptError::BadData)?;
        let mode = Mode::from_id(reader.read_u8()?).map_err(|_| CryptError::BadData)?;
        if algorithm.class() != AlgorithmClass::Cipher {
            return Err(CryptError::BadData);
        }
        let cv = reader.read_bytes(4)?;
        let control_vector = u32::from_be_bytes([cv[0], cv[1], cv[2], cv[3]]);
        let key = Zeroizing::new(reader.read_short_field()?.to_vec());
        let cookie = reader.read_short_field()?.to_vec();
        Ok(Self {
            algorithm,
            mode,
            control_vector,
            key,
            cookie,
        })
    }
}

/// Fields of an EncryptedKey or PKCEncryptedKey object.
struct WrappedKey<'a> {
    object_type: ObjectType,
    algorithm: Algorithm,
    /// Wrapping mode (EncryptedKey) or session mode (PKCEncryptedKey).
    mode: Mode,
    session_algorithm: Option<Algorithm>,
    key_id: &'a [u8],
    iv: &'a [u8],
    data: &'a [u8],
}

fn parse_wrapped_key(bytes: &[u8]) -> Result<WrappedKey<'_>> {
    let mut reader = Reader::new(bytes);
    let (object_type, content_len) = reader.read_header()?;
    let content_end = reader.position() + content_len;
    let read_algo = |id: u8| Algorithm::from_id(id).map_err(|_| CryptError::BadData);
    let read_mode = |id: u8| Mode::from_id(id).map_err(|_| CryptError::BadData);

    let wrapped = match object_type {
        ObjectType::EncryptedKey => {
            let algorithm = read_algo(reader.read_u8()?)?;
            let mode = read_mode(reader.read_u8()?)?;
            let key_id = reader.read_short_field()?;
            let iv = reader.read_short_field()?;
            let data = reader.read_long_field()?;
            WrappedKey {
                object_type,
                algorithm,
                mode,
                session_algorithm: None,
                key_id,
                iv,
                data,
            }
        }
        ObjectType::PkcEncryptedKey => {
            let algorithm = read_algo(reader.read_u8()?)?;
            let key_id = reader.read_short_field()?;
            let session_algorithm = read_algo(reader.read_u8()?)?;
            let mode = read_mode(reader.read_u8()?)?;
            let data = reader.read_long_field()?;
            WrappedKey {
                object_type,
                algorithm,
                mode,
                session_algorithm: Some(session_algorithm),
                key_id,
                iv: &[],
                data,
            }
        }
        _ => return Err(CryptError::BadData),
    };
    if reader.position() != content_end {
        return Err(CryptError::BadData);
    }
    Ok(wrapped)
}

fn is_conventional(algorithm: Algorithm) -> bool {
    algorithm.class() == AlgorithmClass::Cipher
}

impl Engine {
    /// Export the session key in `session_context` under `export_context`.
    ///
    /// A conventional `export_context` produces an EncryptedKey object, an
    /// RSA one a PKCEncryptedKey object. For Diffie-Hellman the object
    /// carries this side's public value and `session_context` only supplies
    /// the session algorithm and mode. With `out` set to `None` only the
    /// size is computed and no key state changes.
    pub fn export_key(
        &mut self,
        out: Option<&mut [u8]>,
        export_context: ContextHandle,
        session_context: ContextHandle,
    ) -> Result<usize> {
        let export_algorithm = self.context(export_context)?.algorithm();
        match export_algorithm {
            Algorithm::Dh => self.export_dh(out, export_context, session_context),
            Algorithm::Rsa => self.export_rsa(out, export_context, session_context),
            algo if is_conventional(algo) => self.export_conventional(out, export_context, session_context),
            _ => Err(CryptError::BadParam(2)),
        }
    }

    /// Read the session key out of `session_context` as a key-info record.
    fn session_key_info(&self, session_context: ContextHandle) -> Result<KeyInfo> {
        let session = self.context(session_context)?;
        if !is_conventional(session.algorithm()) {
            return Err(CryptError::BadParam(3));
        }
        if !session.key_set() {
            return Err(CryptError::NoKey);
        }
        let cookie = match (self.config.export_cookies, session.cookie()) {
            (true, Some(cookie)) => cookie.to_vec(),
            _ => Vec::new(),
        };
        let mut key = Zeroizing::new(Vec::with_capacity(session.key_bytes().len()));
        key.extend_from_slice(session.key_bytes());
        Ok(KeyInfo {
            algorithm: session.algorithm(),
            mode: session.mode(),
            control_vector: session.control_vector,
            key,
            cookie,
        })
    }

    fn export_conventional(
        &mut self,
        out: Option<&mut [u8]>,
        export_context: ContextHandle,
        session_context: ContextHandle,
    ) -> Result<usize> {
        if export_context == session_context {
            return Err(CryptError::BadParam(3));
        }
        let info = self.session_key_info(session_context)?;
        let ctx = self.context_mut(export_context)?;
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        let mode = ctx.mode();
        let block_size = if mode.needs_whole_blocks() {
            ctx.capability.block_size
        } else {
            1
        };
        let mut record = info.encode(block_size)?;
        let key_id = ctx.key_id.clone().unwrap_or_default();
        let iv_size = match mode {
            Mode::Stream => STREAM_NONCE_SIZE,
            m if m.needs_iv() => ctx.capability.iv_size,
            _ => 0,
        };
        let fields_len = 2
            + short_field_size(key_id.len())
            + short_field_size(iv_size)
            + long_field_size(record.len());
        let algorithm = ctx.algorithm();
        let write = |sink: &mut dyn Sink, iv: &[u8], data: &[u8]| {
            write_header(sink, ObjectType::EncryptedKey, fields_len)?;
            sink.write_u8(algorithm.id())?;
            sink.write_u8(mode.id())?;
            write_short_field(sink, &key_id)?;
            write_short_field(sink, iv)?;
            write_long_field(sink, data)
        };

        match out {
            None => {
                let placeholder = vec![0u8; record.len()];
                let iv = vec![0u8; iv_size];
                run_export(None, |sink| write(sink, &iv, &placeholder))
            }
            Some(buf) => {
                let iv = generate_random_bytes(iv_size);
                if mode == Mode::Stream {
                    stream_wrapper(ctx.key_bytes(), &iv)?.apply(&mut record);
                } else {
                    if mode.needs_iv() {
                        ctx.load_iv(&iv)?;
                    }
                    ctx.encrypt(&mut record)?;
                }
                let written = run_export(Some(buf), |sink| write(sink, &iv, &record))?;
                log::debug!("Exported {:?} key under {}", info.algorithm, ctx.capability.name);
                Ok(written)
            }
        }
    }

    fn export_rsa(
        &mut self,
        out: Option<&mut [u8]>,
        export_context: ContextHandle,
        session_context: ContextHandle,
    ) -> Result<usize> {
        let info = self.session_key_info(session_context)?;
        let ctx = self.context_mut(export_context)?;
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        let modulus_len = ctx.key_size();
        let record = info.encode(1)?;
        if record.len() > pkcs1::max_payload(modulus_len) {
            return Err(CryptError::BadParam(3));
        }
        let key_id = ctx.key_id.clone().unwrap_or_default();
        let fields_len = 1 + short_field_size(key_id.len()) + 2 + long_field_size(modulus_len);
        let write = |sink: &mut dyn Sink, data: &[u8]| {
            write_header(sink, ObjectType::PkcEncryptedKey, fields_len)?;
            sink.write_u8(Algorithm::Rsa.id())?;
            write_short_field(sink, &key_id)?;
            sink.write_u8(info.algorithm.id())?;
            sink.write_u8(info.mode.id())?;
            write_long_field(sink, data)
        };

        match out {
            None => {
                let placeholder = vec![0u8; modulus_len];
                run_export(None, |sink| write(sink, &placeholder))
            }
            Some(buf) => {
                let mut block = pkcs1::pad_encryption(&record, modulus_len)?;
                ctx.state.encrypt(Mode::Pkc, &mut block)?;
                run_export(Some(buf), |sink| write(sink, &block))
            }
        }
    }

    fn export_dh(
        &mut self,
        out: Option<&mut [u8]>,
        export_context: ContextHandle,
        session_context: ContextHandle,
    ) -> Result<usize> {
        let session = self.context(session_context)?;
        if !is_conventional(session.algorithm()) {
            return Err(CryptError::BadParam(3));
        }
        let (session_algorithm, session_mode) = (session.algorithm(), session.mode());

        let ctx = self.context_mut(export_context)?;
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        let modulus_len = ctx.key_size();
        let key_id = ctx.key_id.clone().unwrap_or_default();
        let fields_len = 1 + short_field_size(key_id.len()) + 2 + long_field_size(modulus_len);
        let write = |sink: &mut dyn Sink, data: &[u8]| {
            write_header(sink, ObjectType::PkcEncryptedKey, fields_len)?;
            sink.write_u8(Algorithm::Dh.id())?;
            write_short_field(sink, &key_id)?;
            sink.write_u8(session_algorithm.id())?;
            sink.write_u8(session_mode.id())?;
            write_long_field(sink, data)
        };

        match out {
            None => {
                let placeholder = vec![0u8; modulus_len];
                run_export(None, |sink| write(sink, &placeholder))
            }
            Some(buf) => {
                // Phase 1 turns the random private bytes into g^x mod p.
                let mut value = generate_random_bytes(modulus_len);
                ctx.state.encrypt(Mode::Pkc, &mut value)?;
                run_export(Some(buf), |sink| write(sink, &value))
            }
        }
    }

    /// Import a wrapped session key with `import_context`, returning a new
    /// context holding it.
    ///
    /// The key's control vector is copied onto the new context and its
    /// cookie, when present, must match the imported key (`WrongKey`
    /// otherwise, and the new context is destroyed). An object wrapped for a
    /// different key fails `WrongKey` without any decryption.
    pub fn import_key(&mut self, object: &[u8], import_context: ContextHandle) -> Result<ContextHandle> {
        let wrapped = parse_wrapped_key(object)?;
        let ctx = self.context(import_context)?;
        if ctx.algorithm() != wrapped.algorithm {
            return Err(CryptError::BadParam(2));
        }
        if !ctx.key_set() {
            return Err(CryptError::NoKey);
        }
        if !wrapped.key_id.is_empty() && ctx.key_id.as_deref().is_some_and(|id| id != wrapped.key_id) {
            log::debug!("Wrapped key is for a different key ID");
            return Err(CryptError::WrongKey);
        }

        match (wrapped.object_type, wrapped.algorithm) {
            (ObjectType::EncryptedKey, algo) if is_conventional(algo) => self.import_conventional(&wrapped, import_context),
            (ObjectType::PkcEncryptedKey, Algorithm::Rsa) => self.import_rsa(&wrapped, import_context),
            (ObjectType::PkcEncryptedKey, Algorithm::Dh) => self.import_dh(&wrapped, import_context),
            _ => Err(CryptError::BadData),
        }
    }

    fn import_conventional(&mut self, wrapped: &WrappedKey<'_>, import_context: ContextHandle) -> Result<ContextHandle> {
        let ctx = self.context_mut(import_context)?;
        if ctx.mode() != wrapped.mode {
            return Err(CryptError::BadData);
        }
        let mut record = Zeroizing::new(wrapped.data.to_vec());
        if ctx.mode() == Mode::Stream {
            if wrapped.iv.len() != STREAM_NONCE_SIZE {
                return Err(CryptError::BadData);
            }
            stream_wrapper(ctx.key_bytes(), wrapped.iv)?.apply(&mut record);
        } else {
            if ctx.mode().needs_iv() {
                ctx.load_iv(wrapped.iv).map_err(|_| CryptError::BadData)?;
            }
            ctx.decrypt(&mut record)?;
        }
        let info = KeyInfo::decode(&record)?;
        self.install_session_key(info)
    }

    fn import_rsa(&mut self, wrapped: &WrappedKey<'_>, import_context: ContextHandle) -> Result<ContextHandle> {
        let ctx = self.context_mut(import_context)?;
        if wrapped.data.len() != ctx.key_size() {
            return Err(CryptError::BadData);
        }
        let mut block = Zeroizing::new(wrapped.data.to_vec());
        ctx.state.decrypt(Mode::Pkc, &mut block)?;
        let info = KeyInfo::decode(pkcs1::unpad_encryption(&block)?)?;
        if Some(info.algorithm) != wrapped.session_algorithm || info.mode != wrapped.mode {
            return Err(CryptError::BadData);
        }
        self.install_session_key(info)
    }

    fn import_dh(&mut self, wrapped: &WrappedKey<'_>, import_context: ContextHandle) -> Result<ContextHandle> {
        let session_algorithm = wrapped.session_algorithm.ok_or(CryptError::BadData)?;
        if !is_conventional(session_algorithm) {
            return Err(CryptError::BadData);
        }
        let capability = *self.registry.lookup(session_algorithm, wrapped.mode)?;

        let ctx = self.context_mut(import_context)?;
        let modulus_len = ctx.key_size();
        if wrapped.data.len() != modulus_len {
            return Err(CryptError::BadData);
        }
        let mut secret = Zeroizing::new(wrapped.data.to_vec());
        ctx.state.decrypt(Mode::Pkc, &mut secret)?;

        let key_len = modulus_len.min(capability.max_key_size);
        let info = KeyInfo {
            algorithm: session_algorithm,
            mode: wrapped.mode,
            control_vector: 0,
            key: Zeroizing::new(secret[modulus_len - key_len..].to_vec()),
            cookie: Vec::new(),
        };
        drop(secret);
        self.install_session_key(info)
    }

    /// Create the session context for an unwrapped key and check its cookie.
    fn install_session_key(&mut self, info: KeyInfo) -> Result<ContextHandle> {
        if self.registry.find(info.algorithm, info.mode).is_none() {
            return Err(CryptError::BadData);
        }
        let session = self.create_context(info.algorithm, info.mode)?;
        let checked = self
            .load_key(session, &info.key)
            .map_err(|_| CryptError::BadData)
            .and_then(|()| {
                let expected = key_cookie(info.algorithm, info.mode, &info.key)?;
                if !info.cookie.is_empty() && info.cookie[..] != expected[..] {
                    log::debug!("Key cookie mismatch on key import");
                    return Err(CryptError::WrongKey);
                }
                Ok(())
            });
        if let Err(e) = checked {
            self.destroy_context(session)?;
            return Err(e);
        }
        self.set_control_vector(session, info.control_vector)?;
        Ok(session)
    }
}
