//! Object codec.
//!
//! Each call handles exactly one object occurrence. Query and import report
//! where the payload starts and how long it is; walking into nested objects
//! is left to the caller. Export writes only the header; the caller appends
//! the payload.
//!
//! Type-specific header fields:
//!
//! | Type | Fields after `[tag][length]` | Payload |
//! |---|---|---|
//! | RawData, NonData | none | data |
//! | EncryptedData | `cookie_len cookie iv_len iv` | encrypted inner object |
//! | SignedData | `key_id_len key_id hash_algo` | inner object |
//! | Signature | `pkc_algo key_id_len key_id hash_algo len sig` | none |
//! | EncryptedKey | `algo mode key_id_len key_id iv_len iv len data` | none |
//! | PKCEncryptedKey | `pkc_algo key_id_len key_id session_algo session_mode len data` | none |

pub mod header;
pub mod sink;

pub use header::ObjectType;

use serde::Serialize;

use crate::context::ContextHandle;
use crate::engine::Engine;
use crate::error::{CryptError, Result};
use crate::types::{Algorithm, Mode};
use header::{short_field_size, write_header, write_short_field, Reader};
use sink::{run_export, Sink};

/// What a header says about one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub object_type: ObjectType,
    /// Bytes from the tag up to the payload.
    pub header_len: usize,
    /// Zero for the self-contained key and signature objects.
    pub payload_len: usize,
    /// Key cookie (EncryptedData, EncryptedKey). Empty when cookies are not
    /// exported.
    pub cookie: Vec<u8>,
    pub iv: Vec<u8>,
    /// Hash algorithm (SignedData, Signature).
    pub hash_algorithm: Option<Algorithm>,
    /// Wrapping or signing algorithm (Signature, EncryptedKey, PKCEncryptedKey).
    pub algorithm: Option<Algorithm>,
    /// Signer or wrapping key identifier.
    pub key_id: Vec<u8>,
}

impl ObjectInfo {
    fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            header_len: 0,
            payload_len: 0,
            cookie: Vec::new(),
            iv: Vec::new(),
            hash_algorithm: None,
            algorithm: None,
            key_id: Vec::new(),
        }
    }

    pub fn total_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Result of importing one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedObject {
    pub info: ObjectInfo,
    pub payload_offset: usize,
    pub payload_len: usize,
    /// Fresh hash context for SignedData, ready to be fed the payload.
    pub hash_context: Option<ContextHandle>,
}

/// Parse the header of the object at the start of `bytes`.
pub fn query_object(bytes: &[u8]) -> Result<ObjectInfo> {
    let mut reader = Reader::new(bytes);
    let (object_type, content_len) = reader.read_header()?;
    let content_start = reader.position();
    let mut info = ObjectInfo::new(object_type);

    match object_type {
        ObjectType::RawData | ObjectType::NonData => {}
        ObjectType::EncryptedData => {
            info.cookie = reader.read_short_field()?.to_vec();
            info.iv = reader.read_short_field()?.to_vec();
        }
        ObjectType::SignedData => {
            info.key_id = reader.read_short_field()?.to_vec();
            info.hash_algorithm = Some(algorithm_field(reader.read_u8()?)?);
        }
        ObjectType::Signature | ObjectType::PkcEncryptedKey => {
            info.algorithm = Some(algorithm_field(reader.read_u8()?)?);
            info.key_id = reader.read_short_field()?.to_vec();
            if object_type == ObjectType::Signature {
                info.hash_algorithm = Some(algorithm_field(reader.read_u8()?)?);
            }
        }
        ObjectType::EncryptedKey => {
            info.algorithm = Some(algorithm_field(reader.read_u8()?)?);
            Mode::from_id(reader.read_u8()?).map_err(|_| CryptError::BadData)?;
            info.key_id = reader.read_short_field()?.to_vec();
            info.iv = reader.read_short_field()?.to_vec();
        }
        ObjectType::CompressedData => {
            log::warn!("Compressed objects are not supported");
            return Err(CryptError::BadParam(1));
        }
    }

    let fields_len = reader.position() - content_start;
    if fields_len > content_len {
        return Err(CryptError::BadData);
    }
    match object_type {
        ObjectType::Signature | ObjectType::EncryptedKey | ObjectType::PkcEncryptedKey => {
            // Self-contained: the whole content is header.
            info.header_len = content_start + content_len;
            info.payload_len = 0;
        }
        _ => {
            // For SignedData this is total minus header; the inner object is
            // not parsed to find its exact size.
            info.header_len = reader.position();
            info.payload_len = content_len - fields_len;
        }
    }
    Ok(info)
}

fn algorithm_field(id: u8) -> Result<Algorithm> {
    Algorithm::from_id(id).map_err(|_| CryptError::BadData)
}

impl Engine {
    /// Write the header of an object of `object_type` carrying `data_len`
    /// payload bytes. With `out` set to `None` nothing is written and the
    /// header size is returned.
    ///
    /// EncryptedData needs a keyed conventional context; if it has no IV
    /// yet, one is generated and loaded first, on the sizing pass too.
    /// SignedData needs the signer's PKC context for its key ID.
    pub fn export_object(
        &mut self,
        out: Option<&mut [u8]>,
        object_type: ObjectType,
        data_len: usize,
        context: Option<ContextHandle>,
    ) -> Result<usize> {
        match object_type {
            ObjectType::RawData | ObjectType::NonData => run_export(out, |sink| {
                write_header(sink, object_type, data_len)
            }),
            ObjectType::EncryptedData => {
                let handle = context.ok_or(CryptError::BadParam(4))?;
                let export_cookies = self.config.export_cookies;
                let ctx = self.context_mut(handle)?;
                if ctx.capability.is_hash() || ctx.capability.is_pkc() {
                    return Err(CryptError::BadParam(4));
                }
                if !ctx.key_set() {
                    return Err(CryptError::NoKey);
                }
                let mode = ctx.mode();
                if mode.needs_whole_blocks() && data_len % ctx.capability.block_size != 0 {
                    return Err(CryptError::BadParam(3));
                }
                ctx.ensure_iv()?;
                let cookie = match (export_cookies, ctx.cookie()) {
                    (true, Some(cookie)) => cookie.to_vec(),
                    _ => Vec::new(),
                };
                let iv = if mode.needs_iv() {
                    ctx.retrieve_iv()?
                } else {
                    Vec::new()
                };
                let fields_len = short_field_size(cookie.len()) + short_field_size(iv.len());
                run_export(out, |sink| {
                    write_header(sink, object_type, fields_len + data_len)?;
                    write_short_field(sink, &cookie)?;
                    write_short_field(sink, &iv)
                })
            }
            ObjectType::SignedData => {
                let handle = context.ok_or(CryptError::BadParam(4))?;
                let hash_algorithm = self.config.hash_algorithm;
                let ctx = self.context(handle)?;
                if !ctx.capability.is_pkc() {
                    return Err(CryptError::BadParam(4));
                }
                let key_id = ctx.key_id.clone().ok_or(CryptError::NoKey)?;
                let fields_len = 1 + short_field_size(key_id.len());
                run_export(out, |sink| {
                    write_header(sink, object_type, fields_len + data_len)?;
                    write_short_field(sink, &key_id)?;
                    sink.write_u8(hash_algorithm.id())
                })
            }
            // Key and signature objects come from `export_key` and
            // `create_signature`.
            ObjectType::Signature | ObjectType::EncryptedKey | ObjectType::PkcEncryptedKey => {
                Err(CryptError::BadParam(2))
            }
            ObjectType::CompressedData => {
                log::warn!("Compressed objects are not supported");
                Err(CryptError::BadParam(2))
            }
        }
    }

    /// Import the object at the start of `bytes`.
    ///
    /// EncryptedData: the embedded cookie must match `context`'s key
    /// (`WrongKey` otherwise) and the embedded IV is loaded into it. The
    /// payload is left encrypted for the caller to decrypt.
    ///
    /// SignedData: a hash context of the declared algorithm is created and
    /// returned.
    pub fn import_object(&mut self, bytes: &[u8], context: Option<ContextHandle>) -> Result<ImportedObject> {
        let info = query_object(bytes)?;
        if bytes.len() < info.total_len() {
            return Err(CryptError::BadData);
        }

        let mut hash_context = None;
        match info.object_type {
            ObjectType::EncryptedData => {
                let handle = context.ok_or(CryptError::BadParam(2))?;
                let ctx = self.context_mut(handle)?;
                if ctx.capability.is_hash() || ctx.capability.is_pkc() {
                    return Err(CryptError::BadParam(2));
                }
                if !ctx.key_set() {
                    return Err(CryptError::NoKey);
                }
                if !info.cookie.is_empty() {
                    let matches = ctx.cookie().is_some_and(|c| c[..] == info.cookie[..]);
                    if !matches {
                        log::debug!("Key cookie mismatch on EncryptedData import");
                        return Err(CryptError::WrongKey);
                    }
                }
                if ctx.mode().needs_iv() {
                    ctx.load_iv(&info.iv).map_err(|_| CryptError::BadData)?;
                } else if !info.iv.is_empty() {
                    return Err(CryptError::BadData);
                }
            }
            ObjectType::SignedData => {
                let algorithm = info.hash_algorithm.ok_or(CryptError::BadData)?;
                if !algorithm.is_hash() {
                    return Err(CryptError::BadData);
                }
                if !self.registry.algo_available(algorithm) {
                    return Err(CryptError::NoAlgo);
                }
                hash_context = Some(self.create_context(algorithm, Mode::None)?);
            }
            _ => {}
        }

        Ok(ImportedObject {
            payload_offset: info.header_len,
            payload_len: info.payload_len,
            hash_context,
            info,
        })
    }
}
