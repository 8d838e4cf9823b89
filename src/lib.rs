//! CipherBox crypt engine.
//!
//! A handle-based cryptographic services library: conventional ciphers,
//! hashes, RSA and Diffie-Hellman behind one `Engine`, plus a
//! self-describing object format for encrypted data, signatures and wrapped
//! session keys.

pub mod capability;
pub mod config;
pub mod context;
pub mod crypto;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keywrap;
pub mod object;
pub mod pkcs1;
pub mod signature;
pub mod types;

#[cfg(test)]
mod test_keys;
#[cfg(test)]
mod tests;

// Re-export the public surface for convenience
pub use capability::{Capability, Registry};
pub use config::{Config, CryptOption, OptionValue};
pub use context::{ContextHandle, ContextInfo, KdfInfo};
pub use crypto::{DhComponents, ExtendedParams, MessageDigest, PkcKey, RsaComponents};
pub use engine::Engine;
pub use error::{CryptError, Result};
pub use object::{query_object, ImportedObject, ObjectInfo, ObjectType};
pub use types::{Algorithm, AlgorithmClass, Mode};
