//! Error taxonomy shared by every layer of the engine.
//!
//! Layers validate their own arguments and pass lower-level errors upward
//! unchanged, narrowing only where they know more (a cookie mismatch turns a
//! generic failure into `WrongKey`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptError {
    /// The Nth argument of the call (1-based) is invalid or out of range.
    #[error("Bad argument, parameter {0}")]
    BadParam(u8),
    #[error("Object not initialised")]
    NotInited,
    #[error("Object already initialised")]
    Inited,
    #[error("Algorithm not available")]
    NoAlgo,
    #[error("Encryption mode not available")]
    NoMode,
    #[error("Algorithm failed its self-test")]
    SelfTest,
    #[error("Key not loaded")]
    NoKey,
    #[error("IV not loaded")]
    NoIV,
    #[error("Wrong key for this object")]
    WrongKey,
    #[error("Bad or malformed data")]
    BadData,
    #[error("Signature did not verify")]
    BadSig,
    #[error("Out of memory")]
    NoMem,
    #[error("{0} context(s) still allocated")]
    Orphan(usize),
    #[error("Invalid context handle")]
    InvalidHandle,
    #[error("Hash operation already completed")]
    Complete,
    #[error("Hash operation not completed")]
    Incomplete,
}

/// Alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptError>;
