//! Algorithm and mode identifiers.
//!
//! The numeric values are the ones written into wire objects, so they must
//! never be renumbered.

use serde::{Deserialize, Serialize};

use crate::error::{CryptError, Result};

/// Broad class an algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmClass {
    Cipher,
    Hash,
    Pkc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Algorithm {
    Des = 1,
    TripleDes = 2,
    Idea = 3,
    Rc2 = 4,
    Rc4 = 5,
    Blowfish = 6,
    Aes = 7,
    Md2 = 100,
    Md4 = 101,
    Md5 = 102,
    Sha1 = 103,
    Ripemd160 = 104,
    Sha256 = 105,
    Dh = 200,
    Rsa = 201,
}

impl Algorithm {
    pub const ALL: [Algorithm; 15] = [
        Algorithm::Des,
        Algorithm::TripleDes,
        Algorithm::Idea,
        Algorithm::Rc2,
        Algorithm::Rc4,
        Algorithm::Blowfish,
        Algorithm::Aes,
        Algorithm::Md2,
        Algorithm::Md4,
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Ripemd160,
        Algorithm::Sha256,
        Algorithm::Dh,
        Algorithm::Rsa,
    ];

    pub fn class(self) -> AlgorithmClass {
        match self {
            Algorithm::Des
            | Algorithm::TripleDes
            | Algorithm::Idea
            | Algorithm::Rc2
            | Algorithm::Rc4
            | Algorithm::Blowfish
            | Algorithm::Aes => AlgorithmClass::Cipher,
            Algorithm::Md2
            | Algorithm::Md4
            | Algorithm::Md5
            | Algorithm::Sha1
            | Algorithm::Ripemd160
            | Algorithm::Sha256 => AlgorithmClass::Hash,
            Algorithm::Dh | Algorithm::Rsa => AlgorithmClass::Pkc,
        }
    }

    pub fn is_hash(self) -> bool {
        self.class() == AlgorithmClass::Hash
    }

    pub fn is_pkc(self) -> bool {
        self.class() == AlgorithmClass::Pkc
    }

    /// Wire identifier.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|algo| algo.id() == id)
            .ok_or(CryptError::NoAlgo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    /// No mode: hash algorithms, and the wildcard in capability lookups.
    None = 0,
    Ecb = 1,
    Cbc = 2,
    Cfb = 3,
    Ofb = 4,
    Stream = 5,
    Pkc = 6,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::None,
        Mode::Ecb,
        Mode::Cbc,
        Mode::Cfb,
        Mode::Ofb,
        Mode::Stream,
        Mode::Pkc,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.id() == id)
            .ok_or(CryptError::NoMode)
    }

    /// Whether this mode keeps an IV / feedback register.
    pub fn needs_iv(self) -> bool {
        matches!(self, Mode::Cbc | Mode::Cfb | Mode::Ofb)
    }

    /// Whether data must be submitted in whole blocks.
    pub fn needs_whole_blocks(self) -> bool {
        matches!(self, Mode::Ecb | Mode::Cbc)
    }
}
