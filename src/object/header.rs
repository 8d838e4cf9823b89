//! Generic object header: `[tag][length]`.
//!
//! The length is a definite DER-style length covering every byte after the
//! length field. Short form below 0x80, long form `0x80 | n` followed by `n`
//! big-endian bytes with `n` at most 4. A tag with the high bit set marks a
//! continuation chunk, which is parsed but refused.

use serde::Serialize;

use super::sink::Sink;
use crate::error::{CryptError, Result};

const CONTINUATION_FLAG: u8 = 0x80;
const MAX_LENGTH_OCTETS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    RawData,
    EncryptedData,
    SignedData,
    EncryptedKey,
    PkcEncryptedKey,
    Signature,
    CompressedData,
    NonData,
}

impl ObjectType {
    pub fn tag(self) -> u8 {
        match self {
            ObjectType::RawData => 0x01,
            ObjectType::EncryptedData => 0x02,
            ObjectType::SignedData => 0x03,
            ObjectType::EncryptedKey => 0x04,
            ObjectType::PkcEncryptedKey => 0x05,
            ObjectType::Signature => 0x06,
            ObjectType::CompressedData => 0x07,
            ObjectType::NonData => 0x08,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        if tag & CONTINUATION_FLAG != 0 {
            log::warn!("Continuation object (tag {:#04x}) not supported", tag);
            return Err(CryptError::BadData);
        }
        let object_type = match tag {
            0x01 => ObjectType::RawData,
            0x02 => ObjectType::EncryptedData,
            0x03 => ObjectType::SignedData,
            0x04 => ObjectType::EncryptedKey,
            0x05 => ObjectType::PkcEncryptedKey,
            0x06 => ObjectType::Signature,
            0x07 => ObjectType::CompressedData,
            0x08 => ObjectType::NonData,
            _ => return Err(CryptError::BadData),
        };
        Ok(object_type)
    }
}

/// Size of the encoded length field for `len`.
pub fn length_size(len: usize) -> usize {
    if len < 0x80 {
        1
    } else {
        1 + octets_needed(len)
    }
}

fn octets_needed(len: usize) -> usize {
    let mut n = 0;
    let mut rest = len;
    while rest > 0 {
        n += 1;
        rest >>= 8;
    }
    n
}

pub fn write_length(sink: &mut dyn Sink, len: usize) -> Result<()> {
    if len < 0x80 {
        return sink.write_u8(len as u8);
    }
    let n = octets_needed(len);
    if n > MAX_LENGTH_OCTETS {
        return Err(CryptError::BadParam(3));
    }
    sink.write_u8(0x80 | n as u8)?;
    let bytes = (len as u64).to_be_bytes();
    sink.write(&bytes[8 - n..])
}

/// Write `[tag][length]` for an object whose content (header fields plus
/// payload) is `content_len` bytes.
pub fn write_header(sink: &mut dyn Sink, object_type: ObjectType, content_len: usize) -> Result<()> {
    sink.write_u8(object_type.tag())?;
    write_length(sink, content_len)
}

/// Write a field prefixed by its one-byte length.
pub fn write_short_field(sink: &mut dyn Sink, bytes: &[u8]) -> Result<()> {
    let len = u8::try_from(bytes.len()).map_err(|_| CryptError::BadParam(2))?;
    sink.write_u8(len)?;
    sink.write(bytes)
}

/// Write a field prefixed by a DER-style length.
pub fn write_long_field(sink: &mut dyn Sink, bytes: &[u8]) -> Result<()> {
    write_length(sink, bytes.len())?;
    sink.write(bytes)
}

pub fn short_field_size(len: usize) -> usize {
    1 + len
}

pub fn long_field_size(len: usize) -> usize {
    length_size(len) + len
}

/// Bounds-checked cursor over an encoded object. Running off the end is
/// `BadData`.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.bytes.get(self.pos).ok_or(CryptError::BadData)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CryptError::BadData)?;
        let bytes = self.bytes.get(self.pos..end).ok_or(CryptError::BadData)?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_length(&mut self) -> Result<usize> {
        let first = self.read_u8()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        let n = (first & 0x7F) as usize;
        if n == 0 || n > MAX_LENGTH_OCTETS {
            return Err(CryptError::BadData);
        }
        let octets = self.read_bytes(n)?;
        if octets[0] == 0 {
            // Non-minimal encoding.
            return Err(CryptError::BadData);
        }
        let len = octets.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if len < 0x80 {
            return Err(CryptError::BadData);
        }
        Ok(len)
    }

    pub fn read_short_field(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    pub fn read_long_field(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.read_bytes(len)
    }

    /// Read `[tag][length]`, returning the type and the content length.
    pub fn read_header(&mut self) -> Result<(ObjectType, usize)> {
        let object_type = ObjectType::from_tag(self.read_u8()?)?;
        let len = self.read_length()?;
        Ok((object_type, len))
    }
}
