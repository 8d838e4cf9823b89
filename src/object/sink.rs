//! Output sinks for object export.
//!
//! Every export path writes through a `Sink`. Passing no output buffer runs
//! the same path against `SizingSink`, which only counts, so the size it
//! reports is exactly what a later real export writes.

use crate::error::{CryptError, Result};

pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Bytes written so far.
    fn position(&self) -> usize;

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }
}

/// Counts bytes without storing them.
#[derive(Debug, Default)]
pub struct SizingSink {
    len: usize,
}

impl SizingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for SizingSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.len += bytes.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.len
    }
}

/// Writes into a caller-supplied buffer. Running out of room fails
/// `BadParam(1)`, the output buffer being the first argument of every
/// export call.
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl Sink for SliceSink<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos + bytes.len();
        let dest = self.buf.get_mut(self.pos..end).ok_or(CryptError::BadParam(1))?;
        dest.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn position(&self) -> usize {
        self.pos
    }
}

/// Run `export` against the right sink for `out` and return the byte count.
pub fn run_export<F>(out: Option<&mut [u8]>, mut export: F) -> Result<usize>
where
    F: FnMut(&mut dyn Sink) -> Result<()>,
{
    match out {
        None => {
            let mut sink = SizingSink::new();
            export(&mut sink)?;
            Ok(sink.position())
        }
        Some(buf) => {
            let mut sink = SliceSink::new(buf);
            export(&mut sink)?;
            Ok(sink.position())
        }
    }
}
