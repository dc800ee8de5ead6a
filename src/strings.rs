//! String table resolution

use crate::error::{ElfError, Result};

/// A blob of NUL-terminated strings addressed by byte offset.
///
/// Offset 0 conventionally holds an empty string; the resolver does not
/// special-case it.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
    /// File offset of `data`, used for error context
    base: u64,
    max_len: usize,
}

impl<'a> StringTable<'a> {
    pub fn new(data: &'a [u8], base: u64, max_len: usize) -> Self {
        Self {
            data,
            base,
            max_len,
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of the string at `offset`, without the terminator.
    pub fn resolve_bytes(&self, offset: u64) -> Result<&'a [u8]> {
        let unterminated = ElfError::UnterminatedString {
            offset: self.base.saturating_add(offset),
        };
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.data.len() => start,
            _ => return Err(unterminated),
        };
        let end = start.saturating_add(self.max_len).min(self.data.len());
        let window = &self.data[start..end];
        match memchr::memchr(0, window) {
            Some(nul) => Ok(&window[..nul]),
            None => Err(unterminated),
        }
    }

    /// String at `offset` as UTF-8.
    pub fn resolve(&self, offset: u64) -> Result<&'a str> {
        let bytes = self.resolve_bytes(offset)?;
        std::str::from_utf8(bytes).map_err(|_| ElfError::InvalidString {
            offset: self.base.saturating_add(offset),
        })
    }
}
