//! Endianness-aware, bounds-checked reads over a byte source.
//!
//! Every read takes an absolute offset and fails with
//! [`ElfError::OutOfBounds`](crate::ElfError::OutOfBounds) rather than
//! truncating or wrapping.

use crate::error::{ElfError, Result};
use crate::source::ByteSource;
use crate::types::{ElfClass, ElfData, Layout};

/// Reader over a [`ByteSource`] with a resolved [`Layout`].
pub struct Cursor<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    layout: Layout,
}

impl<'a, S: ByteSource + ?Sized> Clone for Cursor<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: ByteSource + ?Sized> Copy for Cursor<'a, S> {}

impl<'a, S: ByteSource + ?Sized> Cursor<'a, S> {
    pub fn new(source: &'a S, layout: Layout) -> Self {
        Self { source, layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> u64 {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<&'a [u8]> {
        self.source.read(offset, len)
    }

    fn read_array<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        let bytes = self.source.read(offset, N as u64)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        let bytes = self.read_array(offset)?;
        Ok(match self.layout.endian {
            ElfData::Little => u16::from_le_bytes(bytes),
            ElfData::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let bytes = self.read_array(offset)?;
        Ok(match self.layout.endian {
            ElfData::Little => u32::from_le_bytes(bytes),
            ElfData::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let bytes = self.read_array(offset)?;
        Ok(match self.layout.endian {
            ElfData::Little => u64::from_le_bytes(bytes),
            ElfData::Big => u64::from_be_bytes(bytes),
        })
    }

    pub fn read_i32(&self, offset: u64) -> Result<i32> {
        self.read_u32(offset).map(|v| v as i32)
    }

    pub fn read_i64(&self, offset: u64) -> Result<i64> {
        self.read_u64(offset).map(|v| v as i64)
    }

    /// Read an address, offset or size whose width follows the class.
    pub fn read_word(&self, offset: u64) -> Result<u64> {
        match self.layout.class {
            ElfClass::Elf32 => self.read_u32(offset).map(u64::from),
            ElfClass::Elf64 => self.read_u64(offset),
        }
    }

    /// Signed class-width read (addends, dynamic tags), sign-extended.
    pub fn read_sword(&self, offset: u64) -> Result<i64> {
        match self.layout.class {
            ElfClass::Elf32 => self.read_i32(offset).map(i64::from),
            ElfClass::Elf64 => self.read_i64(offset),
        }
    }

    /// Bytes from `offset` up to (not including) the next NUL, scanning at
    /// most `max_len` bytes.
    pub fn read_cstring(&self, offset: u64, max_len: u64) -> Result<&'a [u8]> {
        let size = self.source.len();
        let available = size
            .checked_sub(offset)
            .filter(|&n| n > 0)
            .ok_or(ElfError::OutOfBounds {
                offset,
                len: 1,
                size,
            })?;
        let window = self.source.read(offset, available.min(max_len))?;
        match memchr::memchr(0, window) {
            Some(end) => Ok(&window[..end]),
            None => Err(ElfError::UnterminatedString { offset }),
        }
    }
}

/// Align a value up to the specified alignment
pub fn align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        Some(value)
    } else {
        value
            .checked_add(alignment - 1)
            .map(|v| v / alignment * alignment)
    }
}
