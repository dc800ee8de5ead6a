//! Byte sources the decoder reads from.
//!
//! The decoder only needs two things from its input: the total length and
//! bounds-checked random access. In-memory buffers, `bytes::Bytes` and
//! memory-mapped files all satisfy that contract. [`MappedFile`] maps a file
//! read-only and enforces [`IoLimits`] before handing the bytes out.

use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::IoLimits;
use crate::error::{ElfError, Result};

/// Immutable, randomly addressable bytes of known length.
pub trait ByteSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// Fails with [`ElfError::OutOfBounds`] when `offset + len` exceeds
    /// [`ByteSource::len`]; never truncates.
    fn read(&self, offset: u64, len: u64) -> Result<&[u8]>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn slice_range(data: &[u8], offset: u64, len: u64) -> Result<&[u8]> {
    let size = data.len() as u64;
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= size)
        .ok_or(ElfError::OutOfBounds { offset, len, size })?;
    Ok(&data[offset as usize..end as usize])
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_range(self, offset, len)
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_range(self, offset, len)
    }
}

impl ByteSource for Bytes {
    fn len(&self) -> u64 {
        self.as_ref().len() as u64
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_range(self, offset, len)
    }
}

impl ByteSource for Mmap {
    fn len(&self) -> u64 {
        self.as_ref().len() as u64
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_range(self, offset, len)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        (**self).read(offset, len)
    }
}

/// A read-only memory-mapped file.
pub struct MappedFile {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Opens and maps `path`, rejecting files larger than `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: &IoLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Mapping file for ELF decoding"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(ElfError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file. Concurrent modification
            // of the file on disk is outside the decoder's contract.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl ByteSource for MappedFile {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_range(self.as_slice(), offset, len)
    }
}
