//! Error types for ELF decoding.
//!
//! Every decode operation returns [`Result`]. Structural problems found in the
//! identification block or file header make the whole file unusable; problems
//! found in a single table entry, symbol, relocation or note are reported only
//! when that entity is requested.

use thiserror::Error;

use crate::types::{SectionType, TableKind};

/// Main error type for ELF decoding.
#[derive(Debug, Error)]
pub enum ElfError {
    /// A read would run past the end of the byte source
    #[error("read of {len} bytes at offset {offset:#x} exceeds source size {size:#x}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("bad ELF magic: {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unsupported ELF class: {0}")]
    UnsupportedClass(u8),

    #[error("unsupported ELF data encoding: {0}")]
    UnsupportedEncoding(u8),

    #[error("unsupported ELF version: {0}")]
    UnsupportedVersion(u8),

    /// Declared entry size disagrees with the size fixed by the class width
    #[error("invalid {table} entry size: expected {expected}, found {found}")]
    InvalidEntrySize {
        table: TableKind,
        expected: u64,
        found: u64,
    },

    /// A table entry whose bytes are not fully backed by the source
    #[error("truncated {table} entry {index} at offset {offset:#x}")]
    TruncatedEntry {
        table: TableKind,
        index: usize,
        offset: u64,
    },

    /// A note record whose declared lengths run past its container
    #[error("truncated note {index} at offset {offset:#x}")]
    TruncatedNote { index: usize, offset: u64 },

    #[error("{table} index {index} out of range (count {count})")]
    IndexOutOfRange {
        table: TableKind,
        index: usize,
        count: usize,
    },

    /// The string table needed for name resolution cannot be located
    #[error("missing string table (section index {index})")]
    MissingStringTable { index: u64 },

    #[error("unterminated string at offset {offset:#x}")]
    UnterminatedString { offset: u64 },

    #[error("string at offset {offset:#x} is not valid UTF-8")]
    InvalidString { offset: u64 },

    #[error("section {index} has type {found}, expected {expected}")]
    WrongSectionType {
        index: usize,
        expected: &'static str,
        found: SectionType,
    },

    /// Virtual address not covered by file-backed bytes of any LOAD segment
    #[error("virtual address {0:#x} is not backed by file data")]
    UnmappedAddress(u64),

    #[error("file size of {found} bytes exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { limit: u64, found: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ELF decoding
pub type Result<T> = std::result::Result<T, ElfError>;
