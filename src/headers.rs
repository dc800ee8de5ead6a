//! ELF identification and file header parsing

use tracing::debug;

use crate::config::ElfConfig;
use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::source::ByteSource;
use crate::types::*;

/// ELF identification block (`e_ident`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfIdent {
    pub class: ElfClass,
    pub data: ElfData,
    pub version: u8,
    pub osabi: u8,
    pub abiversion: u8,
}

impl ElfIdent {
    pub fn layout(&self) -> Layout {
        Layout::new(self.class, self.data)
    }
}

/// Location and shape of a header table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    pub offset: u64,
    pub entry_size: u64,
    pub count: usize,
}

impl TableDescriptor {
    /// File offset of entry `index`; `None` on arithmetic overflow.
    pub fn entry_offset(&self, index: usize) -> Option<u64> {
        (index as u64)
            .checked_mul(self.entry_size)
            .and_then(|rel| self.offset.checked_add(rel))
    }
}

/// Decoded ELF file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub ident: ElfIdent,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl FileHeader {
    pub fn layout(&self) -> Layout {
        self.ident.layout()
    }

    pub fn class(&self) -> ElfClass {
        self.ident.class
    }

    pub fn endian(&self) -> ElfData {
        self.ident.data
    }

    pub fn file_type(&self) -> ElfType {
        ElfType::from(self.e_type)
    }

    pub fn machine(&self) -> ElfMachine {
        ElfMachine::from(self.e_machine)
    }

    pub fn entry_point(&self) -> u64 {
        self.e_entry
    }

    pub fn program_table(&self) -> TableDescriptor {
        TableDescriptor {
            offset: self.e_phoff,
            entry_size: u64::from(self.e_phentsize),
            count: usize::from(self.e_phnum),
        }
    }

    pub fn section_table(&self) -> TableDescriptor {
        TableDescriptor {
            offset: self.e_shoff,
            entry_size: u64::from(self.e_shentsize),
            count: usize::from(self.e_shnum),
        }
    }
}

/// Parse ELF identification bytes
pub fn parse_ident<S: ByteSource + ?Sized>(source: &S, config: &ElfConfig) -> Result<ElfIdent> {
    let magic = source.read(0, 4)?;
    if magic != ELF_MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(ElfError::BadMagic(found));
    }

    let ident = source.read(0, EI_NIDENT as u64)?;
    let class = ElfClass::from_u8(ident[4])?;
    let data = ElfData::from_u8(ident[5])?;
    let version = ident[6];
    if config.strict_version && version != EV_CURRENT {
        return Err(ElfError::UnsupportedVersion(version));
    }

    Ok(ElfIdent {
        class,
        data,
        version,
        osabi: ident[7],
        abiversion: ident[8],
    })
}

fn check_entry_size(table: TableKind, expected: u64, found: u16) -> Result<()> {
    if u64::from(found) != expected {
        return Err(ElfError::InvalidEntrySize {
            table,
            expected,
            found: u64::from(found),
        });
    }
    Ok(())
}

/// Parse ELF header
///
/// Entry sizes are validated here rather than on first table access, so a
/// malformed header fails fast. An entry size is only checked when its table
/// is non-empty.
pub fn parse_header<S: ByteSource + ?Sized>(source: &S, config: &ElfConfig) -> Result<FileHeader> {
    let ident = parse_ident(source, config)?;
    let class = ident.class;
    let cursor = Cursor::new(source, ident.layout());

    // Whole header must be present before any field is trusted
    cursor.read_bytes(0, class.file_header_size())?;

    let e_type = cursor.read_u16(16)?;
    let e_machine = cursor.read_u16(18)?;
    let e_version = cursor.read_u32(20)?;

    // Word-sized fields shift the tail of the header
    let w = class.word_size();
    let e_entry = cursor.read_word(24)?;
    let e_phoff = cursor.read_word(24 + w)?;
    let e_shoff = cursor.read_word(24 + 2 * w)?;
    let tail = 24 + 3 * w;
    let e_flags = cursor.read_u32(tail)?;
    let e_ehsize = cursor.read_u16(tail + 4)?;
    let e_phentsize = cursor.read_u16(tail + 6)?;
    let e_phnum = cursor.read_u16(tail + 8)?;
    let e_shentsize = cursor.read_u16(tail + 10)?;
    let e_shnum = cursor.read_u16(tail + 12)?;
    let e_shstrndx = cursor.read_u16(tail + 14)?;

    check_entry_size(TableKind::FileHeader, class.file_header_size(), e_ehsize)?;
    if e_phnum > 0 {
        check_entry_size(
            TableKind::ProgramHeaders,
            class.program_header_size(),
            e_phentsize,
        )?;
    }
    if e_shnum > 0 {
        check_entry_size(
            TableKind::SectionHeaders,
            class.section_header_size(),
            e_shentsize,
        )?;
    }

    debug!(
        class = class.bits(),
        little_endian = ident.data.is_little_endian(),
        e_type,
        e_machine,
        e_phnum,
        e_shnum,
        "Decoded ELF file header"
    );

    Ok(FileHeader {
        ident,
        e_type,
        e_machine,
        e_version,
        e_entry,
        e_phoff,
        e_shoff,
        e_flags,
        e_ehsize,
        e_phentsize,
        e_phnum,
        e_shentsize,
        e_shnum,
        e_shstrndx,
    })
}
