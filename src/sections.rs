//! Section header table

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::error::Result;
use crate::file::ElfFile;
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::types::*;

/// Raw section header fields, widened to 64 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

/// A decoded section header together with its table index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub index: usize,
    pub header: SectionHeader,
}

impl Section {
    pub fn section_type(&self) -> SectionType {
        SectionType::from(self.header.sh_type)
    }

    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_retain(self.header.sh_flags)
    }

    /// Offset of the name in the section-name string table
    pub fn name_offset(&self) -> u32 {
        self.header.sh_name
    }

    pub fn address(&self) -> u64 {
        self.header.sh_addr
    }

    pub fn offset(&self) -> u64 {
        self.header.sh_offset
    }

    pub fn size(&self) -> u64 {
        self.header.sh_size
    }

    /// Index of the linked section (string table for symbols, symbol table
    /// for relocations)
    pub fn link(&self) -> u32 {
        self.header.sh_link
    }

    pub fn info(&self) -> u32 {
        self.header.sh_info
    }

    pub fn alignment(&self) -> u64 {
        self.header.sh_addralign
    }

    pub fn entry_size(&self) -> u64 {
        self.header.sh_entsize
    }

    pub fn is_alloc(&self) -> bool {
        self.flags().contains(SectionFlags::ALLOC)
    }

    pub fn is_executable(&self) -> bool {
        self.flags().contains(SectionFlags::EXECINSTR)
    }

    pub fn is_writable(&self) -> bool {
        self.flags().contains(SectionFlags::WRITE)
    }

    /// Whether the section occupies bytes in the file
    pub fn has_file_data(&self) -> bool {
        !matches!(self.section_type(), SectionType::NoBits | SectionType::Null)
    }

    /// File byte range `[start, end)`, absent for zero-fill sections
    pub fn file_range(&self) -> Option<(u64, u64)> {
        if !self.has_file_data() {
            return None;
        }
        let end = self.header.sh_offset.checked_add(self.header.sh_size)?;
        Some((self.header.sh_offset, end))
    }

    /// Whether an allocated section covers virtual address `addr`
    pub fn contains_addr(&self, addr: u64) -> bool {
        self.is_alloc()
            && addr >= self.header.sh_addr
            && addr - self.header.sh_addr < self.header.sh_size
    }
}

/// Parse a section header at `offset`
pub(crate) fn parse_section_header<S: ByteSource + ?Sized>(
    cursor: &Cursor<'_, S>,
    offset: u64,
) -> Result<SectionHeader> {
    let w = cursor.layout().class.word_size();
    Ok(SectionHeader {
        sh_name: cursor.read_u32(offset)?,
        sh_type: cursor.read_u32(offset + 4)?,
        sh_flags: cursor.read_word(offset + 8)?,
        sh_addr: cursor.read_word(offset + 8 + w)?,
        sh_offset: cursor.read_word(offset + 8 + 2 * w)?,
        sh_size: cursor.read_word(offset + 8 + 3 * w)?,
        sh_link: cursor.read_u32(offset + 8 + 4 * w)?,
        sh_info: cursor.read_u32(offset + 12 + 4 * w)?,
        sh_addralign: cursor.read_word(offset + 16 + 4 * w)?,
        sh_entsize: cursor.read_word(offset + 16 + 5 * w)?,
    })
}

/// View over the section header table of an [`ElfFile`].
///
/// Entries are decoded on first request and cached in the file.
pub struct SectionTable<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
}

impl<'f, S: ByteSource> Clone for SectionTable<'f, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'f, S: ByteSource> Copy for SectionTable<'f, S> {}

impl<'f, S: ByteSource> SectionTable<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>) -> Self {
        Self { file }
    }

    pub fn entry_count(&self) -> usize {
        self.file.cache().sections.count()
    }

    /// Section at `index`
    pub fn entry(&self, index: usize) -> Result<&'f Section> {
        let file = self.file;
        file.cache()
            .sections
            .get_or_try_init(TableKind::SectionHeaders, index, || {
                let table = file.header().section_table();
                let offset = file.check_entry(
                    TableKind::SectionHeaders,
                    index,
                    table.entry_offset(index),
                    file.layout().class.section_header_size(),
                )?;
                let header = parse_section_header(&file.cursor(), offset)?;
                trace!(index, offset, sh_type = header.sh_type, "Decoded section header");
                Ok(Section { index, header })
            })
    }

    /// All sections in table order
    pub fn iter(&self) -> impl Iterator<Item = Result<&'f Section>> + 'f {
        let table = *self;
        (0..self.entry_count()).map(move |i| table.entry(i))
    }

    /// The section-name string table named by `e_shstrndx`
    pub fn names(&self) -> Result<StringTable<'f>> {
        self.file
            .string_table_at(u64::from(self.file.header().e_shstrndx))
    }

    pub fn name(&self, section: &Section) -> Result<&'f str> {
        self.names()?.resolve(u64::from(section.name_offset()))
    }

    /// File bytes of `section`; empty for NOBITS and NULL sections
    pub fn data(&self, section: &Section) -> Result<&'f [u8]> {
        if !section.has_file_data() {
            return Ok(&[]);
        }
        self.file.source().read(section.offset(), section.size())
    }

    /// First section whose name equals `name`.
    ///
    /// Sections whose header or name cannot be decoded are skipped.
    pub fn by_name(&self, name: &str) -> Result<Option<&'f Section>> {
        let names = self.names()?;
        for entry in self.iter() {
            let section = match entry {
                Ok(section) => section,
                Err(err) => {
                    debug!(%err, "Skipping undecodable section header");
                    continue;
                }
            };
            match names.resolve(u64::from(section.name_offset())) {
                Ok(found) if found == name => return Ok(Some(section)),
                Ok(_) => {}
                Err(err) => debug!(index = section.index, %err, "Skipping unnamed section"),
            }
        }
        Ok(None)
    }

    /// First allocated section covering virtual address `addr`
    pub fn by_addr(&self, addr: u64) -> Option<&'f Section> {
        self.iter()
            .filter_map(|entry| entry.ok())
            .find(|section| section.contains_addr(addr))
    }

    /// Sections of the given type, in table order
    pub fn of_type(&self, section_type: SectionType) -> impl Iterator<Item = &'f Section> + 'f {
        self.iter()
            .filter_map(|entry| entry.ok())
            .filter(move |section| section.section_type() == section_type)
    }
}
