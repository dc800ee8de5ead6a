//! Program header table

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::file::ElfFile;
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::types::*;

/// Raw program header fields, widened to 64 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

/// A decoded program header together with its table index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub header: ProgramHeader,
}

impl Segment {
    pub fn segment_type(&self) -> SegmentType {
        SegmentType::from(self.header.p_type)
    }

    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.header.p_flags)
    }

    pub fn offset(&self) -> u64 {
        self.header.p_offset
    }

    pub fn vaddr(&self) -> u64 {
        self.header.p_vaddr
    }

    pub fn paddr(&self) -> u64 {
        self.header.p_paddr
    }

    pub fn file_size(&self) -> u64 {
        self.header.p_filesz
    }

    pub fn mem_size(&self) -> u64 {
        self.header.p_memsz
    }

    pub fn alignment(&self) -> u64 {
        self.header.p_align
    }

    pub fn is_load(&self) -> bool {
        self.header.p_type == PT_LOAD
    }

    pub fn is_readable(&self) -> bool {
        self.flags().contains(SegmentFlags::R)
    }

    pub fn is_writable(&self) -> bool {
        self.flags().contains(SegmentFlags::W)
    }

    pub fn is_executable(&self) -> bool {
        self.flags().contains(SegmentFlags::X)
    }

    /// Whether `[p_vaddr, p_vaddr + p_memsz)` covers `addr`
    pub fn contains_vaddr(&self, addr: u64) -> bool {
        addr >= self.header.p_vaddr && addr - self.header.p_vaddr < self.header.p_memsz
    }

    /// File byte range `[start, end)` of the segment image
    pub fn file_range(&self) -> Option<(u64, u64)> {
        let end = self.header.p_offset.checked_add(self.header.p_filesz)?;
        Some((self.header.p_offset, end))
    }

    /// File offset backing `addr`, if the address lies in the file image
    pub fn file_offset_of(&self, addr: u64) -> Option<u64> {
        if !self.contains_vaddr(addr) {
            return None;
        }
        let rel = addr - self.header.p_vaddr;
        if rel >= self.header.p_filesz {
            return None;
        }
        self.header.p_offset.checked_add(rel)
    }
}

/// Parse a program header at `offset`
pub(crate) fn parse_program_header<S: ByteSource + ?Sized>(
    cursor: &Cursor<'_, S>,
    offset: u64,
) -> Result<ProgramHeader> {
    match cursor.layout().class {
        ElfClass::Elf32 => Ok(ProgramHeader {
            p_type: cursor.read_u32(offset)?,
            p_offset: cursor.read_word(offset + 4)?,
            p_vaddr: cursor.read_word(offset + 8)?,
            p_paddr: cursor.read_word(offset + 12)?,
            p_filesz: cursor.read_word(offset + 16)?,
            p_memsz: cursor.read_word(offset + 20)?,
            p_flags: cursor.read_u32(offset + 24)?,
            p_align: cursor.read_word(offset + 28)?,
        }),
        // 64-bit moves p_flags up to keep the words aligned
        ElfClass::Elf64 => Ok(ProgramHeader {
            p_type: cursor.read_u32(offset)?,
            p_flags: cursor.read_u32(offset + 4)?,
            p_offset: cursor.read_word(offset + 8)?,
            p_vaddr: cursor.read_word(offset + 16)?,
            p_paddr: cursor.read_word(offset + 24)?,
            p_filesz: cursor.read_word(offset + 32)?,
            p_memsz: cursor.read_word(offset + 40)?,
            p_align: cursor.read_word(offset + 48)?,
        }),
    }
}

/// View over the program header table of an [`ElfFile`]
pub struct SegmentTable<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
}

impl<'f, S: ByteSource> Clone for SegmentTable<'f, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'f, S: ByteSource> Copy for SegmentTable<'f, S> {}

impl<'f, S: ByteSource> SegmentTable<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>) -> Self {
        Self { file }
    }

    pub fn entry_count(&self) -> usize {
        self.file.cache().segments.count()
    }

    /// Segment at `index`
    pub fn entry(&self, index: usize) -> Result<&'f Segment> {
        let file = self.file;
        file.cache()
            .segments
            .get_or_try_init(TableKind::ProgramHeaders, index, || {
                let table = file.header().program_table();
                let offset = file.check_entry(
                    TableKind::ProgramHeaders,
                    index,
                    table.entry_offset(index),
                    file.layout().class.program_header_size(),
                )?;
                let header = parse_program_header(&file.cursor(), offset)?;
                trace!(index, offset, p_type = header.p_type, "Decoded program header");
                Ok(Segment { index, header })
            })
    }

    /// All segments in table order
    pub fn iter(&self) -> impl Iterator<Item = Result<&'f Segment>> + 'f {
        let table = *self;
        (0..self.entry_count()).map(move |i| table.entry(i))
    }

    fn decoded(&self) -> impl Iterator<Item = &'f Segment> + 'f {
        self.iter().filter_map(|entry| match entry {
            Ok(segment) => Some(segment),
            Err(err) => {
                debug!(%err, "Skipping undecodable program header");
                None
            }
        })
    }

    /// First segment of the given type
    pub fn by_type(&self, segment_type: SegmentType) -> Option<&'f Segment> {
        self.decoded()
            .find(|segment| segment.segment_type() == segment_type)
    }

    /// Get all LOAD segments
    pub fn load_segments(&self) -> impl Iterator<Item = &'f Segment> + 'f {
        self.decoded().filter(|segment| segment.is_load())
    }

    /// Find segment containing virtual address
    pub fn segment_at_vaddr(&self, vaddr: u64) -> Option<&'f Segment> {
        self.decoded().find(|segment| segment.contains_vaddr(vaddr))
    }

    /// Convert virtual address to file offset through the LOAD segments
    pub fn vaddr_to_offset(&self, vaddr: u64) -> Result<u64> {
        self.load_segments()
            .find(|segment| segment.contains_vaddr(vaddr))
            .and_then(|segment| segment.file_offset_of(vaddr))
            .ok_or(ElfError::UnmappedAddress(vaddr))
    }

    /// File bytes of `segment` (`p_filesz` bytes at `p_offset`)
    pub fn data(&self, segment: &Segment) -> Result<&'f [u8]> {
        self.file
            .source()
            .read(segment.offset(), segment.file_size())
    }

    /// Get interpreter path
    pub fn interpreter(&self) -> Result<Option<&'f str>> {
        let Some(segment) = self.by_type(SegmentType::Interp) else {
            return Ok(None);
        };
        let data = self.data(segment)?;
        let strings = StringTable::new(data, segment.offset(), self.file.config().max_string_len);
        strings.resolve(0).map(Some)
    }
}
