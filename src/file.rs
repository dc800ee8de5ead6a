//! The top-level ELF file view.
//!
//! [`ElfFile`] binds a [`ByteSource`], decodes the file header eagerly and
//! everything else on demand. Decoded section and program headers and dynamic
//! entries are cached for the lifetime of the view; symbols, relocations and
//! notes are cheap fixed-size decodes and are re-derived on each request.

use tracing::debug;

use crate::cache::FileCache;
use crate::config::ElfConfig;
use crate::cursor::Cursor;
use crate::dynamic::DynamicSection;
use crate::error::{ElfError, Result};
use crate::hash::{GnuHashTable, SysvHashTable};
use crate::headers::{parse_header, FileHeader, TableDescriptor};
use crate::notes::NoteIter;
use crate::relocations::RelocationSection;
use crate::sections::{Section, SectionTable};
use crate::segments::{Segment, SegmentTable};
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::symbols::{Symbol, SymbolTable};
use crate::types::*;

/// What a virtual address resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOwner<'a> {
    Segment(&'a Segment),
    Section(&'a Section),
}

/// A parsed ELF file over a byte source
pub struct ElfFile<S: ByteSource> {
    source: S,
    config: ElfConfig,
    header: FileHeader,
    cache: FileCache,
}

impl<S: ByteSource> ElfFile<S> {
    /// Parse an ELF file with the default configuration
    pub fn parse(source: S) -> Result<Self> {
        Self::parse_with_config(source, ElfConfig::default())
    }

    /// Parse an ELF file.
    ///
    /// Only the identification block and file header are decoded here; a
    /// header-level failure rejects the whole file.
    pub fn parse_with_config(source: S, config: ElfConfig) -> Result<Self> {
        let header = parse_header(&source, &config)?;
        let cache = FileCache::new(
            usize::from(header.e_shnum),
            usize::from(header.e_phnum),
        );
        debug!(size = source.len(), "Bound ELF file view");
        Ok(Self {
            source,
            config,
            header,
            cache,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn layout(&self) -> Layout {
        self.header.layout()
    }

    pub fn config(&self) -> &ElfConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub(crate) fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub(crate) fn cursor(&self) -> Cursor<'_, S> {
        Cursor::new(&self.source, self.layout())
    }

    /// Confirm that a `size`-byte entry at `offset` is fully backed by the
    /// source. `offset` is `None` when computing it overflowed.
    pub(crate) fn check_entry(
        &self,
        table: TableKind,
        index: usize,
        offset: Option<u64>,
        size: u64,
    ) -> Result<u64> {
        let backed = offset
            .and_then(|start| start.checked_add(size))
            .is_some_and(|end| end <= self.source.len());
        match offset {
            Some(offset) if backed => Ok(offset),
            offset => Err(ElfError::TruncatedEntry {
                table,
                index,
                offset: offset.unwrap_or(u64::MAX),
            }),
        }
    }

    /// A table with entries must at least start inside the source.
    fn check_table(&self, desc: TableDescriptor) -> Result<()> {
        let size = self.source.len();
        if desc.count > 0 && desc.offset >= size {
            return Err(ElfError::OutOfBounds {
                offset: desc.offset,
                len: desc.entry_size.saturating_mul(desc.count as u64),
                size,
            });
        }
        Ok(())
    }

    /// String table in section `index`.
    ///
    /// Fails with [`ElfError::MissingStringTable`] when the index is out of
    /// range, its header cannot be decoded, or it is not `SHT_STRTAB`.
    pub(crate) fn string_table_at(&self, index: u64) -> Result<StringTable<'_>> {
        let missing = ElfError::MissingStringTable { index };
        let sections = self.sections()?;
        let position = match usize::try_from(index) {
            Ok(position) if index != u64::from(SHN_UNDEF) && position < sections.entry_count() => {
                position
            }
            _ => return Err(missing),
        };
        let section = match sections.entry(position) {
            Ok(section) => section,
            Err(err) => {
                debug!(index, %err, "String table header is undecodable");
                return Err(missing);
            }
        };
        if section.section_type() != SectionType::StrTab {
            return Err(missing);
        }
        let data = sections.data(section)?;
        Ok(StringTable::new(
            data,
            section.offset(),
            self.config.max_string_len,
        ))
    }

    /// The section header table.
    ///
    /// Fails with [`ElfError::OutOfBounds`] when the table starts past the
    /// end of the source.
    pub fn sections(&self) -> Result<SectionTable<'_, S>> {
        self.check_table(self.header.section_table())?;
        Ok(SectionTable::new(self))
    }

    /// The program header table
    pub fn segments(&self) -> Result<SegmentTable<'_, S>> {
        self.check_table(self.header.program_table())?;
        Ok(SegmentTable::new(self))
    }

    pub fn section(&self, index: usize) -> Result<&Section> {
        self.sections()?.entry(index)
    }

    pub fn segment(&self, index: usize) -> Result<&Segment> {
        self.segments()?.entry(index)
    }

    pub fn section_name(&self, section: &Section) -> Result<&str> {
        self.sections()?.name(section)
    }

    pub fn section_data(&self, section: &Section) -> Result<&[u8]> {
        self.sections()?.data(section)
    }

    pub fn segment_data(&self, segment: &Segment) -> Result<&[u8]> {
        self.segments()?.data(segment)
    }

    pub fn section_by_name(&self, name: &str) -> Result<Option<&Section>> {
        self.sections()?.by_name(name)
    }

    pub fn sections_of_type(
        &self,
        section_type: SectionType,
    ) -> Result<impl Iterator<Item = &Section> + '_> {
        Ok(self.sections()?.of_type(section_type))
    }

    pub fn segment_by_type(&self, segment_type: SegmentType) -> Result<Option<&Segment>> {
        Ok(self.segments()?.by_type(segment_type))
    }

    /// The LOAD segment or, failing that, the allocated section covering
    /// `addr`
    pub fn resolve_address(&self, addr: u64) -> Result<Option<AddressOwner<'_>>> {
        if let Some(segment) = self
            .segments()?
            .load_segments()
            .find(|segment| segment.contains_vaddr(addr))
        {
            return Ok(Some(AddressOwner::Segment(segment)));
        }
        Ok(self.sections()?.by_addr(addr).map(AddressOwner::Section))
    }

    /// Convert virtual address to file offset
    pub fn vaddr_to_offset(&self, addr: u64) -> Result<u64> {
        self.segments()?.vaddr_to_offset(addr)
    }

    /// Path named by the `PT_INTERP` segment
    pub fn interpreter(&self) -> Result<Option<&str>> {
        self.segments()?.interpreter()
    }

    /// Whether the file is a position-independent executable.
    ///
    /// Only `ET_DYN` files qualify. `DF_1_PIE` decides when `DT_FLAGS_1` is
    /// present; without it, a `PT_INTERP` segment marks an executable rather
    /// than a plain shared library.
    pub fn is_pie(&self) -> Result<bool> {
        if self.header.file_type() != ElfType::SharedObject {
            return Ok(false);
        }
        if let Some(flags) = self.dynamic()?.and_then(|dynamic| dynamic.flags_1()) {
            return Ok(flags & DF_1_PIE != 0);
        }
        Ok(self.segments()?.by_type(SegmentType::Interp).is_some())
    }

    /// Symbol table in section `index`
    pub fn symbol_table(&self, index: usize) -> Result<SymbolTable<'_, S>> {
        SymbolTable::new(self, self.section(index)?)
    }

    /// All `SHT_SYMTAB` and `SHT_DYNSYM` sections, in section order
    pub fn symbol_tables(&self) -> Result<Vec<SymbolTable<'_, S>>> {
        self.sections()?
            .iter()
            .filter_map(|entry| entry.ok())
            .filter(|section| section.section_type().is_symbol_table())
            .map(|section| SymbolTable::new(self, section))
            .collect()
    }

    /// First symbol named `name` across all symbol tables.
    ///
    /// Tables are searched in section order, so with duplicate names the
    /// table with the lowest section index wins. A table that cannot be
    /// searched is skipped; its error is returned only when no other table
    /// has the symbol.
    pub fn find_symbol(&self, name: &str) -> Result<Option<Symbol>> {
        let mut first_error = None;
        for table in self.symbol_tables()? {
            match table.find_by_name(name) {
                Ok(Some(symbol)) => return Ok(Some(symbol)),
                Ok(None) => {}
                Err(err) => {
                    debug!(index = table.section().index, %err, "Skipping symbol table");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    /// Defined symbols covering `addr`, across all symbol tables
    pub fn symbols_at(&self, addr: u64) -> Result<Vec<Symbol>> {
        Ok(self
            .symbol_tables()?
            .into_iter()
            .flat_map(|table| table.find_by_address(addr))
            .collect())
    }

    pub fn symbol_name(&self, symbol: &Symbol) -> Result<&str> {
        self.symbol_table(symbol.table)?.name(symbol)
    }

    /// Look up a dynamic symbol through the GNU or SysV hash table, falling
    /// back to a scan of the dynamic symbol tables.
    pub fn lookup_dynamic_symbol(&self, name: &str) -> Result<Option<Symbol>> {
        let sections = self.sections()?;
        if let Some(section) = sections.of_type(SectionType::GnuHash).next() {
            return GnuHashTable::new(self, section)?.lookup(name);
        }
        if let Some(section) = sections.of_type(SectionType::Hash).next() {
            return SysvHashTable::new(self, section)?.lookup(name);
        }
        for section in sections.of_type(SectionType::DynSym) {
            if let Some(symbol) = SymbolTable::new(self, section)?.find_by_name(name)? {
                return Ok(Some(symbol));
            }
        }
        Ok(None)
    }

    pub fn sysv_hash_table(&self, index: usize) -> Result<SysvHashTable<'_, S>> {
        SysvHashTable::new(self, self.section(index)?)
    }

    pub fn gnu_hash_table(&self, index: usize) -> Result<GnuHashTable<'_, S>> {
        GnuHashTable::new(self, self.section(index)?)
    }

    /// The first `SHT_DYNAMIC` section, if any
    pub fn dynamic(&self) -> Result<Option<DynamicSection<'_, S>>> {
        match self.sections()?.of_type(SectionType::Dynamic).next() {
            Some(section) => DynamicSection::new(self, section).map(Some),
            None => Ok(None),
        }
    }

    /// Dynamic section at section `index`
    pub fn dynamic_section(&self, index: usize) -> Result<DynamicSection<'_, S>> {
        DynamicSection::new(self, self.section(index)?)
    }

    /// Relocation section at section `index`
    pub fn relocations(&self, index: usize) -> Result<RelocationSection<'_, S>> {
        RelocationSection::new(self, self.section(index)?)
    }

    /// All `SHT_REL` and `SHT_RELA` sections, in section order
    pub fn relocation_sections(&self) -> Result<Vec<RelocationSection<'_, S>>> {
        self.sections()?
            .iter()
            .filter_map(|entry| entry.ok())
            .filter(|section| section.section_type().is_relocation())
            .map(|section| RelocationSection::new(self, section))
            .collect()
    }

    /// Notes in an `SHT_NOTE` section
    pub fn notes(&self, section: &Section) -> Result<NoteIter<'_>> {
        if section.section_type() != SectionType::Note {
            return Err(ElfError::WrongSectionType {
                index: section.index,
                expected: "note section",
                found: section.section_type(),
            });
        }
        let data = self.section_data(section)?;
        Ok(NoteIter::new(data, section.offset(), self.layout()))
    }

    /// Notes in a segment, normally `PT_NOTE`
    pub fn segment_notes(&self, segment: &Segment) -> Result<NoteIter<'_>> {
        let data = self.segment_data(segment)?;
        Ok(NoteIter::new(data, segment.offset(), self.layout()))
    }

    /// GNU build ID from the note sections, or from `PT_NOTE` segments when
    /// the file has no note sections.
    pub fn build_id(&self) -> Result<Option<&[u8]>> {
        let note_sections: Vec<&Section> = self.sections_of_type(SectionType::Note)?.collect();
        let mut containers = Vec::new();
        if note_sections.is_empty() {
            for segment in self.segments()?.iter().filter_map(|entry| entry.ok()) {
                if segment.segment_type() == SegmentType::Note {
                    containers.push(self.segment_notes(segment)?);
                }
            }
        } else {
            for section in note_sections {
                containers.push(self.notes(section)?);
            }
        }

        for notes in containers {
            for note in notes {
                match note {
                    Ok(note) if note.is_build_id() => return Ok(Some(note.desc)),
                    Ok(_) => {}
                    Err(err) => debug!(%err, "Stopping at malformed note"),
                }
            }
        }
        Ok(None)
    }
}
