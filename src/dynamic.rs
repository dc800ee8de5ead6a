//! Dynamic section parsing

use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::file::ElfFile;
use crate::sections::Section;
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::types::*;

/// One `(d_tag, d_val/d_ptr)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    pub d_tag: i64,
    pub d_val: u64,
}

/// Parse dynamic entries from the raw bytes of a dynamic section.
///
/// Stops at the first `DT_NULL` (not included) or when fewer bytes than one
/// entry remain, whichever comes first.
pub(crate) fn parse_dynamic_entries(data: &[u8], layout: Layout) -> Result<Vec<DynamicEntry>> {
    let cursor = Cursor::new(data, layout);
    let entry_size = layout.class.dynamic_entry_size();
    let word = layout.class.word_size();

    let mut entries = Vec::new();
    let mut offset = 0u64;
    while offset + entry_size <= data.len() as u64 {
        let d_tag = cursor.read_sword(offset)?;
        if d_tag == DT_NULL {
            break;
        }
        let d_val = cursor.read_word(offset + word)?;
        entries.push(DynamicEntry { d_tag, d_val });
        offset += entry_size;
    }
    Ok(entries)
}

/// View over an `SHT_DYNAMIC` section
pub struct DynamicSection<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
    section: &'f Section,
    entries: &'f [DynamicEntry],
}

impl<'f, S: ByteSource> DynamicSection<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>, section: &'f Section) -> Result<Self> {
        if section.section_type() != SectionType::Dynamic {
            return Err(ElfError::WrongSectionType {
                index: section.index,
                expected: "dynamic section",
                found: section.section_type(),
            });
        }
        let entries = file
            .cache()
            .dynamic
            .get_or_try_init(TableKind::Dynamic, section.index, || {
                let data = file.sections()?.data(section)?;
                let entries = parse_dynamic_entries(data, file.layout())?;
                debug!(
                    section = section.index,
                    count = entries.len(),
                    "Decoded dynamic section"
                );
                Ok(entries)
            })?;
        Ok(Self {
            file,
            section,
            entries,
        })
    }

    pub fn section(&self) -> &'f Section {
        self.section
    }

    /// Get all entries, excluding the terminating `DT_NULL`
    pub fn entries(&self) -> &'f [DynamicEntry] {
        self.entries
    }

    /// Get entries by tag
    pub fn entries_with_tag(&self, tag: i64) -> impl Iterator<Item = &'f DynamicEntry> + 'f {
        self.entries.iter().filter(move |e| e.d_tag == tag)
    }

    /// Value of the first entry with `tag`
    pub fn value(&self, tag: i64) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.d_tag == tag)
            .map(|e| e.d_val)
    }

    /// The dynamic string table.
    ///
    /// Located through `DT_STRTAB` (a virtual address) and `DT_STRSZ`; files
    /// without `DT_STRTAB` fall back to the section's `sh_link`.
    pub fn strings(&self) -> Result<StringTable<'f>> {
        let Some(addr) = self.value(DT_STRTAB) else {
            return self.file.string_table_at(u64::from(self.section.link()));
        };
        let offset = self.file.segments()?.vaddr_to_offset(addr)?;
        let source = self.file.source();
        let size = match self.value(DT_STRSZ) {
            Some(size) => size,
            None => source.len().saturating_sub(offset),
        };
        let data = source.read(offset, size)?;
        Ok(StringTable::new(data, offset, self.file.config().max_string_len))
    }

    fn string_for(&self, tag: i64) -> Result<Option<&'f str>> {
        match self.value(tag) {
            Some(offset) => self.strings()?.resolve(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Get needed libraries (DT_NEEDED), in entry order
    pub fn needed_libraries(&self) -> Result<Vec<&'f str>> {
        let needed: Vec<u64> = self.entries_with_tag(DT_NEEDED).map(|e| e.d_val).collect();
        if needed.is_empty() {
            return Ok(Vec::new());
        }
        let strings = self.strings()?;
        needed
            .into_iter()
            .map(|offset| strings.resolve(offset))
            .collect()
    }

    /// Get SONAME
    pub fn soname(&self) -> Result<Option<&'f str>> {
        self.string_for(DT_SONAME)
    }

    /// Get RPATH
    pub fn rpath(&self) -> Result<Option<&'f str>> {
        self.string_for(DT_RPATH)
    }

    /// Get RUNPATH
    pub fn runpath(&self) -> Result<Option<&'f str>> {
        self.string_for(DT_RUNPATH)
    }

    pub fn flags(&self) -> Option<u64> {
        self.value(DT_FLAGS)
    }

    pub fn flags_1(&self) -> Option<u64> {
        self.value(DT_FLAGS_1)
    }

    /// Check if BIND_NOW is set
    pub fn is_bind_now(&self) -> bool {
        self.value(DT_BIND_NOW).is_some()
            || self.flags().is_some_and(|flags| flags & DF_BIND_NOW != 0)
            || self.flags_1().is_some_and(|flags| flags & DF_1_NOW != 0)
    }

    /// Get INIT function address
    pub fn init(&self) -> Option<u64> {
        self.value(DT_INIT)
    }

    /// Get FINI function address
    pub fn fini(&self) -> Option<u64> {
        self.value(DT_FINI)
    }

    /// Address and byte size of the `DT_INIT_ARRAY` function pointer array
    pub fn init_array(&self) -> Option<(u64, u64)> {
        Some((self.value(DT_INIT_ARRAY)?, self.value(DT_INIT_ARRAYSZ).unwrap_or(0)))
    }

    /// Address and byte size of the `DT_FINI_ARRAY` function pointer array
    pub fn fini_array(&self) -> Option<(u64, u64)> {
        Some((self.value(DT_FINI_ARRAY)?, self.value(DT_FINI_ARRAYSZ).unwrap_or(0)))
    }
}
