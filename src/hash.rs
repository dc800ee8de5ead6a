//! Symbol hash tables (`SHT_HASH` and `SHT_GNU_HASH`)
//!
//! Both tables index the dynamic symbol table named by their `sh_link` and
//! allow lookup by name without a linear scan.

use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::file::ElfFile;
use crate::sections::Section;
use crate::source::ByteSource;
use crate::symbols::{Symbol, SymbolTable};
use crate::types::*;

/// The SysV ELF hash function
pub fn elf_hash(name: &[u8]) -> u32 {
    let mut h: u32 = 0;
    for &c in name {
        h = (h << 4).wrapping_add(u32::from(c));
        let g = h & 0xf000_0000;
        if g != 0 {
            h ^= g >> 24;
        }
        h &= !g;
    }
    h
}

/// The GNU hash function (Bernstein, seed 5381)
pub fn gnu_hash(name: &[u8]) -> u32 {
    name.iter()
        .fold(5381u32, |h, &c| h.wrapping_mul(33).wrapping_add(u32::from(c)))
}

fn check_type(section: &Section, expected_type: SectionType, expected: &'static str) -> Result<()> {
    if section.section_type() != expected_type {
        return Err(ElfError::WrongSectionType {
            index: section.index,
            expected,
            found: section.section_type(),
        });
    }
    Ok(())
}

fn name_matches<S: ByteSource>(table: &SymbolTable<'_, S>, symbol: &Symbol, name: &str) -> bool {
    table.name(symbol).map(|found| found == name).unwrap_or(false)
}

/// SysV hash table: `nbucket`, `nchain`, then the bucket and chain arrays
pub struct SysvHashTable<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
    section: &'f Section,
    data: &'f [u8],
    nbucket: u32,
    nchain: u32,
}

impl<'f, S: ByteSource> SysvHashTable<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>, section: &'f Section) -> Result<Self> {
        check_type(section, SectionType::Hash, "hash table")?;
        let data = file.sections()?.data(section)?;
        let cursor = Cursor::new(data, file.layout());
        Ok(Self {
            file,
            section,
            data,
            nbucket: cursor.read_u32(0)?,
            nchain: cursor.read_u32(4)?,
        })
    }

    pub fn bucket_count(&self) -> u32 {
        self.nbucket
    }

    /// Equals the number of symbols in the linked table
    pub fn chain_count(&self) -> u32 {
        self.nchain
    }

    fn bucket(&self, index: u32) -> Result<u32> {
        Cursor::new(self.data, self.file.layout()).read_u32(8 + u64::from(index) * 4)
    }

    fn chain(&self, index: u32) -> Result<u32> {
        let offset = 8 + (u64::from(self.nbucket) + u64::from(index)) * 4;
        Cursor::new(self.data, self.file.layout()).read_u32(offset)
    }

    pub fn symbol_table(&self) -> Result<SymbolTable<'f, S>> {
        self.file.symbol_table(self.section.link() as usize)
    }

    /// Look up a symbol by name
    pub fn lookup(&self, name: &str) -> Result<Option<Symbol>> {
        if self.nbucket == 0 {
            return Ok(None);
        }
        let table = self.symbol_table()?;
        let hash = elf_hash(name.as_bytes());
        let mut index = self.bucket(hash % self.nbucket)?;
        // A well-formed chain visits each present chain slot at most once
        let slots = (self.data.len() as u64).saturating_sub(8) / 4;
        let limit = u64::from(self.nchain).min(slots.saturating_sub(u64::from(self.nbucket)));
        let mut steps = 0u64;
        while index != 0 && index < self.nchain && steps <= limit {
            let symbol = table.symbol(index as usize)?;
            if name_matches(&table, &symbol, name) {
                return Ok(Some(symbol));
            }
            index = self.chain(index)?;
            steps += 1;
        }
        Ok(None)
    }
}

/// GNU hash table: header, bloom filter, buckets, then the hash chain
pub struct GnuHashTable<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
    section: &'f Section,
    data: &'f [u8],
    nbuckets: u32,
    symoffset: u32,
    bloom_size: u32,
    bloom_shift: u32,
}

impl<'f, S: ByteSource> GnuHashTable<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>, section: &'f Section) -> Result<Self> {
        check_type(section, SectionType::GnuHash, "GNU hash table")?;
        let data = file.sections()?.data(section)?;
        let cursor = Cursor::new(data, file.layout());
        Ok(Self {
            file,
            section,
            data,
            nbuckets: cursor.read_u32(0)?,
            symoffset: cursor.read_u32(4)?,
            bloom_size: cursor.read_u32(8)?,
            bloom_shift: cursor.read_u32(12)?,
        })
    }

    pub fn bucket_count(&self) -> u32 {
        self.nbuckets
    }

    /// Index of the first symbol covered by the table
    pub fn symbol_offset(&self) -> u32 {
        self.symoffset
    }

    fn cursor(&self) -> Cursor<'f, [u8]> {
        Cursor::new(self.data, self.file.layout())
    }

    fn buckets_offset(&self) -> u64 {
        16 + u64::from(self.bloom_size) * self.file.layout().class.word_size()
    }

    fn chain_offset(&self) -> u64 {
        self.buckets_offset() + u64::from(self.nbuckets) * 4
    }

    pub fn symbol_table(&self) -> Result<SymbolTable<'f, S>> {
        self.file.symbol_table(self.section.link() as usize)
    }

    /// Whether the bloom filter admits `hash`; `false` means definitely absent
    fn bloom_admits(&self, hash: u32) -> Result<bool> {
        let class = self.file.layout().class;
        let bits = u32::from(class.bits());
        let slot = u64::from((hash / bits) % self.bloom_size);
        let word = self.cursor().read_word(16 + slot * class.word_size())?;
        let shifted = hash.checked_shr(self.bloom_shift).unwrap_or(0);
        let mask = (1u64 << (hash % bits)) | (1u64 << (shifted % bits));
        Ok(word & mask == mask)
    }

    /// Look up a symbol by name
    pub fn lookup(&self, name: &str) -> Result<Option<Symbol>> {
        if self.nbuckets == 0 || self.bloom_size == 0 {
            return Ok(None);
        }
        let hash = gnu_hash(name.as_bytes());
        if !self.bloom_admits(hash)? {
            return Ok(None);
        }

        let cursor = self.cursor();
        let bucket = u64::from(hash % self.nbuckets);
        let mut index = cursor.read_u32(self.buckets_offset() + bucket * 4)?;
        if index < self.symoffset {
            return Ok(None);
        }

        let table = self.symbol_table()?;
        let count = table.symbol_count();
        while (index as usize) < count {
            let chain_hash =
                cursor.read_u32(self.chain_offset() + u64::from(index - self.symoffset) * 4)?;
            if hash | 1 == chain_hash | 1 {
                let symbol = table.symbol(index as usize)?;
                if name_matches(&table, &symbol, name) {
                    return Ok(Some(symbol));
                }
            }
            // Low bit marks the end of the chain
            if chain_hash & 1 != 0 {
                break;
            }
            index = match index.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(None)
    }
}
