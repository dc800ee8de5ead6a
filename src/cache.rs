//! Per-file memoization of decoded entries.
//!
//! Each slot is a `once_cell::sync::OnceCell`, so an entry is computed at
//! most once even when several threads ask for it at the same time. Failed
//! decodes leave their slot empty and are retried on the next request.
//!
//! Slots are grouped in fixed-size chunks that are allocated only once an
//! entry inside them decodes, so a header declaring tens of thousands of
//! entries costs a small directory until the entries actually exist.

use once_cell::sync::OnceCell;

use crate::dynamic::DynamicEntry;
use crate::error::{ElfError, Result};
use crate::sections::Section;
use crate::segments::Segment;
use crate::types::TableKind;

const CHUNK_SIZE: usize = 64;

type Chunk<T> = Box<[OnceCell<T>]>;

/// Lazily decoded entries of a table with a fixed entry count.
pub(crate) struct EntryCache<T> {
    count: usize,
    chunks: OnceCell<Box<[OnceCell<Chunk<T>>]>>,
}

impl<T> EntryCache<T> {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            count,
            chunks: OnceCell::new(),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Return the cached entry at `index`, computing it with `init` on first
    /// use.
    pub(crate) fn get_or_try_init<F>(&self, table: TableKind, index: usize, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if index >= self.count {
            return Err(ElfError::IndexOutOfRange {
                table,
                index,
                count: self.count,
            });
        }
        let chunks = self.chunks.get_or_init(|| {
            (0..self.count.div_ceil(CHUNK_SIZE))
                .map(|_| OnceCell::new())
                .collect()
        });
        let chunk = &chunks[index / CHUNK_SIZE];
        let slot = index % CHUNK_SIZE;
        if let Some(entries) = chunk.get() {
            return entries[slot].get_or_try_init(init);
        }
        // Decode before allocating so failures cost nothing
        let value = init()?;
        let entries = chunk.get_or_init(|| (0..CHUNK_SIZE).map(|_| OnceCell::new()).collect());
        Ok(entries[slot].get_or_init(|| value))
    }

    /// Number of chunks holding at least one decoded entry
    #[cfg(test)]
    fn allocated_chunks(&self) -> usize {
        self.chunks
            .get()
            .map_or(0, |chunks| chunks.iter().filter(|chunk| chunk.get().is_some()).count())
    }
}

/// Everything an `ElfFile` memoizes after header decode.
pub(crate) struct FileCache {
    pub(crate) sections: EntryCache<Section>,
    pub(crate) segments: EntryCache<Segment>,
    /// Dynamic entries keyed by section index
    pub(crate) dynamic: EntryCache<Vec<DynamicEntry>>,
}

impl FileCache {
    pub(crate) fn new(section_count: usize, segment_count: usize) -> Self {
        Self {
            sections: EntryCache::new(section_count),
            segments: EntryCache::new(segment_count),
            dynamic: EntryCache::new(section_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once() {
        let cache: EntryCache<u32> = EntryCache::new(3);
        let calls = Cell::new(0);
        let init = || {
            calls.set(calls.get() + 1);
            Ok(42)
        };
        assert_eq!(*cache.get_or_try_init(TableKind::Symbols, 1, init).unwrap(), 42);
        assert_eq!(*cache.get_or_try_init(TableKind::Symbols, 1, init).unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: EntryCache<u32> = EntryCache::new(1);
        let result = cache.get_or_try_init(TableKind::Dynamic, 0, || {
            Err(ElfError::UnmappedAddress(0x1000))
        });
        assert!(result.is_err());
        assert_eq!(*cache.get_or_try_init(TableKind::Dynamic, 0, || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_failed_decodes_allocate_nothing() {
        let cache: EntryCache<u64> = EntryCache::new(usize::from(u16::MAX));
        for index in 0..cache.count() {
            let result = cache.get_or_try_init(TableKind::SectionHeaders, index, || {
                Err(ElfError::UnmappedAddress(index as u64))
            });
            assert!(result.is_err());
        }
        assert_eq!(cache.allocated_chunks(), 0);

        assert_eq!(*cache.get_or_try_init(TableKind::SectionHeaders, 130, || Ok(5)).unwrap(), 5);
        assert_eq!(*cache.get_or_try_init(TableKind::SectionHeaders, 131, || Ok(6)).unwrap(), 6);
        assert_eq!(cache.allocated_chunks(), 1);
        assert_eq!(*cache.get_or_try_init(TableKind::SectionHeaders, 130, || Ok(9)).unwrap(), 5);
    }

    #[test]
    fn test_index_out_of_range() {
        let cache: EntryCache<u32> = EntryCache::new(2);
        assert_eq!(cache.count(), 2);
        assert!(matches!(
            cache.get_or_try_init(TableKind::ProgramHeaders, 2, || Ok(0)),
            Err(ElfError::IndexOutOfRange {
                table: TableKind::ProgramHeaders,
                index: 2,
                count: 2
            })
        ));
    }
}
