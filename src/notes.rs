//! Note parsing for `SHT_NOTE` sections and `PT_NOTE` segments

use crate::cursor::{align_up, Cursor};
use crate::error::{ElfError, Result};
use crate::types::*;

/// Size of the `namesz`/`descsz`/`type` record header
const NOTE_HEADER_SIZE: u64 = 12;

pub const GNU_PROPERTY_STACK_SIZE: u32 = 1;
pub const GNU_PROPERTY_NO_COPY_ON_PROTECTED: u32 = 2;
pub const GNU_PROPERTY_AARCH64_FEATURE_1_AND: u32 = 0xc000_0000;
pub const GNU_PROPERTY_X86_FEATURE_1_AND: u32 = 0xc000_0002;

/// Individual note entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note<'a> {
    /// Position within its container
    pub index: usize,
    /// File offset of the record header
    pub offset: u64,
    pub n_type: u32,
    /// Owner name, up to the first NUL
    pub name: &'a [u8],
    pub desc: &'a [u8],
}

impl<'a> Note<'a> {
    pub fn name_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn is_gnu(&self) -> bool {
        self.name == b"GNU"
    }

    pub fn is_build_id(&self) -> bool {
        self.is_gnu() && self.n_type == NT_GNU_BUILD_ID
    }
}

/// Iterator over the note records of one container.
///
/// Yields each well-formed record in order. A record whose declared lengths
/// run past the container yields [`ElfError::TruncatedNote`], after which the
/// iterator is exhausted.
pub struct NoteIter<'a> {
    data: &'a [u8],
    base: u64,
    layout: Layout,
    pos: u64,
    index: usize,
    done: bool,
}

impl<'a> NoteIter<'a> {
    /// Notes in `data`, which starts at file offset `base`
    pub fn new(data: &'a [u8], base: u64, layout: Layout) -> Self {
        Self {
            data,
            base,
            layout,
            pos: 0,
            index: 0,
            done: false,
        }
    }

    fn parse_next(&self) -> Result<(Note<'a>, u64)> {
        let len = self.data.len() as u64;
        let start = self.pos;
        let truncated = ElfError::TruncatedNote {
            index: self.index,
            offset: self.base.saturating_add(start),
        };
        if len - start < NOTE_HEADER_SIZE {
            return Err(truncated);
        }

        let cursor = Cursor::new(self.data, self.layout);
        let namesz = u64::from(cursor.read_u32(start)?);
        let descsz = u64::from(cursor.read_u32(start + 4)?);
        let n_type = cursor.read_u32(start + 8)?;

        let name_start = start + NOTE_HEADER_SIZE;
        let name_end = name_start + namesz;
        if name_end > len {
            return Err(truncated);
        }
        let (desc_start, desc_end) = if descsz == 0 {
            (name_end, name_end)
        } else {
            let desc_start = align_up(name_end, 4).ok_or(ElfError::TruncatedNote {
                index: self.index,
                offset: self.base.saturating_add(start),
            })?;
            (desc_start, desc_start + descsz)
        };
        if desc_end > len {
            return Err(truncated);
        }

        let raw_name = cursor.read_bytes(name_start, namesz)?;
        let name = match memchr::memchr(0, raw_name) {
            Some(nul) => &raw_name[..nul],
            None => raw_name,
        };
        let desc = cursor.read_bytes(desc_start, descsz)?;
        let next = align_up(desc_end, 4).unwrap_or(u64::MAX);

        Ok((
            Note {
                index: self.index,
                offset: self.base.saturating_add(start),
                n_type,
                name,
                desc,
            },
            next,
        ))
    }
}

impl<'a> Iterator for NoteIter<'a> {
    type Item = Result<Note<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() as u64 {
            return None;
        }
        match self.parse_next() {
            Ok((note, next)) => {
                self.pos = next;
                self.index += 1;
                Some(Ok(note))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for NoteIter<'_> {}

/// GNU property types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GnuProperty<'a> {
    StackSize(u64),
    NoCopyOnProtected,
    X86Features(u32),
    AArch64Features(u32),
    Other { pr_type: u32, data: &'a [u8] },
}

/// Decode the properties of an `NT_GNU_PROPERTY_TYPE_0` note.
///
/// Each property is padded to the class word size.
pub fn gnu_properties<'a>(note: &Note<'a>, layout: Layout) -> Result<Vec<GnuProperty<'a>>> {
    let data = note.desc;
    let cursor = Cursor::new(data, layout);
    let truncated = || ElfError::TruncatedNote {
        index: note.index,
        offset: note.offset,
    };
    let len = data.len() as u64;
    let align = layout.class.word_size();

    let mut properties = Vec::new();
    let mut offset = 0u64;
    while offset < len {
        if len - offset < 8 {
            return Err(truncated());
        }
        let pr_type = cursor.read_u32(offset)?;
        let pr_datasz = u64::from(cursor.read_u32(offset + 4)?);
        offset += 8;
        if pr_datasz > len - offset {
            return Err(truncated());
        }
        let prop = cursor.read_bytes(offset, pr_datasz)?;
        let value = Cursor::new(prop, layout);

        let property = match pr_type {
            GNU_PROPERTY_STACK_SIZE if pr_datasz == align => {
                GnuProperty::StackSize(value.read_word(0)?)
            }
            GNU_PROPERTY_NO_COPY_ON_PROTECTED => GnuProperty::NoCopyOnProtected,
            GNU_PROPERTY_X86_FEATURE_1_AND if pr_datasz == 4 => {
                GnuProperty::X86Features(value.read_u32(0)?)
            }
            GNU_PROPERTY_AARCH64_FEATURE_1_AND if pr_datasz == 4 => {
                GnuProperty::AArch64Features(value.read_u32(0)?)
            }
            _ => GnuProperty::Other {
                pr_type,
                data: prop,
            },
        };
        properties.push(property);
        offset = align_up(offset + pr_datasz, align).ok_or_else(truncated)?;
    }

    Ok(properties)
}
