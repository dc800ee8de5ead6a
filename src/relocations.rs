//! Relocation sections (`SHT_REL` and `SHT_RELA`)

use tracing::trace;

use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::file::ElfFile;
use crate::sections::Section;
use crate::source::ByteSource;
use crate::symbols::{Symbol, SymbolTable};
use crate::types::*;

/// A decoded relocation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub index: usize,
    pub r_offset: u64,
    pub r_info: u64,
    /// Zero for `SHT_REL` entries
    pub r_addend: i64,
    pub has_addend: bool,
}

impl Relocation {
    /// Symbol table index packed into `r_info`
    pub fn symbol_index(&self, class: ElfClass) -> u32 {
        match class {
            ElfClass::Elf32 => (self.r_info >> 8) as u32,
            ElfClass::Elf64 => (self.r_info >> 32) as u32,
        }
    }

    /// Relocation type packed into `r_info`
    pub fn r_type(&self, class: ElfClass) -> u32 {
        match class {
            ElfClass::Elf32 => (self.r_info & 0xff) as u32,
            ElfClass::Elf64 => (self.r_info & 0xffff_ffff) as u32,
        }
    }
}

/// Parse a relocation entry at `offset`
pub(crate) fn parse_relocation<S: ByteSource + ?Sized>(
    cursor: &Cursor<'_, S>,
    offset: u64,
    index: usize,
    has_addend: bool,
) -> Result<Relocation> {
    let w = cursor.layout().class.word_size();
    let r_offset = cursor.read_word(offset)?;
    let r_info = cursor.read_word(offset + w)?;
    let r_addend = if has_addend {
        cursor.read_sword(offset + 2 * w)?
    } else {
        0
    };
    Ok(Relocation {
        index,
        r_offset,
        r_info,
        r_addend,
        has_addend,
    })
}

/// View over one relocation section
pub struct RelocationSection<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
    section: &'f Section,
    has_addend: bool,
}

impl<'f, S: ByteSource> Clone for RelocationSection<'f, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'f, S: ByteSource> Copy for RelocationSection<'f, S> {}

impl<'f, S: ByteSource> RelocationSection<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>, section: &'f Section) -> Result<Self> {
        let has_addend = match section.section_type() {
            SectionType::Rela => true,
            SectionType::Rel => false,
            found => {
                return Err(ElfError::WrongSectionType {
                    index: section.index,
                    expected: "relocation section",
                    found,
                })
            }
        };
        Ok(Self {
            file,
            section,
            has_addend,
        })
    }

    pub fn section(&self) -> &'f Section {
        self.section
    }

    pub fn is_rela(&self) -> bool {
        self.has_addend
    }

    fn entry_size(&self) -> u64 {
        self.file.layout().class.relocation_size(self.has_addend)
    }

    pub fn entry_count(&self) -> usize {
        usize::try_from(self.section.size() / self.entry_size()).unwrap_or(usize::MAX)
    }

    /// Relocation at `index`
    pub fn entry(&self, index: usize) -> Result<Relocation> {
        let count = self.entry_count();
        if index >= count {
            return Err(ElfError::IndexOutOfRange {
                table: TableKind::Relocations,
                index,
                count,
            });
        }
        let size = self.entry_size();
        let offset = (index as u64)
            .checked_mul(size)
            .and_then(|rel| self.section.offset().checked_add(rel));
        let offset = self
            .file
            .check_entry(TableKind::Relocations, index, offset, size)?;
        let relocation = parse_relocation(&self.file.cursor(), offset, index, self.has_addend)?;
        trace!(section = self.section.index, index, "Decoded relocation");
        Ok(relocation)
    }

    /// All relocations in section order, ending after the first entry that
    /// cannot be decoded
    pub fn entries(&self) -> impl Iterator<Item = Result<Relocation>> + 'f {
        let section = *self;
        let mut failed = false;
        (0..self.entry_count()).map_while(move |i| {
            if failed {
                return None;
            }
            let entry = section.entry(i);
            failed = entry.is_err();
            Some(entry)
        })
    }

    /// The symbol table named by `sh_link`
    pub fn symbol_table(&self) -> Result<SymbolTable<'f, S>> {
        self.file.symbol_table(self.section.link() as usize)
    }

    /// Symbol referenced by `relocation`; `None` for symbol index 0
    pub fn symbol(&self, relocation: &Relocation) -> Result<Option<Symbol>> {
        let index = relocation.symbol_index(self.file.layout().class);
        if index == 0 {
            return Ok(None);
        }
        self.symbol_table()?.symbol(index as usize).map(Some)
    }

    /// Section the relocations patch (`sh_info`), if any
    pub fn applies_to(&self) -> Result<Option<&'f Section>> {
        match self.section.info() {
            0 => Ok(None),
            index => self.file.section(index as usize).map(Some),
        }
    }

    /// Architecture-specific name of the relocation's type
    pub fn type_name(&self, relocation: &Relocation) -> Option<&'static str> {
        relocation_type_name(
            self.file.header().e_machine,
            relocation.r_type(self.file.layout().class),
        )
    }
}

/// Name of relocation type `r_type` for machine `e_machine`
pub fn relocation_type_name(e_machine: u16, r_type: u32) -> Option<&'static str> {
    match e_machine {
        EM_X86_64 => x86_64_name(r_type),
        EM_386 => i386_name(r_type),
        EM_AARCH64 => aarch64_name(r_type),
        EM_ARM => arm_name(r_type),
        _ => None,
    }
}

fn x86_64_name(r_type: u32) -> Option<&'static str> {
    Some(match r_type {
        0 => "R_X86_64_NONE",
        1 => "R_X86_64_64",
        2 => "R_X86_64_PC32",
        3 => "R_X86_64_GOT32",
        4 => "R_X86_64_PLT32",
        5 => "R_X86_64_COPY",
        6 => "R_X86_64_GLOB_DAT",
        7 => "R_X86_64_JUMP_SLOT",
        8 => "R_X86_64_RELATIVE",
        9 => "R_X86_64_GOTPCREL",
        10 => "R_X86_64_32",
        11 => "R_X86_64_32S",
        12 => "R_X86_64_16",
        13 => "R_X86_64_PC16",
        14 => "R_X86_64_8",
        15 => "R_X86_64_PC8",
        16 => "R_X86_64_DTPMOD64",
        17 => "R_X86_64_DTPOFF64",
        18 => "R_X86_64_TPOFF64",
        19 => "R_X86_64_TLSGD",
        20 => "R_X86_64_TLSLD",
        21 => "R_X86_64_DTPOFF32",
        22 => "R_X86_64_GOTTPOFF",
        23 => "R_X86_64_TPOFF32",
        24 => "R_X86_64_PC64",
        25 => "R_X86_64_GOTOFF64",
        26 => "R_X86_64_GOTPC32",
        27 => "R_X86_64_GOT64",
        28 => "R_X86_64_GOTPCREL64",
        29 => "R_X86_64_GOTPC64",
        30 => "R_X86_64_GOTPLT64",
        31 => "R_X86_64_PLTOFF64",
        32 => "R_X86_64_SIZE32",
        33 => "R_X86_64_SIZE64",
        34 => "R_X86_64_GOTPC32_TLSDESC",
        35 => "R_X86_64_TLSDESC_CALL",
        36 => "R_X86_64_TLSDESC",
        37 => "R_X86_64_IRELATIVE",
        38 => "R_X86_64_RELATIVE64",
        41 => "R_X86_64_GOTPCRELX",
        42 => "R_X86_64_REX_GOTPCRELX",
        _ => return None,
    })
}

fn i386_name(r_type: u32) -> Option<&'static str> {
    Some(match r_type {
        0 => "R_386_NONE",
        1 => "R_386_32",
        2 => "R_386_PC32",
        3 => "R_386_GOT32",
        4 => "R_386_PLT32",
        5 => "R_386_COPY",
        6 => "R_386_GLOB_DAT",
        7 => "R_386_JMP_SLOT",
        8 => "R_386_RELATIVE",
        9 => "R_386_GOTOFF",
        10 => "R_386_GOTPC",
        14 => "R_386_TLS_TPOFF",
        35 => "R_386_TLS_DTPMOD32",
        36 => "R_386_TLS_DTPOFF32",
        37 => "R_386_TLS_TPOFF32",
        42 => "R_386_IRELATIVE",
        43 => "R_386_GOT32X",
        _ => return None,
    })
}

fn aarch64_name(r_type: u32) -> Option<&'static str> {
    Some(match r_type {
        0 => "R_AARCH64_NONE",
        257 => "R_AARCH64_ABS64",
        258 => "R_AARCH64_ABS32",
        261 => "R_AARCH64_PREL32",
        275 => "R_AARCH64_ADR_PREL_PG_HI21",
        277 => "R_AARCH64_ADD_ABS_LO12_NC",
        282 => "R_AARCH64_JUMP26",
        283 => "R_AARCH64_CALL26",
        286 => "R_AARCH64_LDST64_ABS_LO12_NC",
        311 => "R_AARCH64_ADR_GOT_PAGE",
        312 => "R_AARCH64_LD64_GOT_LO12_NC",
        1024 => "R_AARCH64_COPY",
        1025 => "R_AARCH64_GLOB_DAT",
        1026 => "R_AARCH64_JUMP_SLOT",
        1027 => "R_AARCH64_RELATIVE",
        1028 => "R_AARCH64_TLS_DTPMOD",
        1029 => "R_AARCH64_TLS_DTPREL",
        1030 => "R_AARCH64_TLS_TPREL",
        1031 => "R_AARCH64_TLSDESC",
        1032 => "R_AARCH64_IRELATIVE",
        _ => return None,
    })
}

fn arm_name(r_type: u32) -> Option<&'static str> {
    Some(match r_type {
        0 => "R_ARM_NONE",
        1 => "R_ARM_PC24",
        2 => "R_ARM_ABS32",
        3 => "R_ARM_REL32",
        10 => "R_ARM_THM_CALL",
        20 => "R_ARM_COPY",
        21 => "R_ARM_GLOB_DAT",
        22 => "R_ARM_JUMP_SLOT",
        23 => "R_ARM_RELATIVE",
        28 => "R_ARM_CALL",
        29 => "R_ARM_JUMP24",
        30 => "R_ARM_THM_JUMP24",
        38 => "R_ARM_TARGET1",
        40 => "R_ARM_V4BX",
        42 => "R_ARM_PREL31",
        43 => "R_ARM_MOVW_ABS_NC",
        44 => "R_ARM_MOVT_ABS",
        45 => "R_ARM_MOVW_PREL_NC",
        46 => "R_ARM_MOVT_PREL",
        47 => "R_ARM_THM_MOVW_ABS_NC",
        48 => "R_ARM_THM_MOVT_ABS",
        49 => "R_ARM_THM_MOVW_PREL_NC",
        50 => "R_ARM_THM_MOVT_PREL",
        160 => "R_ARM_IRELATIVE",
        _ => return None,
    })
}
