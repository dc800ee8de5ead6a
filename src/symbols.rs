//! Symbol table sections

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::error::{ElfError, Result};
use crate::file::ElfFile;
use crate::sections::Section;
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::types::*;

/// A decoded symbol table entry.
///
/// `table` and `index` locate the entry; the name stays an offset into the
/// linked string table until resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Section index of the owning symbol table
    pub table: usize,
    pub index: usize,
    pub st_name: u32,
    pub st_value: u64,
    pub st_size: u64,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

impl Symbol {
    pub fn name_offset(&self) -> u32 {
        self.st_name
    }

    pub fn value(&self) -> u64 {
        self.st_value
    }

    pub fn size(&self) -> u64 {
        self.st_size
    }

    pub fn binding(&self) -> SymbolBinding {
        SymbolBinding::from(self.st_info >> 4)
    }

    pub fn symbol_type(&self) -> SymbolType {
        SymbolType::from(self.st_info & 0xf)
    }

    pub fn visibility(&self) -> SymbolVisibility {
        SymbolVisibility::from(self.st_other)
    }

    /// Defining section, with reserved indices kept distinct
    pub fn section(&self) -> SymbolSection {
        SymbolSection::from(self.st_shndx)
    }

    pub fn is_undefined(&self) -> bool {
        self.st_shndx == SHN_UNDEF
    }

    pub fn is_function(&self) -> bool {
        matches!(self.symbol_type(), SymbolType::Func | SymbolType::GnuIfunc)
    }

    pub fn is_global(&self) -> bool {
        matches!(
            self.binding(),
            SymbolBinding::Global | SymbolBinding::Weak | SymbolBinding::GnuUnique
        )
    }

    pub fn is_weak(&self) -> bool {
        self.binding() == SymbolBinding::Weak
    }

    /// Whether the symbol covers `addr`; zero-sized symbols match only their
    /// own value.
    pub fn contains_addr(&self, addr: u64) -> bool {
        if self.st_size == 0 {
            addr == self.st_value
        } else {
            addr >= self.st_value && addr - self.st_value < self.st_size
        }
    }

    fn is_exported(&self) -> bool {
        !self.is_undefined()
            && self.is_global()
            && matches!(
                self.visibility(),
                SymbolVisibility::Default | SymbolVisibility::Protected
            )
            && !matches!(self.symbol_type(), SymbolType::Section | SymbolType::File)
    }
}

/// Parse a single symbol entry
pub(crate) fn parse_symbol<S: ByteSource + ?Sized>(
    cursor: &Cursor<'_, S>,
    offset: u64,
    table: usize,
    index: usize,
) -> Result<Symbol> {
    match cursor.layout().class {
        ElfClass::Elf32 => Ok(Symbol {
            table,
            index,
            st_name: cursor.read_u32(offset)?,
            st_value: cursor.read_word(offset + 4)?,
            st_size: cursor.read_word(offset + 8)?,
            st_info: cursor.read_u8(offset + 12)?,
            st_other: cursor.read_u8(offset + 13)?,
            st_shndx: cursor.read_u16(offset + 14)?,
        }),
        ElfClass::Elf64 => Ok(Symbol {
            table,
            index,
            st_name: cursor.read_u32(offset)?,
            st_info: cursor.read_u8(offset + 4)?,
            st_other: cursor.read_u8(offset + 5)?,
            st_shndx: cursor.read_u16(offset + 6)?,
            st_value: cursor.read_word(offset + 8)?,
            st_size: cursor.read_word(offset + 16)?,
        }),
    }
}

/// Mangling scheme recognized by [`demangle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlavor {
    Rust,
    Itanium,
}

/// Attempt to demangle a single symbol. Returns None when not recognized.
pub fn demangle(name: &str) -> Option<(SymbolFlavor, String)> {
    // Rust (v0 + legacy), printed without the trailing hash
    if let Ok(dm) = rustc_demangle::try_demangle(name) {
        return Some((SymbolFlavor::Rust, format!("{:#}", dm)));
    }
    if name.starts_with("_Z") || name.starts_with("__Z") {
        if let Ok(sym) = cpp_demangle::Symbol::new(name) {
            return Some((SymbolFlavor::Itanium, sym.to_string()));
        }
    }
    None
}

/// View over one `SHT_SYMTAB` or `SHT_DYNSYM` section.
///
/// Entries are decoded on request; each entry is bounds-checked on its own so
/// a truncated table still yields its leading symbols.
pub struct SymbolTable<'f, S: ByteSource> {
    file: &'f ElfFile<S>,
    section: &'f Section,
}

impl<'f, S: ByteSource> Clone for SymbolTable<'f, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'f, S: ByteSource> Copy for SymbolTable<'f, S> {}

impl<'f, S: ByteSource> SymbolTable<'f, S> {
    pub(crate) fn new(file: &'f ElfFile<S>, section: &'f Section) -> Result<Self> {
        if !section.section_type().is_symbol_table() {
            return Err(ElfError::WrongSectionType {
                index: section.index,
                expected: "symbol table",
                found: section.section_type(),
            });
        }
        Ok(Self { file, section })
    }

    pub fn section(&self) -> &'f Section {
        self.section
    }

    pub fn is_dynamic(&self) -> bool {
        self.section.section_type() == SectionType::DynSym
    }

    pub fn symbol_count(&self) -> usize {
        let count = self.section.size() / self.file.layout().class.symbol_size();
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Symbol at `index`
    pub fn symbol(&self, index: usize) -> Result<Symbol> {
        let count = self.symbol_count();
        if index >= count {
            return Err(ElfError::IndexOutOfRange {
                table: TableKind::Symbols,
                index,
                count,
            });
        }
        let size = self.file.layout().class.symbol_size();
        let offset = (index as u64)
            .checked_mul(size)
            .and_then(|rel| self.section.offset().checked_add(rel));
        let offset = self
            .file
            .check_entry(TableKind::Symbols, index, offset, size)?;
        let symbol = parse_symbol(&self.file.cursor(), offset, self.section.index, index)?;
        trace!(table = self.section.index, index, "Decoded symbol");
        Ok(symbol)
    }

    /// All symbols in table order, including the null symbol at index 0.
    ///
    /// Entries are laid out back to back, so the first entry that cannot be
    /// decoded is yielded as an error and ends the iteration.
    pub fn symbols(&self) -> impl Iterator<Item = Result<Symbol>> + 'f {
        let table = *self;
        let mut failed = false;
        (0..self.symbol_count()).map_while(move |i| {
            if failed {
                return None;
            }
            let entry = table.symbol(i);
            failed = entry.is_err();
            Some(entry)
        })
    }

    fn decoded(&self) -> impl Iterator<Item = Symbol> + 'f {
        let table = self.section.index;
        self.symbols().filter_map(move |entry| match entry {
            Ok(symbol) => Some(symbol),
            Err(err) => {
                debug!(table, %err, "Skipping undecodable symbol");
                None
            }
        })
    }

    /// The linked string table (`sh_link`)
    pub fn strings(&self) -> Result<StringTable<'f>> {
        self.file.string_table_at(u64::from(self.section.link()))
    }

    pub fn name(&self, symbol: &Symbol) -> Result<&'f str> {
        self.strings()?.resolve(u64::from(symbol.name_offset()))
    }

    /// Demangled name, or `None` when the name is not mangled
    pub fn demangled_name(&self, symbol: &Symbol) -> Result<Option<String>> {
        Ok(demangle(self.name(symbol)?).map(|(_, demangled)| demangled))
    }

    /// First symbol named `name`.
    ///
    /// Entries whose name cannot be resolved are skipped; a missing string
    /// table is an error.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Symbol>> {
        let strings = self.strings()?;
        for symbol in self.decoded() {
            match strings.resolve(u64::from(symbol.name_offset())) {
                Ok(found) if found == name => return Ok(Some(symbol)),
                Ok(_) => {}
                Err(err) => debug!(index = symbol.index, %err, "Skipping unnamed symbol"),
            }
        }
        Ok(None)
    }

    /// Defined symbols covering `addr`
    pub fn find_by_address(&self, addr: u64) -> impl Iterator<Item = Symbol> + 'f {
        self.decoded()
            .filter(move |symbol| !symbol.is_undefined() && symbol.contains_addr(addr))
    }

    /// Undefined symbols, excluding the null entry
    pub fn imports(&self) -> impl Iterator<Item = Symbol> + 'f {
        self.decoded()
            .filter(|symbol| symbol.index != 0 && symbol.is_undefined())
    }

    /// Defined global or weak symbols visible outside the object
    pub fn exports(&self) -> impl Iterator<Item = Symbol> + 'f {
        self.decoded().filter(|symbol| symbol.is_exported())
    }
}
