//! Lazy, bounds-checked, read-only ELF decoding.
//!
//! [`ElfFile`] binds any [`ByteSource`] (a slice, `Vec<u8>`, `bytes::Bytes`,
//! a memory map or [`MappedFile`]), decodes the identification block and
//! file header up front and everything else on first access. 32- and 64-bit
//! files in either byte order are handled by one set of decoders driven by a
//! resolved [`Layout`].
//!
//! ```no_run
//! use elfview::{ElfFile, IoLimits, MappedFile};
//!
//! # fn main() -> elfview::Result<()> {
//! let source = MappedFile::open("/bin/ls", &IoLimits::default())?;
//! let file = ElfFile::parse(source)?;
//! if let Some(main) = file.find_symbol("main")? {
//!     println!("main at {:#x}", main.value());
//! }
//! if let Some(dynamic) = file.dynamic()? {
//!     for lib in dynamic.needed_libraries()? {
//!         println!("needs {lib}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod cache;

pub mod config;
pub mod cursor;
pub mod dynamic;
pub mod error;
pub mod file;
pub mod hash;
pub mod headers;
pub mod logging;
pub mod notes;
pub mod relocations;
pub mod sections;
pub mod segments;
pub mod source;
pub mod strings;
pub mod symbols;
pub mod types;

pub use config::{ElfConfig, IoLimits};
pub use cursor::Cursor;
pub use dynamic::{DynamicEntry, DynamicSection};
pub use error::{ElfError, Result};
pub use file::{AddressOwner, ElfFile};
pub use hash::{elf_hash, gnu_hash, GnuHashTable, SysvHashTable};
pub use headers::{ElfIdent, FileHeader, TableDescriptor};
pub use notes::{GnuProperty, Note, NoteIter};
pub use relocations::{relocation_type_name, Relocation, RelocationSection};
pub use sections::{Section, SectionHeader, SectionTable};
pub use segments::{ProgramHeader, Segment, SegmentTable};
pub use source::{ByteSource, MappedFile};
pub use strings::StringTable;
pub use symbols::{demangle, Symbol, SymbolFlavor, SymbolTable};
pub use types::{
    ElfClass, ElfData, ElfMachine, ElfType, Layout, SectionFlags, SectionType, SegmentFlags,
    SegmentType, SymbolBinding, SymbolSection, SymbolType, SymbolVisibility, TableKind,
};
