//! Shared fixtures for the integration tests.
//!
//! [`ElfBuilder`] assembles small but structurally complete ELF images in any
//! class and byte order, so the decoders can be exercised without binary
//! samples checked into the repository.

#![allow(dead_code)]

use elfview::types::*;

/// Field encoder for one class and byte order
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    pub class: ElfClass,
    pub endian: ElfData,
}

impl Encoder {
    pub fn new(class: ElfClass, endian: ElfData) -> Self {
        Self { class, endian }
    }

    pub fn u16(&self, out: &mut Vec<u8>, value: u16) {
        match self.endian {
            ElfData::Little => out.extend_from_slice(&value.to_le_bytes()),
            ElfData::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn u32(&self, out: &mut Vec<u8>, value: u32) {
        match self.endian {
            ElfData::Little => out.extend_from_slice(&value.to_le_bytes()),
            ElfData::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn u64(&self, out: &mut Vec<u8>, value: u64) {
        match self.endian {
            ElfData::Little => out.extend_from_slice(&value.to_le_bytes()),
            ElfData::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    /// Address/offset/size field, truncated to 32 bits for ELF32
    pub fn word(&self, out: &mut Vec<u8>, value: u64) {
        match self.class {
            ElfClass::Elf32 => self.u32(out, value as u32),
            ElfClass::Elf64 => self.u64(out, value),
        }
    }

    pub fn symbol(
        &self,
        name: u32,
        value: u64,
        size: u64,
        info: u8,
        other: u8,
        shndx: u16,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        self.u32(&mut out, name);
        match self.class {
            ElfClass::Elf32 => {
                self.word(&mut out, value);
                self.word(&mut out, size);
                out.push(info);
                out.push(other);
                self.u16(&mut out, shndx);
            }
            ElfClass::Elf64 => {
                out.push(info);
                out.push(other);
                self.u16(&mut out, shndx);
                self.word(&mut out, value);
                self.word(&mut out, size);
            }
        }
        out
    }

    /// Dynamic entries followed by a `DT_NULL` terminator
    pub fn dynamic(&self, entries: &[(i64, u64)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(tag, value) in entries.iter().chain(std::iter::once(&(DT_NULL, 0))) {
            self.word(&mut out, tag as u64);
            self.word(&mut out, value);
        }
        out
    }

    fn relocation_info(&self, sym: u32, r_type: u32) -> u64 {
        match self.class {
            ElfClass::Elf32 => (u64::from(sym) << 8) | u64::from(r_type & 0xff),
            ElfClass::Elf64 => (u64::from(sym) << 32) | u64::from(r_type),
        }
    }

    pub fn rela(&self, offset: u64, sym: u32, r_type: u32, addend: i64) -> Vec<u8> {
        let mut out = Vec::new();
        self.word(&mut out, offset);
        self.word(&mut out, self.relocation_info(sym, r_type));
        self.word(&mut out, addend as u64);
        out
    }

    pub fn rel(&self, offset: u64, sym: u32, r_type: u32) -> Vec<u8> {
        let mut out = Vec::new();
        self.word(&mut out, offset);
        self.word(&mut out, self.relocation_info(sym, r_type));
        out
    }

    /// One note record; `name` carries its own NUL
    pub fn note(&self, name: &[u8], n_type: u32, desc: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        self.u32(&mut out, name.len() as u32);
        self.u32(&mut out, desc.len() as u32);
        self.u32(&mut out, n_type);
        out.extend_from_slice(name);
        pad_to(&mut out, 4);
        out.extend_from_slice(desc);
        pad_to(&mut out, 4);
        out
    }

    /// SysV hash table over `names`, indexed like the symbol table
    pub fn sysv_hash(&self, names: &[&str], nbucket: u32) -> Vec<u8> {
        let mut buckets = vec![0u32; nbucket as usize];
        let mut chains = vec![0u32; names.len()];
        for (index, name) in names.iter().enumerate().skip(1) {
            let bucket = (elfview::elf_hash(name.as_bytes()) % nbucket) as usize;
            chains[index] = buckets[bucket];
            buckets[bucket] = index as u32;
        }
        let mut out = Vec::new();
        self.u32(&mut out, nbucket);
        self.u32(&mut out, names.len() as u32);
        for value in buckets.into_iter().chain(chains) {
            self.u32(&mut out, value);
        }
        out
    }

    /// Single-bucket GNU hash table covering `names[symoffset..]`
    pub fn gnu_hash(&self, names: &[&str], symoffset: u32) -> Vec<u8> {
        let bits = u32::from(self.class.bits());
        let shift = 6;
        let hashed: Vec<u32> = names[symoffset as usize..]
            .iter()
            .map(|name| elfview::gnu_hash(name.as_bytes()))
            .collect();

        let mut bloom = 0u64;
        for &hash in &hashed {
            bloom |= 1u64 << (hash % bits);
            bloom |= 1u64 << ((hash >> shift) % bits);
        }

        let mut out = Vec::new();
        self.u32(&mut out, 1);
        self.u32(&mut out, symoffset);
        self.u32(&mut out, 1);
        self.u32(&mut out, shift);
        self.word(&mut out, bloom);
        self.u32(&mut out, if hashed.is_empty() { 0 } else { symoffset });
        for (position, &hash) in hashed.iter().enumerate() {
            let last = position + 1 == hashed.len();
            self.u32(&mut out, if last { hash | 1 } else { hash & !1 });
        }
        out
    }
}

fn pad_to(out: &mut Vec<u8>, alignment: usize) {
    while out.len() % alignment != 0 {
        out.push(0);
    }
}

fn align(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// NUL-separated string table under construction
#[derive(Debug, Clone)]
pub struct StringTableBuilder {
    data: Vec<u8>,
}

impl Default for StringTableBuilder {
    fn default() -> Self {
        Self { data: vec![0] }
    }
}

impl StringTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name`, returning its offset
    pub fn add(&mut self, name: &str) -> u32 {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        offset
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// One section to be laid out by [`ElfBuilder`]
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: Option<u64>,
    pub offset: Option<u64>,
    pub size: Option<u64>,
    pub link: u32,
    pub info: u32,
    pub align: u64,
    pub entsize: u64,
    pub data: Vec<u8>,
}

impl SectionSpec {
    pub fn new(name: &str, sh_type: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            sh_type,
            flags: 0,
            addr: None,
            offset: None,
            size: None,
            link: 0,
            info: 0,
            align: 1,
            entsize: 0,
            data,
        }
    }

    pub fn flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    pub fn alloc(self) -> Self {
        let flags = self.flags | SectionFlags::ALLOC.bits();
        self.flags(flags)
    }

    pub fn addr(mut self, addr: u64) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Place the section data at a fixed file offset
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Declared `sh_size`, independent of the bytes written
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn link(mut self, link: u32) -> Self {
        self.link = link;
        self
    }

    pub fn info(mut self, info: u32) -> Self {
        self.info = info;
        self
    }

    pub fn align(mut self, align: u64) -> Self {
        self.align = align;
        self
    }

    pub fn entsize(mut self, entsize: u64) -> Self {
        self.entsize = entsize;
        self
    }
}

/// File range covered by a program header
#[derive(Debug, Clone)]
pub enum Cover {
    /// The whole image, mapped at the builder's base address
    File,
    /// The span of the listed sections, mapped at the first one's address
    Sections(Vec<usize>),
    Raw {
        offset: u64,
        vaddr: u64,
        filesz: u64,
        memsz: u64,
    },
}

#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub p_type: u32,
    pub flags: SegmentFlags,
    pub cover: Cover,
    pub align: u64,
}

impl SegmentSpec {
    pub fn new(p_type: u32, flags: SegmentFlags, cover: Cover) -> Self {
        Self {
            p_type,
            flags,
            cover,
            align: 1,
        }
    }

    pub fn align(mut self, align: u64) -> Self {
        self.align = align;
        self
    }
}

/// Bytes plus the positions the builder chose
#[derive(Debug, Clone)]
pub struct ElfImage {
    pub bytes: Vec<u8>,
    pub phoff: u64,
    pub shoff: u64,
    /// `sh_offset` per section index, including the NULL section and
    /// `.shstrtab`
    pub section_offsets: Vec<u64>,
}

impl ElfImage {
    /// File offset of section header `index`
    pub fn section_header_offset(&self, index: usize, class: ElfClass) -> usize {
        (self.shoff + index as u64 * class.section_header_size()) as usize
    }
}

/// Assembles an ELF image: header, program headers, section data, a
/// generated `.shstrtab` and finally the section header table.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    pub enc: Encoder,
    pub e_type: u16,
    pub machine: u16,
    pub entry: u64,
    /// Address given to allocated sections without an explicit address,
    /// added to their file offset
    pub base: u64,
    sections: Vec<SectionSpec>,
    segments: Vec<SegmentSpec>,
}

impl ElfBuilder {
    pub fn new(class: ElfClass, endian: ElfData) -> Self {
        Self {
            enc: Encoder::new(class, endian),
            e_type: ET_EXEC,
            machine: EM_X86_64,
            entry: 0,
            base: 0,
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn le64() -> Self {
        Self::new(ElfClass::Elf64, ElfData::Little)
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn file_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    /// Add a section, returning its index (the NULL section is index 0)
    pub fn section(&mut self, spec: SectionSpec) -> usize {
        self.sections.push(spec);
        self.sections.len()
    }

    /// Index `.shstrtab` will receive
    pub fn shstrtab_index(&self) -> usize {
        self.sections.len() + 1
    }

    pub fn segment(&mut self, spec: SegmentSpec) -> usize {
        self.segments.push(spec);
        self.segments.len() - 1
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_image().bytes
    }

    pub fn build_image(&self) -> ElfImage {
        let enc = self.enc;
        let class = enc.class;

        let mut names = StringTableBuilder::new();
        let name_offsets: Vec<u32> = self.sections.iter().map(|s| names.add(&s.name)).collect();
        let shstrtab_name = names.add(".shstrtab");
        let shstrtab = SectionSpec::new(".shstrtab", SHT_STRTAB, names.bytes());

        let all: Vec<&SectionSpec> = self.sections.iter().chain(std::iter::once(&shstrtab)).collect();
        let shnum = all.len() as u64 + 1;
        let phnum = self.segments.len() as u64;

        let phoff = if phnum > 0 { class.file_header_size() } else { 0 };
        let mut cursor = class.file_header_size() + phnum * class.program_header_size();

        // Section placement
        let mut offsets = vec![0u64];
        let mut addrs = vec![0u64];
        for spec in &all {
            let offset = match spec.offset {
                Some(offset) => {
                    assert!(offset >= cursor, "section {} overlaps earlier data", spec.name);
                    offset
                }
                None => align(cursor, spec.align),
            };
            if spec.sh_type != SHT_NOBITS {
                cursor = offset + spec.data.len() as u64;
            }
            let addr = match spec.addr {
                Some(addr) => addr,
                None if spec.flags & SectionFlags::ALLOC.bits() != 0 => self.base + offset,
                None => 0,
            };
            offsets.push(offset);
            addrs.push(addr);
        }
        let shoff = align(cursor, 8);
        let total = shoff + shnum * class.section_header_size();

        let mut bytes = vec![0u8; total as usize];
        let mut put = |at: u64, chunk: &[u8]| {
            let at = at as usize;
            bytes[at..at + chunk.len()].copy_from_slice(chunk);
        };

        // File header
        let mut header = Vec::new();
        header.extend_from_slice(ELF_MAGIC);
        header.push(class as u8);
        header.push(enc.endian as u8);
        header.push(EV_CURRENT);
        header.resize(EI_NIDENT, 0);
        enc.u16(&mut header, self.e_type);
        enc.u16(&mut header, self.machine);
        enc.u32(&mut header, 1);
        enc.word(&mut header, self.entry);
        enc.word(&mut header, phoff);
        enc.word(&mut header, shoff);
        enc.u32(&mut header, 0);
        enc.u16(&mut header, class.file_header_size() as u16);
        enc.u16(&mut header, class.program_header_size() as u16);
        enc.u16(&mut header, phnum as u16);
        enc.u16(&mut header, class.section_header_size() as u16);
        enc.u16(&mut header, shnum as u16);
        enc.u16(&mut header, (shnum - 1) as u16);
        put(0, &header);

        // Program headers
        for (i, segment) in self.segments.iter().enumerate() {
            let (offset, vaddr, filesz, memsz) = match &segment.cover {
                Cover::File => (0, self.base, total, total),
                Cover::Sections(indices) => {
                    let start = indices.iter().map(|&i| offsets[i]).min().unwrap_or(0);
                    let end = indices
                        .iter()
                        .map(|&i| offsets[i] + all[i - 1].data.len() as u64)
                        .max()
                        .unwrap_or(start);
                    let first = indices
                        .iter()
                        .copied()
                        .min_by_key(|&i| offsets[i])
                        .unwrap_or(0);
                    (start, addrs[first], end - start, end - start)
                }
                Cover::Raw {
                    offset,
                    vaddr,
                    filesz,
                    memsz,
                } => (*offset, *vaddr, *filesz, *memsz),
            };
            let mut ph = Vec::new();
            enc.u32(&mut ph, segment.p_type);
            match class {
                ElfClass::Elf32 => {
                    for field in [offset, vaddr, vaddr, filesz, memsz] {
                        enc.word(&mut ph, field);
                    }
                    enc.u32(&mut ph, segment.flags.bits());
                    enc.word(&mut ph, segment.align);
                }
                ElfClass::Elf64 => {
                    enc.u32(&mut ph, segment.flags.bits());
                    for field in [offset, vaddr, vaddr, filesz, memsz, segment.align] {
                        enc.word(&mut ph, field);
                    }
                }
            }
            put(phoff + i as u64 * class.program_header_size(), &ph);
        }

        // Section data and headers; index 0 stays all zero
        for (position, spec) in all.iter().enumerate() {
            let index = position + 1;
            if spec.sh_type != SHT_NOBITS {
                put(offsets[index], &spec.data);
            }
            let name = if index == all.len() {
                shstrtab_name
            } else {
                name_offsets[position]
            };
            let size = spec.size.unwrap_or(spec.data.len() as u64);
            let mut sh = Vec::new();
            enc.u32(&mut sh, name);
            enc.u32(&mut sh, spec.sh_type);
            enc.word(&mut sh, spec.flags);
            enc.word(&mut sh, addrs[index]);
            enc.word(&mut sh, offsets[index]);
            enc.word(&mut sh, size);
            enc.u32(&mut sh, spec.link);
            enc.u32(&mut sh, spec.info);
            enc.word(&mut sh, spec.align);
            enc.word(&mut sh, spec.entsize);
            put(shoff + index as u64 * class.section_header_size(), &sh);
        }

        ElfImage {
            bytes,
            phoff,
            shoff,
            section_offsets: offsets,
        }
    }
}

/// Section indices of [`sample_executable`]
pub mod sample {
    pub const INTERP: usize = 1;
    pub const BUILD_ID: usize = 2;
    pub const DYNSYM: usize = 3;
    pub const DYNSTR: usize = 4;
    pub const HASH: usize = 5;
    pub const GNU_HASH: usize = 6;
    pub const TEXT: usize = 7;
    pub const RELA_DYN: usize = 8;
    pub const DYNAMIC: usize = 9;
    pub const SYMTAB: usize = 10;
    pub const STRTAB: usize = 11;
    pub const BSS: usize = 12;
    pub const SHSTRTAB: usize = 13;

    pub const DYNSTR_ADDR: u64 = 0x400;
    pub const TEXT_ADDR: u64 = 0x1000;
    pub const BSS_ADDR: u64 = 0x8000;
    pub const INTERP_PATH: &str = "/lib/ld-elfview.so.1";
    pub const BUILD_ID_BYTES: [u8; 20] = [
        0x3c, 0x1f, 0x5a, 0x90, 0x27, 0xee, 0x41, 0x08, 0xb6, 0x7d, 0x12, 0xc4, 0x5e, 0x99, 0x0a,
        0x63, 0xf1, 0x84, 0x2b, 0xd7,
    ];
    pub const RUST_SYMBOL: &str = "_ZN4core3fmt5write17h0123456789abcdefE";
    pub const CPP_SYMBOL: &str = "_Z3fooi";
}

/// Machine used by [`sample_executable`] for each layout
pub fn sample_machine(class: ElfClass, endian: ElfData) -> u16 {
    match (class, endian) {
        (ElfClass::Elf64, ElfData::Little) => EM_X86_64,
        (ElfClass::Elf32, ElfData::Little) => EM_386,
        (ElfClass::Elf64, ElfData::Big) => EM_AARCH64,
        (ElfClass::Elf32, ElfData::Big) => EM_ARM,
    }
}

/// A dynamically linked executable with symbol, hash, relocation, dynamic
/// and note sections, laid out at fixed addresses (see [`sample`]).
pub fn sample_executable(class: ElfClass, endian: ElfData) -> Vec<u8> {
    use sample::*;

    let mut builder = ElfBuilder::new(class, endian)
        .machine(sample_machine(class, endian))
        .entry(TEXT_ADDR);
    let enc = builder.enc;
    let symsize = class.symbol_size();
    let global_func = (STB_GLOBAL << 4) | STT_FUNC;

    // Dynamic strings and symbols
    let mut dynstr = StringTableBuilder::new();
    let libc = dynstr.add("libc.so.6");
    let runpath = dynstr.add("$ORIGIN/lib");
    let puts = dynstr.add("puts");
    let exported = dynstr.add("exported_fn");
    let dyn_names = ["", "puts", "exported_fn"];

    let mut dynsym = vec![0u8; symsize as usize];
    dynsym.extend(enc.symbol(puts, 0, 0, global_func, 0, SHN_UNDEF));
    dynsym.extend(enc.symbol(exported, TEXT_ADDR + 0x20, 0x10, global_func, 0, TEXT as u16));

    // Static strings and symbols
    let mut strtab = StringTableBuilder::new();
    let file_name = strtab.add("sample.c");
    let main = strtab.add("main");
    let helper = strtab.add("helper");
    let rust = strtab.add(RUST_SYMBOL);
    let cpp = strtab.add(CPP_SYMBOL);
    let counter = strtab.add("counter");

    let mut symtab = vec![0u8; symsize as usize];
    symtab.extend(enc.symbol(file_name, 0, 0, STT_FILE, 0, SHN_ABS));
    symtab.extend(enc.symbol(helper, TEXT_ADDR + 0x20, 0x10, STT_FUNC, STV_HIDDEN, TEXT as u16));
    symtab.extend(enc.symbol(main, TEXT_ADDR, 0x20, global_func, 0, TEXT as u16));
    symtab.extend(enc.symbol(rust, TEXT_ADDR + 0x30, 0x8, global_func, 0, TEXT as u16));
    symtab.extend(enc.symbol(cpp, TEXT_ADDR + 0x38, 0x8, global_func, 0, TEXT as u16));
    symtab.extend(enc.symbol(
        counter,
        BSS_ADDR,
        4,
        (STB_GLOBAL << 4) | STT_OBJECT,
        0,
        BSS as u16,
    ));

    // GLOB_DAT against `puts`, then a RELATIVE with no symbol (x86 numbering)
    let mut rela = enc.rela(0x2000, 1, 6, 0);
    rela.extend(enc.rela(0x2008, 0, 8, 0x1010));

    let dynstr_bytes = dynstr.bytes();
    let dynamic = enc.dynamic(&[
        (DT_NEEDED, u64::from(libc)),
        (DT_RUNPATH, u64::from(runpath)),
        (DT_STRTAB, DYNSTR_ADDR),
        (DT_STRSZ, dynstr_bytes.len() as u64),
        (DT_FLAGS, DF_BIND_NOW),
        (DT_FLAGS_1, DF_1_NOW | DF_1_PIE),
        (DT_INIT, TEXT_ADDR),
        (DT_INIT_ARRAY, 0x3000),
        (DT_INIT_ARRAYSZ, 2 * class.word_size()),
    ]);

    let mut interp = INTERP_PATH.as_bytes().to_vec();
    interp.push(0);

    let interp_idx = builder.section(SectionSpec::new(".interp", SHT_PROGBITS, interp).alloc());
    let note_idx = builder.section(
        SectionSpec::new(
            ".note.gnu.build-id",
            SHT_NOTE,
            enc.note(b"GNU\0", NT_GNU_BUILD_ID, &BUILD_ID_BYTES),
        )
        .alloc()
        .align(4),
    );
    builder.section(
        SectionSpec::new(".dynsym", SHT_DYNSYM, dynsym)
            .alloc()
            .link(DYNSTR as u32)
            .info(1)
            .align(8)
            .entsize(symsize),
    );
    builder.section(
        SectionSpec::new(".dynstr", SHT_STRTAB, dynstr_bytes)
            .alloc()
            .at(DYNSTR_ADDR),
    );
    builder.section(
        SectionSpec::new(".hash", SHT_HASH, enc.sysv_hash(&dyn_names, 3))
            .alloc()
            .link(DYNSYM as u32)
            .align(4)
            .entsize(4),
    );
    builder.section(
        SectionSpec::new(".gnu.hash", SHT_GNU_HASH, enc.gnu_hash(&dyn_names, 1))
            .alloc()
            .link(DYNSYM as u32)
            .align(8),
    );
    builder.section(
        SectionSpec::new(".text", SHT_PROGBITS, vec![0xc3; 0x40])
            .flags((SectionFlags::ALLOC | SectionFlags::EXECINSTR).bits())
            .at(TEXT_ADDR)
            .align(16),
    );
    builder.section(
        SectionSpec::new(".rela.dyn", SHT_RELA, rela)
            .alloc()
            .link(DYNSYM as u32)
            .align(8)
            .entsize(class.relocation_size(true)),
    );
    let dynamic_idx = builder.section(
        SectionSpec::new(".dynamic", SHT_DYNAMIC, dynamic)
            .flags((SectionFlags::ALLOC | SectionFlags::WRITE).bits())
            .link(DYNSTR as u32)
            .align(8)
            .entsize(class.dynamic_entry_size()),
    );
    builder.section(
        SectionSpec::new(".symtab", SHT_SYMTAB, symtab)
            .link(STRTAB as u32)
            .info(3)
            .align(8)
            .entsize(symsize),
    );
    builder.section(SectionSpec::new(".strtab", SHT_STRTAB, strtab.bytes()));
    builder.section(
        SectionSpec::new(".bss", SHT_NOBITS, Vec::new())
            .flags((SectionFlags::ALLOC | SectionFlags::WRITE).bits())
            .addr(BSS_ADDR)
            .size(0x100)
            .align(8),
    );
    assert_eq!(builder.shstrtab_index(), SHSTRTAB);

    builder.segment(SegmentSpec::new(
        PT_INTERP,
        SegmentFlags::R,
        Cover::Sections(vec![interp_idx]),
    ));
    builder.segment(
        SegmentSpec::new(PT_LOAD, SegmentFlags::R | SegmentFlags::X, Cover::File).align(0x1000),
    );
    builder.segment(
        SegmentSpec::new(
            PT_LOAD,
            SegmentFlags::R | SegmentFlags::W,
            Cover::Raw {
                offset: 0,
                vaddr: BSS_ADDR,
                filesz: 0,
                memsz: 0x100,
            },
        )
        .align(0x1000),
    );
    builder.segment(SegmentSpec::new(
        PT_NOTE,
        SegmentFlags::R,
        Cover::Sections(vec![note_idx]),
    ));
    builder.segment(SegmentSpec::new(
        PT_DYNAMIC,
        SegmentFlags::R | SegmentFlags::W,
        Cover::Sections(vec![dynamic_idx]),
    ));

    builder.build()
}

/// The four class/byte-order combinations
pub fn all_layouts() -> [(ElfClass, ElfData); 4] {
    [
        (ElfClass::Elf32, ElfData::Little),
        (ElfClass::Elf32, ElfData::Big),
        (ElfClass::Elf64, ElfData::Little),
        (ElfClass::Elf64, ElfData::Big),
    ]
}
