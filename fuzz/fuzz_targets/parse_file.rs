#![no_main]
use elfview::ElfFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(file) = ElfFile::parse(data) else {
        return;
    };
    let _ = file.find_symbol("main");
    let _ = file.resolve_address(file.header().entry_point());
    let _ = file.lookup_dynamic_symbol("printf");
    let _ = file.build_id();
    let _ = file.interpreter();
    if let Ok(Some(dynamic)) = file.dynamic() {
        let _ = dynamic.needed_libraries();
        let _ = dynamic.soname();
        let _ = dynamic.runpath();
    }
    if let Ok(sections) = file.relocation_sections() {
        for section in sections {
            for relocation in section.entries().take(256).flatten() {
                let _ = section.symbol(&relocation);
            }
        }
    }
    if let Ok(sections) = file.sections() {
        for section in sections.iter().flatten() {
            let _ = sections.name(section);
            if let Ok(notes) = file.notes(section) {
                notes.for_each(drop);
            }
        }
    }
});
