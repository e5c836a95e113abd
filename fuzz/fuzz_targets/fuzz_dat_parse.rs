#![no_main]

use libfuzzer_sys::fuzz_target;
use tinygp::DatFile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Parsing arbitrary text must return an error, never panic
    if let Ok(file) = DatFile::parse(text) {
        assert_eq!(file.dataset.len(), file.header.cases);
        assert_eq!(file.dataset.variables(), file.header.variables);
        for (inputs, _) in file.dataset.rows() {
            assert_eq!(inputs.len(), file.header.variables);
        }
    }
});
