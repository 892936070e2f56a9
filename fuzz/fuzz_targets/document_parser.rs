#![no_main]

use benchtrack::document::{parse_document, parse_range, parse_runs};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must reject bad input with an error, never a panic
        let _ = parse_range(input);
        if let Ok((document, _)) = parse_document(input) {
            for partition in document.entries.values() {
                let _ = parse_runs(partition);
            }
        }
    }
});
