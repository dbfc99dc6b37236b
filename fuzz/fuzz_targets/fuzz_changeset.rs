#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Arbitrary newline-separated paths - construction and the summary
        // line should never panic
        let paths: Vec<PathBuf> = content.lines().map(PathBuf::from).collect();
        let changes = buildloop::ChangeSet::new(paths);
        let _ = changes.describe();
    }
});
