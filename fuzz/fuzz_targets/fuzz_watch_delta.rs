#![no_main]

use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Split the input into a "previous" set and a "current" list and
        // check the delta invariants hold for arbitrary path text
        let mut lines = content.lines();
        let previous: BTreeSet<PathBuf> =
            lines.by_ref().take_while(|l| *l != "--").map(PathBuf::from).collect();
        let current: Vec<PathBuf> = lines.map(PathBuf::from).collect();

        let delta = buildloop::watch_delta(&previous, &current);
        assert!(delta.added.is_disjoint(&previous));
        assert!(delta.removed.is_subset(&previous));
    }
});
