#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Event serialization must produce valid JSON for any input text
        let event = buildloop::LoopEvent::ChangedFiles {
            paths: content.lines().map(str::to_string).collect(),
            summary: content.to_string(),
        };
        let json = event.to_json();
        let _: serde_json::Value =
            serde_json::from_str(&json).expect("event JSON always parses");
    }
});
