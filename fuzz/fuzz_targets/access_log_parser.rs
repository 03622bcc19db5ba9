#![no_main]

use libfuzzer_sys::fuzz_target;
use poolwatch_pipeline::parser::AccessLogParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let parser = AccessLogParser::new();
        let _ = parser.parse(line);
    }
});
