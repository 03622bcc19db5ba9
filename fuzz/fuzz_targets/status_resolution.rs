#![no_main]

use libfuzzer_sys::fuzz_target;
use poolwatch_pipeline::parser::AccessLogParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let parser = AccessLogParser::new();
        if let Ok(record) = parser.parse(line) {
            // 해석은 어떤 입력에서도 패닉 없이 유효한 상태 코드를 반환해야 함
            let _ = record.resolved_status();
        }
    }
});
