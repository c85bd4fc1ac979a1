#![no_main]

use libfuzzer_sys::fuzz_target;
use vela_syntax::{CompileOptions, SourceMap, parser};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(source) = std::str::from_utf8(data) {
        let options = CompileOptions::default();
        let mut map = SourceMap::new();
        let _ = parser::parse_source("fuzz.vela", source, &options, &mut map);
    }
});
