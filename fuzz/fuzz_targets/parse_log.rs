#![no_main]

use libfuzzer_sys::fuzz_target;
use taintpath::{events::TaintLog, ExtractConfig, PathExtractor};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let log = TaintLog::from_lines(text.lines());
    let extractor = PathExtractor::new(ExtractConfig {
        parallel: false,
        ..ExtractConfig::default()
    });
    let _ = extractor.paths(&extractor.reconstruct(log));
});
