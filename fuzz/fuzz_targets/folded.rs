#![no_main]

use libfuzzer_sys::fuzz_target;
use profgraph::folded::{self, DecodeOptions, Decoder};

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return,
    };
    let decoder = Decoder::from(DecodeOptions { timestamp: false });
    if let Ok(graph) = decoder.decode_str(text) {
        // anything that decodes must encode
        folded::to_writer(&folded::Options { headers: true }, &graph, std::io::sink()).unwrap();
    }
});
