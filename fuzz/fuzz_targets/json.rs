#![no_main]

use libfuzzer_sys::fuzz_target;
use profgraph::json;

fuzz_target!(|data: &[u8]| {
    json::from_slice(data).ok();
});
