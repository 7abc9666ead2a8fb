#![no_main]

use libfuzzer_sys::fuzz_target;
use profgraph::heap;

fuzz_target!(|data: &[u8]| {
    if let Ok(graph) = heap::from_reader(data) {
        graph.check_valid().unwrap();
    }
});
