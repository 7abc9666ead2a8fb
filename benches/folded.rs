use std::fs;

use criterion::*;
use profgraph::folded::{self, DecodeOptions, Decoder};

fn folded_benchmark(c: &mut Criterion, id: &str, infile: &str) {
    let fixture = fs::read_to_string(infile).expect("file not found");
    let (header, body) = fixture.split_once('\n').expect("fixture has a header line");
    // repeat the fixture so the numbers are not dominated by setup
    let text = format!("{}\n{}", header, body.repeat(200));
    let decoder = Decoder::from(DecodeOptions { timestamp: false });

    let mut group = c.benchmark_group("folded");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_with_input(BenchmarkId::new("decode", id), &text, |b, text| {
        b.iter(|| decoder.decode_str(text).unwrap())
    });

    let graph = decoder.decode_str(&text).unwrap();
    let opt = folded::Options { headers: true };
    group.bench_with_input(BenchmarkId::new("encode", id), &graph, |b, graph| {
        b.iter(|| folded::to_writer(&opt, graph, std::io::sink()).unwrap())
    });
    group.finish();
}

macro_rules! folded_benchmarks {
    ($($name:ident : $infile:expr),*) => {
        $(
            fn $name(c: &mut Criterion) {
                let id = stringify!($name);
                folded_benchmark(c, id, $infile);
            }
        )*

        criterion_group!(benches, $($name),*);
        criterion_main!(benches);
    }
}

folded_benchmarks! {
    multi: "tests/data/folded/multi.txt",
    contention: "tests/data/transforms/contention.txt"
}
