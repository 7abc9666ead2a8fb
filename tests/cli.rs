mod common;

use std::process::Command;

use assert_cmd::cargo::CommandCargoExt;
use pretty_assertions::assert_eq;

fn run(bin: &str, args: &[&str]) -> Vec<u8> {
    let output = Command::cargo_bin(bin)
        .unwrap()
        .args(args)
        .output()
        .expect("failed to execute process");
    assert!(
        output.status.success(),
        "{} failed: {}",
        bin,
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

fn pipe(bin: &str, args: &[&str], stdin: Vec<u8>) -> Vec<u8> {
    let output = assert_cmd::Command::cargo_bin(bin)
        .unwrap()
        .args(args)
        .write_stdin(stdin)
        .output()
        .expect("failed to execute process");
    assert!(
        output.status.success(),
        "{} failed: {}",
        bin,
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

#[test]
fn cli_folded_round_trip() {
    let infile = "./tests/data/folded/multi.txt";
    let json = run("profgraph-folded", &[infile]);
    assert_eq!(json.first(), Some(&b'{'));
    let folded = pipe("profgraph-folded", &["--headers"], json);
    common::compare_to_file(&folded, infile).unwrap();
}

#[test]
fn cli_jemalloc() {
    let json = run("profgraph-jemalloc", &["./tests/data/heap/simple.heap"]);
    let folded = pipe("profgraph-folded", &["--headers"], json);
    common::compare_to_file(&folded, "./tests/data/heap/results/simple.txt").unwrap();
}

#[test]
fn cli_json_detects_heap_profiles() {
    let a = run("profgraph-json", &["./tests/data/heap/simple.heap"]);
    let b = run("profgraph-jemalloc", &["./tests/data/heap/simple.heap"]);
    assert_eq!(a, b);
}

#[test]
fn cli_avg() {
    let json = run("profgraph-avg", &["./tests/data/transforms/contention.txt"]);
    let folded = pipe("profgraph-folded", &["--headers"], json);
    common::compare_to_file(&folded, "./tests/data/transforms/results/avg.txt").unwrap();
}

#[test]
fn cli_heapage() {
    let json = run(
        "profgraph-heapage",
        &["--period", "10s", "./tests/data/transforms/heap.txt"],
    );
    let folded = pipe("profgraph-folded", &["--headers"], json);
    common::compare_to_file(&folded, "./tests/data/transforms/results/heap_age.txt").unwrap();
}

#[test]
fn cli_labelframes() {
    let json = run(
        "profgraph-labelframes",
        &["--label", "thread", "./tests/data/heap/simple.heap"],
    );
    let folded = pipe("profgraph-folded", &["--headers"], json);
    common::compare_to_file(&folded, "./tests/data/transforms/results/labelframes.txt")
        .unwrap();
}

#[test]
fn cli_anon_reads_stdin() {
    let input = std::fs::read("./tests/data/delta/a.txt").unwrap();
    let json = pipe("profgraph-anon", &["-"], input);
    let folded = String::from_utf8(pipe("profgraph-folded", &[], json)).unwrap();
    assert_eq!(folded.lines().count(), 3);
    assert!(!folded.contains("main"));
    assert!(folded.ends_with(" 4\n"));
}

#[test]
fn cli_raw() {
    let raw = String::from_utf8(run("profgraph-raw", &["./tests/data/delta/a.txt"])).unwrap();
    assert!(raw.contains("Samples:\nsamples/count\n"));
    assert!(raw.contains("Locations\n"));
    assert!(raw.contains("Mappings\n1: 0x0/0x0/0x0  [FN]\n"));
}

#[test]
fn cli_reports_errors() {
    let output = Command::cargo_bin("profgraph-avg")
        .unwrap()
        .arg("./tests/data/delta/a.txt")
        .output()
        .expect("failed to execute process");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MissingSampleType"), "stderr: {}", stderr);
}

#[test]
fn cli_rejects_bad_flags() {
    let output = Command::cargo_bin("profgraph-delta")
        .unwrap()
        .args(["--sample-type", "bogus", "a", "b"])
        .output()
        .expect("failed to execute process");
    assert!(!output.status.success());

    let output = Command::cargo_bin("profgraph-anon")
        .unwrap()
        .args(["--allow", "(", "./tests/data/delta/a.txt"])
        .output()
        .expect("failed to execute process");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
