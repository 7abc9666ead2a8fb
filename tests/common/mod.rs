#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor};

use log::Level;
use pretty_assertions::assert_eq;
use profgraph::folded::{self, DecodeOptions, Decoder};
use profgraph::graph::ProfileGraph;
use testing_logger::CapturedLog;

pub fn compare_results<R, E>(result: R, mut expected: E, expected_file: &str)
where
    R: BufRead,
    E: BufRead,
{
    let mut buf = String::new();
    let mut line_num = 1;
    for line in result.lines() {
        let line = line.unwrap();
        if expected.read_line(&mut buf).unwrap() == 0 {
            panic!(
                "\noutput has more lines than expected result file: {}",
                expected_file
            );
        }
        assert_eq!(line, buf.trim_end(), "\n{}:{}", expected_file, line_num);
        buf.clear();
        line_num += 1;
    }

    if expected.read_line(&mut buf).unwrap() > 0 {
        panic!(
            "\n{} has more lines than output, beginning at line: {}",
            expected_file, line_num
        )
    }
}

/// Decodes a folded fixture without stamping it with the current time.
pub fn read_folded(path: &str) -> ProfileGraph {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to open input file '{}': {}", path, e));
    Decoder::from(DecodeOptions { timestamp: false })
        .decode_str(&text)
        .unwrap()
}

pub fn to_folded(graph: &ProfileGraph, headers: bool) -> Vec<u8> {
    let mut out = Vec::new();
    folded::to_writer(&folded::Options { headers }, graph, &mut out).unwrap();
    out
}

/// Compares `result` with the contents of `expected_file`, creating the file first if it does
/// not exist yet.
pub fn compare_to_file(result: &[u8], expected_file: &str) -> io::Result<()> {
    if let Err(e) = fs::metadata(expected_file) {
        if e.kind() == io::ErrorKind::NotFound {
            // be nice to the dev and make the file
            fs::write(expected_file, result)?;
        } else {
            eprintln!("Tried to open {}.", expected_file);
            return Err(e);
        }
    }

    // write out the result to /tmp for easy restoration
    let rand: u64 = rand::random();
    let tm = std::env::temp_dir().join(format!("test-{}.folded", rand));
    if fs::write(&tm, result).is_ok() {
        eprintln!("test output in {}", tm.display());
    }

    let expected = BufReader::new(File::open(expected_file)?);
    compare_results(Cursor::new(result), expected, expected_file);
    Ok(())
}

pub fn test_logs<R, F>(run: R, asserter: F)
where
    R: FnOnce(),
    F: Fn(&Vec<CapturedLog>),
{
    testing_logger::setup();
    run();
    testing_logger::validate(asserter);
}

pub fn count_logs(captured_logs: &[CapturedLog], prefix: &str, level: Level) -> usize {
    captured_logs
        .iter()
        .filter(|log| log.body.starts_with(prefix) && log.level == level)
        .count()
}
