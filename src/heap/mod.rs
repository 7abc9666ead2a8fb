//! Parser for the legacy `heap_v2` text heap profile written by jemalloc.
//!
//! ```text
//! heap_v2/524288
//!   t*: 28106: 56637512 [0: 0]
//! @ 0x7f8a1c9d2f41 0x55d0a5b4c3e2 0x55d0a5b4a011
//!   t0: 12: 3072 [0: 0]
//!   t3: 2: 512 [0: 0]
//!
//! MAPPED_LIBRARIES:
//! 55d0a5b00000-55d0a5c00000 r-xp 00000000 08:01 393228 /usr/bin/server
//! ```
//!
//! Each `@` line is a backtrace; the `t<tid>:` lines after it give the number of sampled
//! live allocations and their total size for one thread. The sentinel line starts a memory
//! map in `/proc/<pid>/maps` layout.

use std::collections::BTreeMap;
use std::io::prelude::*;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::graph::{
    Frame, FrameInterner, InterningPolicy, LocationId, Mapping, ProfileGraph, Sample, SampleType,
};

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^heap_v2/*(\d+)$").unwrap());
static THREAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^t(\d+): (-?\d+): *(-?\d+) *\[ *(\d+): *(\d+) *\]").unwrap()
});
static THREAD_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^t\d+:").unwrap());
static BACKTRACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@((?:\s+0x[0-9a-f]+)*)\s*$").unwrap());
static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x([0-9a-f]+)").unwrap());
static MAPS_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-f]+)-([0-9a-f]+)\s+([-rwxps]{4})\s+([0-9a-f]+)\s+\S+\s+\d+\s*(.*)$")
        .unwrap()
});

const MEMORY_MAP_SENTINELS: &[&str] = &["--- Memory map: ---", "MAPPED_LIBRARIES:"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    ExpectHeader,
    Blocks,
    MemoryMap,
}

#[derive(Clone, Debug)]
struct ThreadValue {
    values: Vec<i64>,
    blocksize: i64,
}

struct Parser {
    state: State,
    graph: ProfileGraph,
    interner: FrameInterner<u64>,
    /// Locations of the current backtrace, leaf first. Empty before the first `@` line.
    stack: Vec<LocationId>,
    /// Thread lines of the current backtrace, keyed by thread id.
    threads: BTreeMap<u64, ThreadValue>,
}

/// Parses a `heap_v2` profile.
///
/// Values are corrected for jemalloc's Poisson sampling (see [`scale_heap_sample`]). Every
/// distinct call-site address becomes one location, shared by all samples whose backtrace
/// contains it.
pub fn from_reader<R>(mut reader: R) -> Result<ProfileGraph>
where
    R: BufRead,
{
    let mut parser = Parser::new();
    let mut line = String::new();
    let mut n = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        n += 1;
        parser.on_line(n, line.trim_end())?;
    }
    parser.finish()
}

/// Parses a `heap_v2` profile held in memory.
pub fn from_str(text: &str) -> Result<ProfileGraph> {
    from_reader(text.as_bytes())
}

impl Parser {
    fn new() -> Self {
        let mut graph = ProfileGraph::new(vec![
            SampleType::new("objects", "count"),
            SampleType::new("space", "bytes"),
        ]);
        graph.period_type = Some(SampleType::new("space", "bytes"));
        Self {
            state: State::ExpectHeader,
            graph,
            interner: FrameInterner::new(InterningPolicy::ByKey),
            stack: Vec::new(),
            threads: BTreeMap::new(),
        }
    }

    fn on_line(&mut self, n: usize, line: &str) -> Result<()> {
        match self.state {
            State::ExpectHeader => {
                self.graph.period = parse_header(line)?;
                self.state = State::Blocks;
                Ok(())
            }
            State::Blocks => self.on_block_line(n, line.trim()),
            State::MemoryMap => {
                self.on_memory_map_line(line.trim());
                Ok(())
            }
        }
    }

    fn on_block_line(&mut self, n: usize, line: &str) -> Result<()> {
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        if is_memory_map_sentinel(line) {
            self.flush();
            self.state = State::MemoryMap;
            return Ok(());
        }

        if line.starts_with('@') {
            // the next backtrace completes the previous one
            self.flush();
            let captures = BACKTRACE
                .captures(line)
                .ok_or_else(|| Error::format(n, line, "expected @ followed by hex addresses"))?;
            self.stack = self.parse_backtrace(n, line, &captures[1])?;
            return Ok(());
        }

        if THREAD_PREFIX.is_match(line) {
            if self.stack.is_empty() {
                debug!("Skipping thread line before first backtrace: {}", line);
                return Ok(());
            }
            let (tid, value) = parse_thread_line(n, line, self.graph.period)?;
            self.threads.insert(tid, value);
            return Ok(());
        }

        trace!("Ignoring line {}: {}", n, line);
        Ok(())
    }

    fn on_memory_map_line(&mut self, line: &str) {
        let captures = match MAPS_ENTRY.captures(line) {
            Some(c) => c,
            None => {
                if !line.is_empty() {
                    trace!("Ignoring memory map line: {}", line);
                }
                return;
            }
        };
        if !captures[3].contains('x') {
            return;
        }
        let parse = |s: &str| u64::from_str_radix(s, 16).ok();
        match (parse(&captures[1]), parse(&captures[2]), parse(&captures[4])) {
            (Some(start), Some(limit), Some(offset)) => {
                self.graph.add_mapping(Mapping {
                    start,
                    limit,
                    offset,
                    file: captures[5].trim().to_string(),
                    ..Default::default()
                });
            }
            _ => debug!("Ignoring memory map line with oversized address: {}", line),
        }
    }

    fn parse_backtrace(&mut self, n: usize, line: &str, addrs: &str) -> Result<Vec<LocationId>> {
        let mut stack = Vec::new();
        for hex in HEX.captures_iter(addrs) {
            let addr = u64::from_str_radix(&hex[1], 16).map_err(|_| {
                let reason = format!("failed to parse {} as a 64-bit hex number", &hex[0]);
                Error::format(n, line, reason)
            })?;
            // Return addresses point at the instruction after the call; step back onto it.
            let addr = addr.wrapping_sub(1);
            let name = format!("{:#x}", addr);
            let frame = Frame {
                name: &name,
                mapping: None,
                address: Some(addr),
            };
            stack.push(self.interner.location(&mut self.graph, addr, frame));
        }
        Ok(stack)
    }

    // Emits one sample per thread of the current backtrace, in thread id order.
    fn flush(&mut self) {
        if self.stack.is_empty() || self.threads.is_empty() {
            self.threads.clear();
            return;
        }
        for (tid, tv) in std::mem::take(&mut self.threads) {
            let mut sample = Sample {
                locations: self.stack.clone(),
                values: tv.values,
                ..Default::default()
            };
            sample.labels.insert("thread".into(), vec![tid.to_string()]);
            sample
                .numeric_labels
                .insert("bytes".into(), vec![tv.blocksize]);
            self.graph.samples.push(sample);
        }
    }

    fn finish(mut self) -> Result<ProfileGraph> {
        if self.state == State::ExpectHeader {
            return Err(Error::UnrecognizedFormat);
        }
        self.flush();
        self.assign_mappings();
        debug!(
            "parsed {} heap samples over {} locations",
            self.graph.samples.len(),
            self.interner.len()
        );
        self.graph.check_valid()?;
        Ok(self.graph)
    }

    fn assign_mappings(&mut self) {
        let ranges: Vec<_> = self
            .graph
            .mappings()
            .map(|m| (m.id, m.start, m.limit))
            .collect();
        if ranges.is_empty() {
            return;
        }
        for location in self.graph.locations_mut() {
            if let Some(addr) = location.address {
                location.mapping = ranges
                    .iter()
                    .find(|(_, start, limit)| *start <= addr && addr < *limit)
                    .map(|(id, _, _)| *id);
            }
        }
    }
}

fn parse_header(line: &str) -> Result<i64> {
    let captures = HEADER.captures(line).ok_or(Error::UnrecognizedFormat)?;
    captures[1]
        .parse::<i64>()
        .map_err(|_| Error::UnrecognizedFormat)
}

fn is_memory_map_sentinel(line: &str) -> bool {
    MEMORY_MAP_SENTINELS.iter().any(|s| line.contains(s))
}

fn parse_thread_line(n: usize, line: &str, rate: i64) -> Result<(u64, ThreadValue)> {
    let captures = THREAD
        .captures(line)
        .ok_or_else(|| Error::format(n, line, "expected t<tid>: <count>: <size> [<n>: <total>]"))?;

    let tid = captures[1]
        .parse::<u64>()
        .map_err(|e| Error::value(n, line, format!("thread id: {}", e)))?;
    let count = captures[2]
        .parse::<i64>()
        .map_err(|e| Error::value(n, line, format!("count: {}", e)))?;
    let size = captures[3]
        .parse::<i64>()
        .map_err(|e| Error::value(n, line, format!("size: {}", e)))?;

    if count == 0 && size != 0 {
        return Err(Error::value(
            n,
            line,
            format!("inuse count was 0 but inuse bytes was {}", size),
        ));
    }
    let blocksize = if count != 0 { size.saturating_div(count) } else { 0 };
    let (count, size) = scale_heap_sample(count, size, rate);
    Ok((
        tid,
        ThreadValue {
            values: vec![count, size],
            blocksize,
        },
    ))
}

/// Estimates the true allocation count and volume behind a sampled heap record.
///
/// jemalloc samples allocations with a Poisson process of mean period `rate` bytes, so an
/// allocation of size `s` is recorded with probability `1 - exp(-s/rate)`. Dividing by that
/// probability, computed for the average allocation size, undoes the sampling. A `rate` of 1
/// means every allocation was recorded and anything below is treated as unknown; neither is
/// scaled.
pub fn scale_heap_sample(count: i64, size: i64, rate: i64) -> (i64, i64) {
    if count == 0 || size == 0 {
        return (0, 0);
    }
    if rate <= 1 {
        return (count, size);
    }

    let avg_size = size as f64 / count as f64;
    let scale = 1.0 / (1.0 - (-avg_size / rate as f64).exp());
    ((count as f64 * scale) as i64, (size as f64 * scale) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_matches_poisson_correction() {
        assert_eq!(scale_heap_sample(0, 100, 10), (0, 0));
        assert_eq!(scale_heap_sample(10, 0, 10), (0, 0));
        assert_eq!(scale_heap_sample(10, 100, 1), (10, 100));
        assert_eq!(scale_heap_sample(10, 100, 0), (10, 100));

        // avg 10, rate 10: scale = 1 / (1 - e^-1) = 1.58197...
        assert_eq!(scale_heap_sample(10, 100, 10), (15, 158));
    }

    #[test]
    fn header() {
        assert_eq!(parse_header("heap_v2/524288").unwrap(), 524288);
        assert_eq!(parse_header("heap_v2//42").unwrap(), 42);
        assert!(matches!(
            parse_header("heap_v3/1"),
            Err(Error::UnrecognizedFormat)
        ));
        assert!(matches!(
            parse_header("heap_v2/abc"),
            Err(Error::UnrecognizedFormat)
        ));
    }

    #[test]
    fn thread_line() {
        let (tid, tv) = parse_thread_line(1, "t3: 4: 4096 [0: 0]", 1).unwrap();
        assert_eq!(tid, 3);
        assert_eq!(tv.values, vec![4, 4096]);
        assert_eq!(tv.blocksize, 1024);

        assert!(matches!(
            parse_thread_line(7, "t3: 4 4096", 1),
            Err(Error::Format { line: 7, .. })
        ));
        assert!(matches!(
            parse_thread_line(1, "t3: 0: 4096 [0: 0]", 1),
            Err(Error::Value { .. })
        ));
    }

    #[test]
    fn sentinel() {
        assert!(is_memory_map_sentinel("MAPPED_LIBRARIES:"));
        assert!(is_memory_map_sentinel("--- Memory map: ---"));
        assert!(!is_memory_map_sentinel("@ 0x1"));
    }
}
