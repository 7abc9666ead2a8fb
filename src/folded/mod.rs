//! Conversion between folded stack text and [`ProfileGraph`]s.
//!
//! A folded document has one line per stack: the frames, root first and separated by `;`,
//! followed by one integer value per sample type.
//!
//! ```text
//! samples/count duration/nanoseconds
//! main;foo 5 50000000
//! main;foo;bar 3 30000000
//! ```
//!
//! The optional first line lists the sample types as `type/unit` pairs. Without it, values
//! are `samples/count`.

mod header;

pub use header::{HeaderDetector, NoHeader, SlashTokens};

use std::io::prelude::*;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::graph::{
    Frame, FrameInterner, InterningPolicy, Mapping, ProfileGraph, Sample, SampleType,
};

/// Configure how graphs are written as folded text.
///
/// All options default to off.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Start the output with a line listing the sample types, and write every value of each
    /// sample instead of only the first one.
    pub headers: bool,
}

/// Configure how folded text is read.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// Stamp the graph with the current time. Default is on.
    pub timestamp: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { timestamp: true }
    }
}

/// Reads folded text into a [`ProfileGraph`].
///
/// To construct one, use `Decoder::default()` for the usual `type/unit` header detection, or
/// [`Decoder::new`] to choose how headers are recognized.
#[derive(Debug)]
pub struct Decoder<D = SlashTokens> {
    detector: D,
    opt: DecodeOptions,
}

impl Default for Decoder<SlashTokens> {
    fn default() -> Self {
        Self::new(SlashTokens, DecodeOptions::default())
    }
}

impl From<DecodeOptions> for Decoder<SlashTokens> {
    fn from(opt: DecodeOptions) -> Self {
        Self::new(SlashTokens, opt)
    }
}

impl<D> Decoder<D>
where
    D: HeaderDetector,
{
    /// Creates a decoder that recognizes headers with `detector`.
    pub fn new(detector: D, opt: DecodeOptions) -> Self {
        Self { detector, opt }
    }

    /// Decodes the folded text read from `reader`.
    pub fn decode<R>(&self, mut reader: R) -> Result<ProfileGraph>
    where
        R: Read,
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.decode_str(&text)
    }

    /// Decodes folded text.
    ///
    /// Every frame occurrence becomes its own function and location; nothing is shared
    /// between stacks. The graph is validated before it is returned.
    pub fn decode_str(&self, text: &str) -> Result<ProfileGraph> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .peekable();

        let sample_types = match lines.peek() {
            Some((_, first)) => match self.detector.detect(first) {
                Some(sample_types) => {
                    lines.next();
                    sample_types
                }
                None => vec![SampleType::new("samples", "count")],
            },
            None => vec![SampleType::new("samples", "count")],
        };
        let nvalues = sample_types.len();

        let mut graph = ProfileGraph::new(sample_types);
        if self.opt.timestamp {
            graph.time_nanos = now_nanos();
        }
        let mapping = graph.add_mapping(Mapping {
            has_functions: true,
            ..Default::default()
        });

        let mut interner = FrameInterner::new(InterningPolicy::PerOccurrence);
        for (n, line) in lines {
            let (stack, values) = split_last_n(line, nvalues).ok_or_else(|| {
                Error::format(n, line, format!("expected a stack and {} value(s)", nvalues))
            })?;

            let mut sample = Sample {
                values: Vec::with_capacity(nvalues),
                ..Default::default()
            };
            for value in values {
                let value = value
                    .parse::<i64>()
                    .map_err(|e| Error::value(n, line, format!("{:?}: {}", value, e)))?;
                sample.values.push(value);
            }

            // frames are written root first, samples store them leaf first
            for name in stack.split(';').rev() {
                let frame = Frame {
                    name,
                    mapping: Some(mapping),
                    address: None,
                };
                sample.locations.push(interner.location(&mut graph, (), frame));
            }
            graph.samples.push(sample);
        }

        debug!("decoded {} folded stacks", graph.samples.len());
        graph.check_valid()?;
        Ok(graph)
    }
}

/// Decodes folded text with the default [`Decoder`].
pub fn from_reader<R>(reader: R) -> Result<ProfileGraph>
where
    R: Read,
{
    Decoder::default().decode(reader)
}

/// Writes `graph` as folded text, one line per sample in graph order.
pub fn to_writer<W>(opt: &Options, graph: &ProfileGraph, mut writer: W) -> Result<()>
where
    W: Write,
{
    graph.check_valid()?;

    if opt.headers {
        let header: Vec<String> = graph.sample_types().iter().map(|st| st.to_string()).collect();
        writeln!(writer, "{}", header.join(" "))?;
    }

    let mut frames = Vec::new();
    let mut buffer = itoa::Buffer::new();
    for sample in &graph.samples {
        frames.clear();
        frames.extend(graph.frame_names(sample));
        frames.reverse();

        let mut first = true;
        for frame in &frames {
            if !first {
                writer.write_all(b";")?;
            }
            first = false;
            writer.write_all(frame.as_bytes())?;
        }

        let nvalues = if opt.headers { sample.values.len() } else { 1 };
        for value in sample.values.iter().take(nvalues) {
            writer.write_all(b" ")?;
            writer.write_all(buffer.format(*value).as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

// Splits the last `n` whitespace-separated tokens off a line. The stack itself may contain
// spaces, so everything before those tokens is the stack.
fn split_last_n(line: &str, n: usize) -> Option<(&str, Vec<&str>)> {
    let mut rest = line.trim_end();
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        let i = rest.rfind(char::is_whitespace)?;
        values.push(&rest[i + 1..]);
        rest = rest[..i].trim_end();
    }
    if rest.is_empty() {
        return None;
    }
    values.reverse();
    Some((rest, values))
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
