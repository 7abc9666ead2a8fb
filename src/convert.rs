//! One entry point for every conversion the command-line tools offer.
//!
//! A [`Transform`] is built once from command-line flags and then run over raw input
//! documents with [`Transform::execute`]. Graph inputs may be JSON, folded text or a
//! `heap_v2` heap profile; see [`InputFormat::detect`].

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use crate::delta;
use crate::error::{Error, Result};
use crate::folded;
use crate::graph::{ProfileGraph, SampleType};
use crate::heap;
use crate::json;
use crate::transform::{self, AnonymizeOptions, HeapAgeOptions, LabelFramesOptions};

/// The formats a graph can be read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// The JSON form written by [`json::to_writer`].
    Json,
    /// A jemalloc `heap_v2` profile.
    Heap,
    /// Folded stack text.
    Folded,
}

impl InputFormat {
    /// Guesses the format of a document from its first bytes.
    ///
    /// A document whose first non-whitespace byte is `{` is JSON, one whose first line starts
    /// with `heap_v2/` is a heap profile, and anything else is folded text.
    pub fn detect(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let rest = &bytes[start..];
        if rest.first() == Some(&b'{') {
            InputFormat::Json
        } else if rest.starts_with(b"heap_v2/") {
            InputFormat::Heap
        } else {
            InputFormat::Folded
        }
    }
}

/// Reads a graph from a document in any [`InputFormat`].
pub fn read_graph(bytes: &[u8]) -> Result<ProfileGraph> {
    let format = InputFormat::detect(bytes);
    debug!("reading input as {:?}", format);
    match format {
        InputFormat::Json => json::from_slice(bytes),
        InputFormat::Heap => heap::from_reader(bytes),
        InputFormat::Folded => folded::from_reader(bytes),
    }
}

/// Reads a whole input document from `path`, or from STDIN if `path` is `None` or `-`.
pub fn read_input<P>(path: Option<P>) -> io::Result<Vec<u8>>
where
    P: AsRef<Path>,
{
    match path {
        Some(ref p) if p.as_ref() != Path::new("-") => fs::read(p),
        _ => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// A fully configured conversion.
#[derive(Clone, Debug)]
pub enum Transform {
    /// JSON to folded text, or any other input to JSON.
    Folded {
        /// Write a sample type header and every value when producing folded text.
        headers: bool,
    },
    /// Any input to JSON.
    Json,
    /// Any input to the raw text dump.
    Raw,
    /// A `heap_v2` heap profile to JSON.
    Jemalloc,
    /// The difference of two graphs, as JSON.
    Delta {
        /// Sample types to compute the difference for. Empty means all.
        sample_types: Vec<SampleType>,
    },
    /// See [`transform::anonymize`].
    Anon(AnonymizeOptions),
    /// See [`transform::label_frames`].
    LabelFrames(LabelFramesOptions),
    /// See [`transform::heap_age`].
    HeapAge(HeapAgeOptions),
    /// See [`transform::avg`].
    Avg,
}

impl Transform {
    /// The command name, as used in the binary names.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Folded { .. } => "folded",
            Transform::Json => "json",
            Transform::Raw => "raw",
            Transform::Jemalloc => "jemalloc",
            Transform::Delta { .. } => "delta",
            Transform::Anon(_) => "anon",
            Transform::LabelFrames(_) => "labelframes",
            Transform::HeapAge(_) => "heapage",
            Transform::Avg => "avg",
        }
    }

    /// How many input documents the transform takes.
    pub fn inputs(&self) -> usize {
        match self {
            Transform::Delta { .. } => 2,
            _ => 1,
        }
    }

    /// Runs the transform over `inputs` and writes the result to `writer`.
    ///
    /// Nothing is written unless the whole conversion succeeds.
    pub fn execute<W>(&self, inputs: &[Vec<u8>], mut writer: W) -> Result<()>
    where
        W: Write,
    {
        if inputs.len() != self.inputs() {
            return Err(Error::UnsupportedCombination {
                command: self.name(),
                expected: self.inputs(),
                got: inputs.len(),
            });
        }
        let input = &inputs[0];

        let mut out = Vec::new();
        match self {
            Transform::Folded { headers } => match InputFormat::detect(input) {
                InputFormat::Json => {
                    let graph = json::from_slice(input)?;
                    let opt = folded::Options { headers: *headers };
                    folded::to_writer(&opt, &graph, &mut out)?;
                }
                _ => json::to_writer(&read_graph(input)?, &mut out)?,
            },
            Transform::Json => json::to_writer(&read_graph(input)?, &mut out)?,
            Transform::Raw => write!(out, "{}", read_graph(input)?)?,
            Transform::Jemalloc => json::to_writer(&heap::from_reader(&input[..])?, &mut out)?,
            Transform::Delta { sample_types } => {
                let a = read_graph(&inputs[0])?;
                let b = read_graph(&inputs[1])?;
                let opt = delta::Options {
                    sample_types: sample_types.clone(),
                };
                json::to_writer(&delta::delta(&opt, a, &b)?, &mut out)?;
            }
            Transform::Anon(opt) => {
                let mut graph = read_graph(input)?;
                transform::anonymize(&mut graph, opt);
                json::to_writer(&graph, &mut out)?;
            }
            Transform::LabelFrames(opt) => {
                let mut graph = read_graph(input)?;
                transform::label_frames(&mut graph, opt);
                json::to_writer(&graph, &mut out)?;
            }
            Transform::HeapAge(opt) => {
                let mut graph = read_graph(input)?;
                transform::heap_age(&mut graph, opt)?;
                json::to_writer(&graph, &mut out)?;
            }
            Transform::Avg => {
                let mut graph = read_graph(input)?;
                transform::avg(&mut graph)?;
                json::to_writer(&graph, &mut out)?;
            }
        }

        writer.write_all(&out)?;
        writer.flush()?;
        Ok(())
    }

    /// Like [`execute`](Self::execute), but reads each input with [`read_input`] and writes to
    /// STDOUT.
    pub fn execute_files<P>(&self, infiles: &[Option<P>]) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let mut inputs = Vec::with_capacity(infiles.len());
        for infile in infiles {
            inputs.push(read_input(infile.as_ref())?);
        }
        self.execute(&inputs, io::stdout().lock())
    }
}
