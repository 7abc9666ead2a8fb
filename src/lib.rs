//! profgraph is a set of tools for moving profiling data between [folded stack] text and a
//! structured profile graph, and for rewriting that graph along the way. The graph follows
//! the layout of the [pprof] profile format: samples refer to locations, locations to
//! functions and mappings, and everything is tied together by ids.
//!
//! The crate has four engines, each usable on its own:
//!
//!  - [`folded`] decodes folded stack text into a [`ProfileGraph`](graph::ProfileGraph) and
//!    encodes a graph back into folded text.
//!  - [`delta`] subtracts one profile from another, stack by stack.
//!  - [`heap`] reads the `heap_v2` heap profiles that jemalloc writes, correcting the sampled
//!    values for jemalloc's sampling rate.
//!  - [`transform`] anonymizes function names, turns sample labels into frames, estimates
//!    the age of live heap objects and averages contention delays.
//!
//! # Command-line use
//!
//! Every conversion is also available as a `profgraph-*` binary. The binaries read graphs
//! as folded text, as `heap_v2` profiles or in the JSON form of the [`json`] module, and
//! write JSON, so they can be chained:
//!
//! ```console
//! $ profgraph-jemalloc jeprof.1234.0.heap > heap.json
//! $ profgraph-anon heap.json | profgraph-folded --headers > heap.folded
//! ```
//!
//! Comparing two profiles works the same way:
//!
//! ```console
//! $ profgraph-delta --sample-type samples/count before.folded after.folded \
//!     | profgraph-folded > delta.folded
//! ```
//!
//! # Programmatic access
//!
//! ```
//! use profgraph::folded::{self, DecodeOptions, Decoder};
//! use profgraph::delta;
//!
//! # fn main() -> profgraph::Result<()> {
//! let decoder = Decoder::from(DecodeOptions { timestamp: false });
//! let a = decoder.decode_str("main;foo 5\nmain;foobar 4\n")?;
//! let b = decoder.decode_str("main;foo 8\nmain;foobar 5\n")?;
//!
//! let d = delta::delta(&delta::Options::default(), a, &b)?;
//! let mut out = Vec::new();
//! folded::to_writer(&folded::Options::default(), &d, &mut out)?;
//! assert_eq!(out, b"main;foo 3\nmain;foobar 1\n");
//! # Ok(())
//! # }
//! ```
//!
//!   [folded stack]: http://www.brendangregg.com/flamegraphs.html
//!   [pprof]: https://github.com/google/pprof/blob/main/proto/profile.proto

#![deny(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
extern crate log;

mod error;

pub use error::{Error, Result};

/// The profile graph model shared by every engine.
///
/// See the [crate-level documentation] for details.
///
///   [crate-level documentation]: ../index.html
pub mod graph;

pub mod folded;

/// Per-stack difference of two profiles.
///
/// Given profiles `a` and `b`, [`delta::delta`] returns a profile with `b - a` for every
/// stack; stacks that only occur in `a` come out negative.
pub mod delta;

pub mod heap;

pub mod transform;

pub mod json;

pub mod convert;
