//! Transformations that rewrite a [`ProfileGraph`](crate::graph::ProfileGraph) in place.
//!
//! - [`anonymize`] hides function and file names behind human-readable hashes.
//! - [`label_frames`] turns a sample label into a synthetic root frame.
//! - [`heap_age`] adds a leaf frame with the average age of live heap objects.
//! - [`avg`] turns total contention delay into delay per contention.
//!
//! Every transform leaves the graph valid.

mod anonymize;
mod avg;
mod heapage;
mod humanhash;
mod labelframes;

pub use anonymize::{anonymize, AnonymizeOptions, DEFAULT_ALLOW_LIST};
pub use avg::avg;
pub use heapage::{format_go_duration, heap_age, parse_duration, HeapAgeOptions};
pub use labelframes::{label_frames, LabelFramesOptions};
