use std::hash::Hash;

use ahash::AHashMap;

use super::{Line, LocationId, MappingId, ProfileGraph};

/// Whether logically identical frames share one function/location pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterningPolicy {
    /// Every frame occurrence gets a fresh function and location.
    ///
    /// This is what folded text decoding does: graphs come out larger than necessary and
    /// never share locations between stacks, but every frame occurrence stays individually
    /// addressable.
    PerOccurrence,

    /// Frames with equal keys share one function and location, created the first time the
    /// key is seen.
    ByKey,
}

/// Describes the function/location pair to create for a frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// Name of the frame's function.
    pub name: &'a str,
    /// Mapping of the frame's location.
    pub mapping: Option<MappingId>,
    /// Address of the frame's location.
    pub address: Option<u64>,
}

impl<'a> Frame<'a> {
    /// A frame with only a function name.
    pub fn named(name: &'a str) -> Self {
        Self {
            name,
            mapping: None,
            address: None,
        }
    }
}

/// Creates single-line locations in a graph according to an [`InterningPolicy`].
///
/// An interner belongs to one producer pass over one graph. Using it with two different
/// graphs hands out location ids that do not exist in the second one.
#[derive(Debug)]
pub struct FrameInterner<K> {
    policy: InterningPolicy,
    seen: AHashMap<K, LocationId>,
}

impl<K> FrameInterner<K>
where
    K: Hash + Eq,
{
    /// Creates an interner with the given policy.
    pub fn new(policy: InterningPolicy) -> Self {
        Self {
            policy,
            seen: AHashMap::new(),
        }
    }

    /// The policy this interner applies.
    pub fn policy(&self) -> InterningPolicy {
        self.policy
    }

    /// Returns the location for `key`, creating a function and location for `frame` when
    /// the policy calls for a new one.
    pub fn location(&mut self, graph: &mut ProfileGraph, key: K, frame: Frame<'_>) -> LocationId {
        match self.policy {
            InterningPolicy::PerOccurrence => Self::create(graph, frame),
            InterningPolicy::ByKey => *self
                .seen
                .entry(key)
                .or_insert_with(|| Self::create(graph, frame)),
        }
    }

    /// Number of distinct keys that produced a location so far. Always 0 for
    /// [`InterningPolicy::PerOccurrence`].
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no key has produced a location yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn create(graph: &mut ProfileGraph, frame: Frame<'_>) -> LocationId {
        let function = graph.add_function(frame.name);
        graph.add_location(
            frame.mapping,
            frame.address,
            vec![Line { function, line: 0 }],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SampleType;

    #[test]
    fn per_occurrence_never_shares() {
        let mut g = ProfileGraph::new(vec![SampleType::new("samples", "count")]);
        let mut interner = FrameInterner::new(InterningPolicy::PerOccurrence);
        let a = interner.location(&mut g, "main", Frame::named("main"));
        let b = interner.location(&mut g, "main", Frame::named("main"));
        assert_ne!(a, b);
        assert_eq!(g.functions().count(), 2);
        assert!(interner.is_empty());
    }

    #[test]
    fn by_key_shares() {
        let mut g = ProfileGraph::new(vec![SampleType::new("samples", "count")]);
        let mut interner = FrameInterner::new(InterningPolicy::ByKey);
        let a = interner.location(&mut g, 0x10u64, Frame::named("0x10"));
        let b = interner.location(&mut g, 0x10u64, Frame::named("0x10"));
        let c = interner.location(&mut g, 0x20u64, Frame::named("0x20"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(g.locations().count(), 2);
        assert_eq!(interner.len(), 2);
    }
}
