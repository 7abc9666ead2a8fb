use std::collections::BTreeMap;

use ahash::AHashMap;

use super::{FunctionId, Line, LocationId, MappingId, ProfileGraph, Sample};
use crate::error::{Error, Result};

type FunctionKey = (String, String, String, i64);
type MappingKey = (u64, u64, u64, String, String);
type LocationKey = (Option<MappingId>, Option<u64>, Vec<Line>);
type SampleKey = (
    Vec<LocationId>,
    BTreeMap<String, Vec<String>>,
    BTreeMap<String, Vec<i64>>,
);

// Carries the id translation tables of the graph being built.
#[derive(Default)]
struct Merger {
    functions: AHashMap<FunctionKey, FunctionId>,
    mappings: AHashMap<MappingKey, MappingId>,
    locations: AHashMap<LocationKey, LocationId>,
    samples: AHashMap<SampleKey, usize>,
}

/// Merges graphs into a new one, summing the values of structurally identical samples.
///
/// All inputs must have the same sample types, and the same period type where they have
/// one. Two samples are identical when their stacks resolve to the same functions, lines,
/// addresses and mappings, and they carry the same labels; which ids the inputs used does not
/// matter. Sample order is the order of first appearance across `graphs`. Samples whose
/// values sum to all zeros are dropped.
///
/// The inputs are left untouched.
pub fn merge(graphs: &[&ProfileGraph]) -> Result<ProfileGraph> {
    let first = match graphs.first() {
        Some(g) => *g,
        None => return Err(Error::IncompatibleProfiles("no profiles to merge".into())),
    };

    let mut out = ProfileGraph::new(first.sample_types.clone());
    for g in graphs {
        compatible(first, g)?;
        if out.period_type.is_none() {
            out.period_type = g.period_type.clone();
        }
        out.period = out.period.max(g.period);
        out.duration_nanos += g.duration_nanos;
        if g.time_nanos != 0 && (out.time_nanos == 0 || g.time_nanos < out.time_nanos) {
            out.time_nanos = g.time_nanos;
        }
        for comment in &g.comments {
            if !out.comments.contains(comment) {
                out.comments.push(comment.clone());
            }
        }
    }

    let mut merger = Merger::default();
    for g in graphs {
        for sample in &g.samples {
            merger.sample(&mut out, g, sample)?;
        }
    }
    out.samples.retain(|s| s.values.iter().any(|&v| v != 0));
    trace!(
        "merged {} profiles into {} samples",
        graphs.len(),
        out.samples.len()
    );
    Ok(out)
}

fn compatible(a: &ProfileGraph, b: &ProfileGraph) -> Result<()> {
    if a.sample_types != b.sample_types {
        return Err(Error::IncompatibleProfiles(format!(
            "sample types differ: [{}] vs [{}]",
            join(&a.sample_types),
            join(&b.sample_types)
        )));
    }
    if let (Some(pa), Some(pb)) = (&a.period_type, &b.period_type) {
        if pa != pb {
            return Err(Error::IncompatibleProfiles(format!(
                "period types differ: {} vs {}",
                pa, pb
            )));
        }
    }
    Ok(())
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Merger {
    fn sample(
        &mut self,
        out: &mut ProfileGraph,
        src: &ProfileGraph,
        sample: &Sample,
    ) -> Result<()> {
        if sample.values.len() != out.sample_types.len() {
            return Err(Error::Validation(format!(
                "sample has {} values, want {}",
                sample.values.len(),
                out.sample_types.len()
            )));
        }

        let mut locations = Vec::with_capacity(sample.locations.len());
        for id in &sample.locations {
            locations.push(self.location(out, src, *id)?);
        }
        let key = (
            locations,
            sample.labels.clone(),
            sample.numeric_labels.clone(),
        );

        if let Some(&i) = self.samples.get(&key) {
            for (sum, v) in out.samples[i].values.iter_mut().zip(&sample.values) {
                *sum = sum.saturating_add(*v);
            }
            return Ok(());
        }
        self.samples.insert(key.clone(), out.samples.len());
        out.samples.push(Sample {
            locations: key.0,
            values: sample.values.clone(),
            labels: key.1,
            numeric_labels: key.2,
        });
        Ok(())
    }

    fn location(
        &mut self,
        out: &mut ProfileGraph,
        src: &ProfileGraph,
        id: LocationId,
    ) -> Result<LocationId> {
        let location = src
            .location(id)
            .ok_or_else(|| Error::Validation(format!("unknown location {}", id)))?;

        let mapping = match location.mapping {
            Some(m) => Some(self.mapping(out, src, m)?),
            None => None,
        };
        let mut lines = Vec::with_capacity(location.lines.len());
        for line in &location.lines {
            lines.push(Line {
                function: self.function(out, src, line.function)?,
                line: line.line,
            });
        }

        let key = (mapping, location.address, lines);
        if let Some(&id) = self.locations.get(&key) {
            return Ok(id);
        }
        let id = out.add_location(key.0, key.1, key.2.clone());
        self.locations.insert(key, id);
        Ok(id)
    }

    fn function(
        &mut self,
        out: &mut ProfileGraph,
        src: &ProfileGraph,
        id: FunctionId,
    ) -> Result<FunctionId> {
        let f = src
            .function(id)
            .ok_or_else(|| Error::Validation(format!("unknown function {}", id)))?;
        let key = (
            f.name.clone(),
            f.system_name.clone(),
            f.filename.clone(),
            f.start_line,
        );
        if let Some(&id) = self.functions.get(&key) {
            return Ok(id);
        }
        let new = out.add_function(f.name.clone());
        if let Some(nf) = out.function_mut(new) {
            nf.system_name = f.system_name.clone();
            nf.filename = f.filename.clone();
            nf.start_line = f.start_line;
        }
        self.functions.insert(key, new);
        Ok(new)
    }

    fn mapping(
        &mut self,
        out: &mut ProfileGraph,
        src: &ProfileGraph,
        id: MappingId,
    ) -> Result<MappingId> {
        let m = src
            .mapping(id)
            .ok_or_else(|| Error::Validation(format!("unknown mapping {}", id)))?;
        let key = (m.start, m.limit, m.offset, m.file.clone(), m.build_id.clone());
        if let Some(&id) = self.mappings.get(&key) {
            return Ok(id);
        }
        let new = out.add_mapping(m.clone());
        self.mappings.insert(key, new);
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Frame, FrameInterner, InterningPolicy, SampleType};

    fn graph(stacks: &[(Vec<&str>, i64)]) -> ProfileGraph {
        let mut g = ProfileGraph::new(vec![SampleType::new("samples", "count")]);
        let mut interner = FrameInterner::new(InterningPolicy::PerOccurrence);
        for (stack, value) in stacks {
            let locations = stack
                .iter()
                .map(|name| interner.location(&mut g, (), Frame::named(name)))
                .collect();
            g.samples.push(Sample {
                locations,
                values: vec![*value],
                ..Default::default()
            });
        }
        g
    }

    #[test]
    fn sums_structurally_equal_stacks() {
        let a = graph(&[(vec!["foo", "main"], 2), (vec!["main"], 1)]);
        let b = graph(&[(vec!["main"], 4), (vec!["foo", "main"], 3), (vec!["bar", "main"], 5)]);
        let m = merge(&[&a, &b]).unwrap();
        m.check_valid().unwrap();

        let summary: Vec<(Vec<&str>, i64)> = m
            .samples
            .iter()
            .map(|s| (m.frame_names(s).collect(), s.values[0]))
            .collect();
        assert_eq!(
            summary,
            vec![
                (vec!["foo", "main"], 5),
                (vec!["main"], 5),
                (vec!["bar", "main"], 5),
            ]
        );
        // foo, main and bar interned once each
        assert_eq!(m.functions().count(), 3);
        assert_eq!(m.locations().count(), 3);
    }

    #[test]
    fn labels_distinguish_samples() {
        let mut a = graph(&[(vec!["main"], 1)]);
        let b = graph(&[(vec!["main"], 1)]);
        a.samples[0]
            .labels
            .insert("thread".into(), vec!["1".into()]);
        let m = merge(&[&a, &b]).unwrap();
        assert_eq!(m.samples.len(), 2);
    }

    #[test]
    fn rejects_differing_sample_types() {
        let a = graph(&[(vec!["main"], 1)]);
        let b = ProfileGraph::new(vec![SampleType::new("cpu", "nanoseconds")]);
        assert!(matches!(
            merge(&[&a, &b]),
            Err(Error::IncompatibleProfiles(_))
        ));
    }

    #[test]
    fn sums_saturate() {
        let a = graph(&[(vec!["main"], i64::MAX)]);
        let b = graph(&[(vec!["main"], 1)]);
        let m = merge(&[&a, &b]).unwrap();
        assert_eq!(m.samples[0].values, vec![i64::MAX]);
    }

    #[test]
    fn drops_samples_summing_to_zero() {
        let a = graph(&[(vec!["main"], -3), (vec!["foo", "main"], 1)]);
        let b = graph(&[(vec!["main"], 3)]);
        let m = merge(&[&a, &b]).unwrap();
        assert_eq!(m.samples.len(), 1);
        assert_eq!(m.samples[0].values, vec![1]);
    }
}
