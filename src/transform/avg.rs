use crate::error::{Error, Result};
use crate::graph::ProfileGraph;

/// Turns the total delay of every sample of a contention profile into the average delay per
/// contention.
///
/// The graph must have `contentions/count` and `delay/nanoseconds` sample types. A sample
/// without contentions is left with a delay of 0.
pub fn avg(graph: &mut ProfileGraph) -> Result<()> {
    let count_idx = graph.require_sample_type("contentions", "count")?;
    let delay_idx = graph.require_sample_type("delay", "nanoseconds")?;

    for (i, sample) in graph.samples.iter().enumerate() {
        let missing = |kind: &str, unit: &str| Error::MissingValue {
            sample: i,
            kind: kind.into(),
            unit: unit.into(),
        };
        if sample.values.len() <= count_idx {
            return Err(missing("contentions", "count"));
        }
        if sample.values.len() <= delay_idx {
            return Err(missing("delay", "nanoseconds"));
        }
    }

    for sample in &mut graph.samples {
        let count = sample.values[count_idx];
        let delay = &mut sample.values[delay_idx];
        *delay = if count == 0 { 0 } else { delay.saturating_div(count) };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Sample, SampleType};

    fn contention_graph(values: &[[i64; 2]]) -> ProfileGraph {
        let mut g = ProfileGraph::new(vec![
            SampleType::new("contentions", "count"),
            SampleType::new("delay", "nanoseconds"),
        ]);
        for v in values {
            g.samples.push(Sample {
                values: v.to_vec(),
                ..Default::default()
            });
        }
        g
    }

    #[test]
    fn averages_delay() {
        let mut g = contention_graph(&[[4, 100], [3, 10], [0, 0]]);
        avg(&mut g).unwrap();
        let values: Vec<_> = g.samples.iter().map(|s| s.values.clone()).collect();
        assert_eq!(values, vec![vec![4, 25], vec![3, 3], vec![0, 0]]);
    }

    #[test]
    fn zero_count_yields_zero_delay() {
        let mut g = contention_graph(&[[0, 7]]);
        avg(&mut g).unwrap();
        assert_eq!(g.samples[0].values, vec![0, 0]);
    }

    #[test]
    fn missing_sample_type() {
        let mut g = ProfileGraph::new(vec![SampleType::new("contentions", "count")]);
        match avg(&mut g) {
            Err(Error::MissingSampleType { kind, unit }) => {
                assert_eq!(kind, "delay");
                assert_eq!(unit, "nanoseconds");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_value_leaves_graph_untouched() {
        let mut g = contention_graph(&[[4, 100]]);
        g.samples.push(Sample {
            values: vec![1],
            ..Default::default()
        });
        assert!(matches!(
            avg(&mut g),
            Err(Error::MissingValue { sample: 1, .. })
        ));
        assert_eq!(g.samples[0].values, vec![4, 100]);
    }

    #[test]
    fn extreme_delays_saturate() {
        let mut g = contention_graph(&[[-1, i64::MIN]]);
        avg(&mut g).unwrap();
        assert_eq!(g.samples[0].values, vec![-1, i64::MAX]);
    }
}
