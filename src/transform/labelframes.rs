use crate::graph::{Frame, FrameInterner, InterningPolicy, ProfileGraph};

/// Configure [`label_frames`].
#[derive(Clone, Debug)]
pub struct LabelFramesOptions {
    /// The sample label whose values become frames.
    pub label: String,
}

impl Default for LabelFramesOptions {
    fn default() -> Self {
        Self {
            label: "mylabel".to_string(),
        }
    }
}

/// Adds a root frame `<label>=<value>` to every sample.
///
/// The value is the sample's values for the label joined with `,`, or `N/A` when the sample
/// does not carry the label. Samples with equal values share one frame. Running this twice
/// adds a second root frame above the first.
pub fn label_frames(graph: &mut ProfileGraph, opt: &LabelFramesOptions) {
    let mut interner = FrameInterner::new(InterningPolicy::ByKey);
    let mut samples = std::mem::take(&mut graph.samples);
    for sample in &mut samples {
        let value = match sample.labels.get(&opt.label) {
            Some(values) if !values.is_empty() => values.join(","),
            _ => "N/A".to_string(),
        };
        let name = format!("{}={}", opt.label, value);
        let location = interner.location(graph, name.clone(), Frame::named(&name));
        sample.locations.push(location);
    }
    graph.samples = samples;
    debug!("added {} distinct {} frames", interner.len(), opt.label);
}
