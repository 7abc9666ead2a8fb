use crate::error::{Error, Result};
use crate::graph::{self, ProfileGraph, SampleType};

/// Configure which sample types a delta is computed for.
///
/// The default computes the delta for every sample type.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Limit the delta to these sample types. The other sample types keep the values of the
    /// second profile. Empty means every sample type.
    pub sample_types: Vec<SampleType>,
}

/// Computes `b - a` stack by stack.
///
/// Both profiles must have the same sample types. For every sample type selected by `opt`
/// the values of `a` are negated, for the others they are zeroed; the two profiles are then
/// merged structurally (see [`graph::merge`]), so stacks present in both are summed and
/// stacks that cancel out entirely disappear.
///
/// `a` is consumed because it is scaled in place. `b` is left untouched.
pub fn delta(opt: &Options, mut a: ProfileGraph, b: &ProfileGraph) -> Result<ProfileGraph> {
    if a.sample_types() != b.sample_types() {
        return Err(Error::IncompatibleProfiles(
            "delta needs profiles with identical sample types".into(),
        ));
    }

    for wanted in &opt.sample_types {
        if !a.sample_types().contains(wanted) {
            warn!("Ignoring sample type {} absent from the profiles", wanted);
        }
    }

    let ratios: Vec<f64> = a
        .sample_types()
        .iter()
        .map(|st| {
            if opt.sample_types.is_empty() || opt.sample_types.contains(st) {
                -1.0
            } else {
                0.0
            }
        })
        .collect();
    a.scale_by(&ratios)?;

    let delta = graph::merge(&[&a, b])?;
    delta.check_valid()?;
    Ok(delta)
}
