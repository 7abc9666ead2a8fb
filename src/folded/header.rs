use crate::graph::SampleType;

/// Decides whether the first line of a folded document declares its sample types.
///
/// A stack line always ends in integer values, which never contain a `/`, so the default
/// [`SlashTokens`] heuristic cannot mistake a well-formed stack line for a header. It can
/// still mistake a malformed one (say, a stack whose values were lost) for a header, which is
/// why the choice is left to the caller.
pub trait HeaderDetector {
    /// Returns the sample types declared by `line`, or `None` if `line` is not a header.
    fn detect(&self, line: &str) -> Option<Vec<SampleType>>;
}

/// Treats a line as a header when every space-separated token contains a `/`.
///
/// Each token is split at its first `/` into kind and unit, so `duration/nanoseconds`
/// becomes the sample type with kind `duration` and unit `nanoseconds`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlashTokens;

impl HeaderDetector for SlashTokens {
    fn detect(&self, line: &str) -> Option<Vec<SampleType>> {
        let mut sample_types = Vec::new();
        for token in line.split_whitespace() {
            sample_types.push(SampleType::parse(token)?);
        }
        if sample_types.is_empty() {
            None
        } else {
            Some(sample_types)
        }
    }
}

/// Never detects a header; every line is a stack line.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHeader;

impl HeaderDetector for NoHeader {
    fn detect(&self, _line: &str) -> Option<Vec<SampleType>> {
        None
    }
}
