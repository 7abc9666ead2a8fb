use std::fmt::Write as _;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::graph::{Frame, FrameInterner, InterningPolicy, ProfileGraph};

/// Configure [`heap_age`].
#[derive(Clone, Debug)]
pub struct HeapAgeOptions {
    /// How long the profiled process had been allocating when the profile was taken.
    pub period: Duration,
}

impl Default for HeapAgeOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
        }
    }
}

const AGE_RESOLUTION: i64 = 100_000_000;

/// Adds a leaf frame with the estimated average age of the objects each sample keeps alive.
///
/// By Little's law the average age is `inuse_objects / (alloc_objects / period)`. Ages are
/// truncated to 100ms. Samples without allocations get `∞ (> <period>)`.
///
/// The graph must have `inuse_objects/count` and `alloc_objects/count` sample types.
pub fn heap_age(graph: &mut ProfileGraph, opt: &HeapAgeOptions) -> Result<()> {
    let inuse_idx = graph.require_sample_type("inuse_objects", "count")?;
    let alloc_idx = graph.require_sample_type("alloc_objects", "count")?;
    let period_ns = opt.period.as_nanos() as f64;

    let mut ages = Vec::with_capacity(graph.samples.len());
    for (i, sample) in graph.samples.iter().enumerate() {
        let value = |idx: usize, kind: &str| {
            sample.values.get(idx).copied().ok_or_else(|| Error::MissingValue {
                sample: i,
                kind: kind.into(),
                unit: "count".into(),
            })
        };
        let inuse = value(inuse_idx, "inuse_objects")?;
        let allocs = value(alloc_idx, "alloc_objects")?;

        ages.push(if allocs > 0 {
            let rate = allocs as f64 / period_ns;
            let nanos = (inuse as f64 / rate) as i64;
            format_go_duration(nanos - nanos % AGE_RESOLUTION)
        } else {
            format!("∞ (> {})", format_go_duration(period_nanos(opt.period)))
        });
    }

    let mut interner = FrameInterner::new(InterningPolicy::PerOccurrence);
    let mut samples = std::mem::take(&mut graph.samples);
    for (sample, age) in samples.iter_mut().zip(&ages) {
        let location = interner.location(graph, (), Frame::named(age));
        sample.locations.insert(0, location);
    }
    graph.samples = samples;
    Ok(())
}

fn period_nanos(period: Duration) -> i64 {
    i64::try_from(period.as_nanos()).unwrap_or(i64::MAX)
}

/// Formats a nanosecond count the way Go's `time.Duration` prints itself.
///
/// Durations under a second use the largest fitting unit of `ns`, `µs` and `ms`; longer
/// ones are written as hours, minutes and fractional seconds, e.g. `1h2m3.5s`. Trailing
/// zeros of the fraction are dropped.
pub fn format_go_duration(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let u = nanos.unsigned_abs();

    if u < 1_000_000_000 {
        let (scale, digits, unit) = if u < 1_000 {
            (1, 0, "ns")
        } else if u < 1_000_000 {
            (1_000, 3, "µs")
        } else {
            (1_000_000, 6, "ms")
        };
        push_decimal(&mut out, u / scale, u % scale, digits);
        out.push_str(unit);
        return out;
    }

    let secs = u / 1_000_000_000;
    let (hours, minutes) = (secs / 3600, secs / 60 % 60);
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    push_decimal(&mut out, secs % 60, u % 1_000_000_000, 9);
    out.push('s');
    out
}

fn push_decimal(out: &mut String, int: u64, frac: u64, digits: usize) {
    let _ = write!(out, "{}", int);
    if frac != 0 {
        let frac = format!("{:0width$}", frac, width = digits);
        let _ = write!(out, ".{}", frac.trim_end_matches('0'));
    }
}

/// Parses a duration the way Go's `time.ParseDuration` does, e.g. `10s`, `1.5s` or `1m30s`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare integer is seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = |why: &str| Error::Config(format!("invalid duration {:?}: {}", s, why));
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| invalid("out of range"));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid(&format!("unknown unit {:?}", unit))),
        };
        let part = scaled_nanos(number, scale).ok_or_else(|| invalid("bad number"))?;
        nanos = nanos
            .checked_add(part)
            .ok_or_else(|| invalid("out of range"))?;
        rest = tail;
    }

    let secs = u64::try_from(nanos / 1_000_000_000).map_err(|_| invalid("out of range"))?;
    Ok(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}

// `number` is `int`, `int.frac` or `.frac`; fraction digits past nanosecond precision of the
// largest unit are dropped.
fn scaled_nanos(number: &str, scale: u128) -> Option<u128> {
    let (int, frac) = number.split_once('.').unwrap_or((number, ""));
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    let int = if int.is_empty() { 0 } else { int.parse::<u128>().ok()? };
    let mut nanos = int.checked_mul(scale)?;
    let frac = &frac[..frac.len().min(18)];
    if !frac.is_empty() {
        let digits = frac.parse::<u128>().ok()?;
        nanos = nanos.checked_add(digits * scale / 10u128.pow(frac.len() as u32))?;
    }
    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Line, Sample, SampleType};

    fn heap_graph(values: &[[i64; 2]]) -> ProfileGraph {
        let mut g = ProfileGraph::new(vec![
            SampleType::new("alloc_objects", "count"),
            SampleType::new("inuse_objects", "count"),
        ]);
        let main = g.add_function("main");
        let lmain = g.add_location(None, None, vec![Line { function: main, line: 0 }]);
        for v in values {
            g.samples.push(Sample {
                locations: vec![lmain],
                values: v.to_vec(),
                ..Default::default()
            });
        }
        g
    }

    fn leaves(g: &ProfileGraph) -> Vec<&str> {
        g.samples
            .iter()
            .map(|s| g.frame_names(s).next().unwrap())
            .collect()
    }

    #[test]
    fn go_durations() {
        assert_eq!(format_go_duration(0), "0s");
        assert_eq!(format_go_duration(300_000_000), "300ms");
        assert_eq!(format_go_duration(1_500_000_000), "1.5s");
        assert_eq!(format_go_duration(123_400_000_000), "2m3.4s");
        assert_eq!(format_go_duration(3_600_000_000_000), "1h0m0s");
        assert_eq!(format_go_duration(10_000_000_000), "10s");
        assert_eq!(format_go_duration(1_500), "1.5µs");
        assert_eq!(format_go_duration(42), "42ns");
        assert_eq!(format_go_duration(-1_500_000_000), "-1.5s");
    }

    #[test]
    fn durations_parse() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(".5h").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("20us").unwrap(), Duration::from_micros(20));
        assert_eq!(parse_duration("3µs500ns").unwrap(), Duration::from_nanos(3500));
        assert!(matches!(parse_duration("10d"), Err(Error::Config(_))));
        assert!(matches!(parse_duration("s"), Err(Error::Config(_))));
        assert!(matches!(parse_duration("1.s2"), Err(Error::Config(_))));
        assert!(matches!(parse_duration("1.2.3s"), Err(Error::Config(_))));
        assert!(matches!(parse_duration("-1s"), Err(Error::Config(_))));
        assert!(matches!(parse_duration("1m30"), Err(Error::Config(_))));
    }

    #[test]
    fn huge_durations_are_rejected() {
        assert!(matches!(
            parse_duration("99999999999999999999999h"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_duration("18446744073709551616"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_duration("5124095576030432h"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn prepends_age_frames() {
        let mut g = heap_graph(&[[200, 61], [40, 5025], [0, 3]]);
        heap_age(&mut g, &HeapAgeOptions::default()).unwrap();
        g.check_valid().unwrap();
        assert_eq!(leaves(&g), vec!["3s", "20m56.2s", "∞ (> 10s)"]);
        assert!(g.samples.iter().all(|s| s.locations.len() == 2));
        // one fresh frame per sample
        assert_eq!(g.locations().count(), 4);
    }

    #[test]
    fn missing_value_leaves_graph_untouched() {
        let mut g = heap_graph(&[[200, 61], [40, 5025]]);
        g.samples[1].values.pop();
        let before = g.clone();
        assert!(matches!(
            heap_age(&mut g, &HeapAgeOptions::default()),
            Err(Error::MissingValue { sample: 1, .. })
        ));
        assert_eq!(g.samples, before.samples);
        assert_eq!(g.locations().count(), before.locations().count());
    }

    #[test]
    fn requires_object_counts() {
        let mut g = ProfileGraph::new(vec![SampleType::new("inuse_objects", "count")]);
        assert!(matches!(
            heap_age(&mut g, &HeapAgeOptions::default()),
            Err(Error::MissingSampleType { .. })
        ));
    }
}
