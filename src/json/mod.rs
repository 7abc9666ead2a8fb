//! A field-by-field JSON form of a [`ProfileGraph`].
//!
//! The command-line tools use it to pass graphs between each other. Ids are written as they
//! are, so a graph read back refers to its functions, locations and mappings exactly like
//! the one that was written.

use std::io::prelude::*;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{Function, Location, Mapping, ProfileGraph, Sample, SampleType};

#[derive(Serialize)]
struct ProfileRef<'a> {
    sample_types: &'a [SampleType],
    samples: &'a [Sample],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mappings: Vec<&'a Mapping>,
    locations: Vec<&'a Location>,
    functions: Vec<&'a Function>,
    #[serde(skip_serializing_if = "Option::is_none")]
    period_type: Option<&'a SampleType>,
    period: i64,
    time_nanos: i64,
    duration_nanos: i64,
    #[serde(skip_serializing_if = "is_empty")]
    comments: &'a [String],
}

#[derive(Deserialize)]
struct Profile {
    sample_types: Vec<SampleType>,
    #[serde(default)]
    samples: Vec<Sample>,
    #[serde(default)]
    mappings: Vec<Mapping>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    functions: Vec<Function>,
    #[serde(default)]
    period_type: Option<SampleType>,
    #[serde(default)]
    period: i64,
    #[serde(default)]
    time_nanos: i64,
    #[serde(default)]
    duration_nanos: i64,
    #[serde(default)]
    comments: Vec<String>,
}

fn is_empty(comments: &&[String]) -> bool {
    comments.is_empty()
}

/// Writes `graph` as pretty-printed JSON followed by a newline.
pub fn to_writer<W>(graph: &ProfileGraph, mut writer: W) -> Result<()>
where
    W: Write,
{
    let profile = ProfileRef {
        sample_types: graph.sample_types(),
        samples: &graph.samples,
        mappings: graph.mappings().collect(),
        locations: graph.locations().collect(),
        functions: graph.functions().collect(),
        period_type: graph.period_type.as_ref(),
        period: graph.period,
        time_nanos: graph.time_nanos,
        duration_nanos: graph.duration_nanos,
        comments: &graph.comments,
    };
    serde_json::to_writer_pretty(&mut writer, &profile)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Reads a graph written by [`to_writer`] and validates it.
pub fn from_slice(bytes: &[u8]) -> Result<ProfileGraph> {
    let profile: Profile = serde_json::from_slice(bytes)?;

    let mut graph = ProfileGraph::new(profile.sample_types);
    for mapping in profile.mappings {
        graph.insert_mapping(mapping)?;
    }
    for function in profile.functions {
        graph.insert_function(function)?;
    }
    for location in profile.locations {
        graph.insert_location(location)?;
    }
    graph.samples = profile.samples;
    graph.period_type = profile.period_type;
    graph.period = profile.period;
    graph.time_nanos = profile.time_nanos;
    graph.duration_nanos = profile.duration_nanos;
    graph.comments = profile.comments;

    graph.check_valid()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::folded::{self, DecodeOptions, Decoder};
    use crate::graph::Line;

    fn encode(graph: &ProfileGraph) -> String {
        let mut out = Vec::new();
        to_writer(graph, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn folded_survives_json() {
        let text = "x/count y/count\nmain;foo 5 10\nmain;foo;bar 3 0\n";
        let graph = Decoder::from(DecodeOptions { timestamp: false })
            .decode_str(text)
            .unwrap();
        let back = from_slice(encode(&graph).as_bytes()).unwrap();

        let mut out = Vec::new();
        folded::to_writer(&folded::Options { headers: true }, &back, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
        assert_eq!(back.to_string(), graph.to_string());
    }

    #[test]
    fn layout() {
        let mut graph = ProfileGraph::new(vec![SampleType::new("samples", "count")]);
        let main = graph.add_function("main");
        let loc = graph.add_location(
            None,
            Some(0x10),
            vec![Line { function: main, line: 3 }],
        );
        graph.samples.push(Sample {
            locations: vec![loc],
            values: vec![7],
            ..Default::default()
        });

        let expected = r#"{
  "sample_types": [
    {
      "type": "samples",
      "unit": "count"
    }
  ],
  "samples": [
    {
      "locations": [
        1
      ],
      "values": [
        7
      ]
    }
  ],
  "locations": [
    {
      "id": 1,
      "address": 16,
      "lines": [
        {
          "function": 1,
          "line": 3
        }
      ]
    }
  ],
  "functions": [
    {
      "id": 1,
      "name": "main"
    }
  ],
  "period": 0,
  "time_nanos": 0,
  "duration_nanos": 0
}
"#;
        assert_eq!(encode(&graph), expected);
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let json = r#"{
            "sample_types": [{"type": "samples", "unit": "count"}],
            "samples": [{"locations": [4], "values": [1]}]
        }"#;
        assert!(matches!(
            from_slice(json.as_bytes()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{
            "sample_types": [{"type": "samples", "unit": "count"}],
            "functions": [{"id": 1, "name": "a"}, {"id": 1, "name": "b"}]
        }"#;
        assert!(matches!(
            from_slice(json.as_bytes()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(from_slice(b"{"), Err(Error::Json(_))));
    }
}
