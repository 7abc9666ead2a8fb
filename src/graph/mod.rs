mod intern;
mod merge;
mod raw;

pub use intern::{Frame, FrameInterner, InterningPolicy};
pub use merge::merge;

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! id_type {
    ($(#[$doc:meta] $name:ident),*) => {
        $(
            #[$doc]
            #[derive(
                Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
                Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )*
    };
}

id_type! {
    /// Identifies a [`Function`] within one [`ProfileGraph`].
    FunctionId,
    /// Identifies a [`Location`] within one [`ProfileGraph`].
    LocationId,
    /// Identifies a [`Mapping`] within one [`ProfileGraph`].
    MappingId
}

/// One measured quantity carried by every sample, e.g. `samples/count`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleType {
    /// What is measured, e.g. `samples` or `delay`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The unit of the measurement, e.g. `count` or `nanoseconds`.
    pub unit: String,
}

impl SampleType {
    /// Creates a sample type from its kind and unit.
    pub fn new(kind: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            unit: unit.into(),
        }
    }

    /// Parses the `kind/unit` notation. The first `/` separates kind from unit.
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, unit) = s.split_once('/')?;
        Some(Self::new(kind, unit))
    }

    /// Whether this sample type has the given kind and unit.
    pub fn is(&self, kind: &str, unit: &str) -> bool {
        self.kind == kind && self.unit == unit
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.unit)
    }
}

/// A function that appears in one or more call stacks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Unique within the owning graph, never zero.
    pub id: FunctionId,
    /// Human readable, fully qualified name.
    pub name: String,
    /// Name as understood by the system, e.g. a mangled symbol.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_name: String,
    /// Source file containing the function.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    /// Line number in `filename` where the function starts.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub start_line: i64,
}

/// One function/line pair of a [`Location`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    /// The function executing at this point.
    pub function: FunctionId,
    /// Source line, 0 when unknown.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: i64,
}

/// One point in a call stack.
///
/// A location has more than one line when functions were inlined into each other; `lines` is
/// then ordered from the innermost (deepest) function outwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Unique within the owning graph, never zero.
    pub id: LocationId,
    /// The binary region containing this location, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingId>,
    /// Instruction address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<u64>,
    /// Never empty in a valid graph.
    pub lines: Vec<Line>,
}

/// A region of memory backed by a binary or shared library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Unique within the owning graph, never zero.
    pub id: MappingId,
    /// First address of the region.
    #[serde(default)]
    pub start: u64,
    /// First address past the end of the region.
    #[serde(default)]
    pub limit: u64,
    /// Offset of `start` within `file`.
    #[serde(default)]
    pub offset: u64,
    /// Path of the backing binary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// Build id of the backing binary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build_id: String,
    /// Whether locations in this mapping carry symbolized functions.
    #[serde(default)]
    pub has_functions: bool,
}

/// One measured call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// The call stack, leaf first. Refers to locations owned by the graph.
    pub locations: Vec<LocationId>,
    /// One value per sample type of the graph, in the same order.
    pub values: Vec<i64>,
    /// String labels attached to the sample.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Vec<String>>,
    /// Numeric labels attached to the sample.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub numeric_labels: BTreeMap<String, Vec<i64>>,
}

// Next-id counters. Every graph owns its own, so independent conversions never share state.
#[derive(Clone, Debug, Default)]
struct IdArena {
    last_function: u64,
    last_location: u64,
    last_mapping: u64,
}

impl IdArena {
    fn next(last: &mut u64) -> u64 {
        *last += 1;
        *last
    }

    fn observe(last: &mut u64, id: u64) {
        if id > *last {
            *last = id;
        }
    }
}

/// The in-memory representation of one profile.
///
/// A graph owns its functions, locations and mappings; samples refer to locations by id, and
/// locations refer to functions and mappings by id. Ids are handed out by the graph itself,
/// starting at 1.
#[derive(Clone, Debug, Default)]
pub struct ProfileGraph {
    sample_types: Vec<SampleType>,
    /// The measured call stacks, in document order.
    pub samples: Vec<Sample>,
    functions: IndexMap<FunctionId, Function>,
    locations: IndexMap<LocationId, Location>,
    mappings: IndexMap<MappingId, Mapping>,
    /// What a sampling period is measured in, if the profile is sampled.
    pub period_type: Option<SampleType>,
    /// Sampling period, in units of `period_type`.
    pub period: i64,
    /// When the profile was captured, in nanoseconds since the epoch. 0 when unknown.
    pub time_nanos: i64,
    /// How long the profile covers, in nanoseconds. 0 when unknown.
    pub duration_nanos: i64,
    /// Free-form notes.
    pub comments: Vec<String>,
    ids: IdArena,
}

impl ProfileGraph {
    /// Creates an empty graph whose samples will carry the given sample types.
    pub fn new(sample_types: Vec<SampleType>) -> Self {
        Self {
            sample_types,
            ..Default::default()
        }
    }

    /// The sample types, in value-vector order.
    pub fn sample_types(&self) -> &[SampleType] {
        &self.sample_types
    }

    /// Position of the given sample type in every sample's values.
    pub fn sample_type_index(&self, kind: &str, unit: &str) -> Option<usize> {
        self.sample_types.iter().position(|st| st.is(kind, unit))
    }

    /// Like [`sample_type_index`](Self::sample_type_index), but a missing sample type is an
    /// [`Error::MissingSampleType`].
    pub fn require_sample_type(&self, kind: &str, unit: &str) -> Result<usize> {
        self.sample_type_index(kind, unit)
            .ok_or_else(|| Error::MissingSampleType {
                kind: kind.to_string(),
                unit: unit.to_string(),
            })
    }

    /// Adds a function with the given name and returns its freshly allocated id.
    pub fn add_function(&mut self, name: impl Into<String>) -> FunctionId {
        let id = FunctionId(IdArena::next(&mut self.ids.last_function));
        self.functions.insert(
            id,
            Function {
                id,
                name: name.into(),
                system_name: String::new(),
                filename: String::new(),
                start_line: 0,
            },
        );
        id
    }

    /// Adds a location and returns its freshly allocated id.
    pub fn add_location(
        &mut self,
        mapping: Option<MappingId>,
        address: Option<u64>,
        lines: Vec<Line>,
    ) -> LocationId {
        let id = LocationId(IdArena::next(&mut self.ids.last_location));
        self.locations.insert(
            id,
            Location {
                id,
                mapping,
                address,
                lines,
            },
        );
        id
    }

    /// Adds a mapping, replacing whatever id it carries with a freshly allocated one.
    pub fn add_mapping(&mut self, mut mapping: Mapping) -> MappingId {
        let id = MappingId(IdArena::next(&mut self.ids.last_mapping));
        mapping.id = id;
        self.mappings.insert(id, mapping);
        id
    }

    /// Adds a function under the id it already carries.
    ///
    /// Used when loading a graph that was serialized with its ids. A zero or duplicate id is
    /// an [`Error::Validation`].
    pub fn insert_function(&mut self, function: Function) -> Result<()> {
        let id = function.id;
        if id.0 == 0 || self.functions.contains_key(&id) {
            return Err(Error::Validation(format!("bad function id {}", id)));
        }
        IdArena::observe(&mut self.ids.last_function, id.0);
        self.functions.insert(id, function);
        Ok(())
    }

    /// Adds a location under the id it already carries. See [`insert_function`](Self::insert_function).
    pub fn insert_location(&mut self, location: Location) -> Result<()> {
        let id = location.id;
        if id.0 == 0 || self.locations.contains_key(&id) {
            return Err(Error::Validation(format!("bad location id {}", id)));
        }
        IdArena::observe(&mut self.ids.last_location, id.0);
        self.locations.insert(id, location);
        Ok(())
    }

    /// Adds a mapping under the id it already carries. See [`insert_function`](Self::insert_function).
    pub fn insert_mapping(&mut self, mapping: Mapping) -> Result<()> {
        let id = mapping.id;
        if id.0 == 0 || self.mappings.contains_key(&id) {
            return Err(Error::Validation(format!("bad mapping id {}", id)));
        }
        IdArena::observe(&mut self.ids.last_mapping, id.0);
        self.mappings.insert(id, mapping);
        Ok(())
    }

    /// Looks up a function.
    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(&id)
    }

    /// Looks up a function for modification.
    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(&id)
    }

    /// All functions, in the order they were added.
    pub fn functions(&self) -> impl Iterator<Item = &Function> + '_ {
        self.functions.values()
    }

    /// All functions, for modification. Ids must not be changed.
    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> + '_ {
        self.functions.values_mut()
    }

    /// Looks up a location.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Looks up a location for modification.
    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    /// All locations, in the order they were added.
    pub fn locations(&self) -> impl Iterator<Item = &Location> + '_ {
        self.locations.values()
    }

    /// All locations, for modification. Ids must not be changed.
    pub fn locations_mut(&mut self) -> impl Iterator<Item = &mut Location> + '_ {
        self.locations.values_mut()
    }

    /// Looks up a mapping.
    pub fn mapping(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.get(&id)
    }

    /// All mappings, in the order they were added.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> + '_ {
        self.mappings.values()
    }

    /// The frame names of a sample's stack, leaf first.
    ///
    /// Inlined functions are expanded, innermost first. Unknown ids are skipped; use
    /// [`check_valid`](Self::check_valid) to rule them out.
    pub fn frame_names<'a>(&'a self, sample: &'a Sample) -> impl Iterator<Item = &'a str> + 'a {
        sample
            .locations
            .iter()
            .filter_map(move |id| self.location(*id))
            .flat_map(move |loc| loc.lines.iter())
            .filter_map(move |line| self.function(line.function))
            .map(|f| f.name.as_str())
    }

    /// Multiplies value `i` of every sample by `ratios[i]`, truncating toward zero.
    ///
    /// Samples left with only zero values are removed.
    pub fn scale_by(&mut self, ratios: &[f64]) -> Result<()> {
        if ratios.len() != self.sample_types.len() {
            return Err(Error::IncompatibleProfiles(format!(
                "{} scale ratios for {} sample types",
                ratios.len(),
                self.sample_types.len()
            )));
        }
        if ratios.iter().all(|&r| r == 1.0) {
            return Ok(());
        }
        for sample in &mut self.samples {
            for (value, &ratio) in sample.values.iter_mut().zip(ratios) {
                if ratio != 1.0 {
                    *value = (*value as f64 * ratio) as i64;
                }
            }
        }
        self.samples.retain(|s| s.values.iter().any(|&v| v != 0));
        Ok(())
    }

    /// Checks the invariants every graph handed to a caller must satisfy.
    ///
    /// Every referenced function, location and mapping exists, every sample has exactly one
    /// value per sample type, and every location has at least one line.
    pub fn check_valid(&self) -> Result<()> {
        if self.sample_types.is_empty() && !self.samples.is_empty() {
            return Err(Error::Validation("missing sample types".into()));
        }
        for (i, sample) in self.samples.iter().enumerate() {
            if sample.values.len() != self.sample_types.len() {
                return Err(Error::Validation(format!(
                    "sample {} has {} values, want {}",
                    i,
                    sample.values.len(),
                    self.sample_types.len()
                )));
            }
            for id in &sample.locations {
                if !self.locations.contains_key(id) {
                    return Err(Error::Validation(format!(
                        "sample {} refers to unknown location {}",
                        i, id
                    )));
                }
            }
        }
        if self.mappings.keys().any(|id| id.0 == 0) {
            return Err(Error::Validation("found mapping with reserved id 0".into()));
        }
        if self.functions.keys().any(|id| id.0 == 0) {
            return Err(Error::Validation("found function with reserved id 0".into()));
        }
        for (id, location) in &self.locations {
            if id.0 == 0 {
                return Err(Error::Validation("found location with reserved id 0".into()));
            }
            if let Some(mapping) = location.mapping {
                if !self.mappings.contains_key(&mapping) {
                    return Err(Error::Validation(format!(
                        "location {} refers to unknown mapping {}",
                        id, mapping
                    )));
                }
            }
            if location.lines.is_empty() {
                return Err(Error::Validation(format!("location {} has no lines", id)));
            }
            for line in &location.lines {
                if !self.functions.contains_key(&line.function) {
                    return Err(Error::Validation(format!(
                        "location {} refers to unknown function {}",
                        id, line.function
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}
