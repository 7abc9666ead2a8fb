use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;
use profgraph::graph::SampleType;

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-delta",
    about,
    after_help = "\
Writes the JSON form of PROFILE2 - PROFILE1, stack by stack. Stacks that only occur in
PROFILE1 come out with negative values."
)]
struct Opt {
    /// Only compute the delta for this sample type (e.g. alloc_space/bytes); may be repeated.
    /// The other sample types keep the values of the second profile [default: all types]
    #[clap(long = "sample-type", value_name = "TYPE/UNIT", value_parser = parse_sample_type)]
    sample_types: Vec<SampleType>,

    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Base profile
    #[clap(value_name = "PROFILE1")]
    infile1: PathBuf,

    /// Profile to subtract the base profile from
    #[clap(value_name = "PROFILE2")]
    infile2: PathBuf,
}

impl Opt {
    fn into_parts(self) -> ([Option<PathBuf>; 2], Transform) {
        (
            [Some(self.infile1), Some(self.infile2)],
            Transform::Delta {
                sample_types: self.sample_types,
            },
        )
    }
}

fn parse_sample_type(s: &str) -> Result<SampleType, String> {
    SampleType::parse(s).ok_or_else(|| format!("expected TYPE/UNIT, got {:?}", s))
}

fn main() -> profgraph::Result<()> {
    let opt = Opt::parse();

    // Initialize logger
    if !opt.quiet {
        env_logger::Builder::from_env(Env::default().default_filter_or(match opt.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }))
        .format_timestamp(None)
        .init();
    }

    let (infiles, transform) = opt.into_parts();
    transform.execute_files(&infiles)
}
