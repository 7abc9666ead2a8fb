use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;
use profgraph::transform::{parse_duration, HeapAgeOptions};

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-heapage",
    about,
    after_help = "\
Adds a leaf frame with the average age of the live objects of each stack, estimated with
Little's law from the inuse_objects/count and alloc_objects/count sample types:

    age = inuse_objects / (alloc_objects / PERIOD)

The output is JSON."
)]
struct Opt {
    /// How long the process had been allocating when the profile was taken, e.g. 10s or 1m30s
    #[clap(
        long = "period",
        value_name = "DURATION",
        default_value = "10s",
        value_parser = parse_duration
    )]
    period: Duration,

    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Profile file, or STDIN if not specified
    #[clap(value_name = "PATH")]
    infile: Option<PathBuf>,
}

impl Opt {
    fn into_parts(self) -> (Option<PathBuf>, Transform) {
        (
            self.infile,
            Transform::HeapAge(HeapAgeOptions {
                period: self.period,
            }),
        )
    }
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

    let (infile, transform) = opt.into_parts();
    transform.execute_files(&[infile])
}
