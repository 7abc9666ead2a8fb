use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-avg",
    about,
    after_help = "\
Turns the delay of every sample of a contention profile into the average delay per
contention. Needs the contentions/count and delay/nanoseconds sample types. The output is
JSON."
)]
struct Opt {
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

    Transform::Avg.execute_files(&[opt.infile])
}
