use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-jemalloc",
    about,
    after_help = "\
Converts a jemalloc heap_v2 profile (as written by prof.dump) to the JSON form of a
profile graph. Values are corrected for jemalloc's sampling rate."
)]
struct Opt {
    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// heap_v2 profile file, or STDIN if not specified
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

    Transform::Jemalloc.execute_files(&[opt.infile])
}
