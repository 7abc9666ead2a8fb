use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-folded",
    about,
    after_help = "\
Converts a profile graph in JSON form to folded stacks. Given folded stacks (or a heap_v2
profile) instead, it writes the JSON form of the graph they describe."
)]
struct Opt {
    // ************* //
    // *** FLAGS *** //
    // ************* //
    /// Start the output with a type/unit header and write every sample value
    #[clap(long = "headers")]
    headers: bool,

    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    // ************ //
    // *** ARGS *** //
    // ************ //
    /// Profile file, or STDIN if not specified
    #[clap(value_name = "PATH")]
    infile: Option<PathBuf>,
}

impl Opt {
    fn into_parts(self) -> (Option<PathBuf>, Transform) {
        (
            self.infile,
            Transform::Folded {
                headers: self.headers,
            },
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
