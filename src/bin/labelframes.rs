use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;
use profgraph::transform::LabelFramesOptions;

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-labelframes",
    about,
    after_help = "\
Adds a root frame LABEL=VALUE to every sample, where VALUE is the sample's value for the
label (N/A if it has none). The output is JSON."
)]
struct Opt {
    /// The sample label to turn into frames
    #[clap(long = "label", value_name = "LABEL", default_value = "mylabel")]
    label: String,

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
            Transform::LabelFrames(LabelFramesOptions { label: self.label }),
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
