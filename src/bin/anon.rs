use std::path::PathBuf;

use clap::{ArgAction, Parser};
use env_logger::Env;
use profgraph::convert::Transform;
use profgraph::transform::{AnonymizeOptions, DEFAULT_ALLOW_LIST};

#[derive(Debug, Parser)]
#[clap(
    name = "profgraph-anon",
    about,
    after_help = "\
Replaces function names and source paths with human-readable hashes, so a profile can be
shared without revealing the code it was taken from. The output is JSON."
)]
struct Opt {
    /// Semicolon-separated regular expressions for function names to keep
    #[clap(long = "allow", value_name = "REGEX;...", default_value = DEFAULT_ALLOW_LIST)]
    allow: String,

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
    fn into_parts(self) -> profgraph::Result<(Option<PathBuf>, Transform)> {
        let options = AnonymizeOptions::from_allow_list(&self.allow)?;
        Ok((self.infile, Transform::Anon(options)))
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

    let (infile, transform) = opt.into_parts()?;
    transform.execute_files(&[infile])
}
