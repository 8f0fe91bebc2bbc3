use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::variant::Variant;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct FetchBenchCli {
    /// The variant to run: a name such as `bounded-parallel-httpclient`, a menu number or one of the
    /// shortcut letters `s`, `a` and `p`.
    ///
    /// When neither this flag nor the config file picks a variant, a menu is shown on the console.
    #[clap(short, long)]
    pub variant: Option<Variant>,

    /// The number of requests to issue in each run. Defaults to 250.
    #[clap(short = 'n', long)]
    pub requests: Option<usize>,

    /// A URL to fetch. Specify the flag multiple times to spread requests over several targets in
    /// round-robin order, for example `--target=http://a.test --target=http://b.test`.
    #[clap(short, long = "target")]
    pub targets: Vec<String>,

    /// The timeout for each request, in milliseconds. Defaults to 100 seconds.
    #[clap(long)]
    pub timeout_ms: Option<u64>,

    /// The number of worker threads used by the bounded parallel variants. Defaults to the number of
    /// available cores.
    #[clap(short, long)]
    pub parallelism: Option<NonZeroUsize>,

    /// Run the test this many times. Each run is reported with its own test number.
    #[clap(long)]
    pub repeat: Option<NonZeroUsize>,

    /// A TOML file to read settings from. Flags given on the command line take precedence.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// The directory to write the trace log file to.
    #[clap(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Do not write a trace log file, only trace to the console.
    #[clap(long, default_value = "false")]
    pub no_log_file: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended when the console trace is being captured, the progress bar only adds noise.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Append a JSON summary of every run to this file, one line per run.
    #[clap(long)]
    pub summary_path: Option<PathBuf>,
}
