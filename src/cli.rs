// src/cli.rs

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::config::{RunConfiguration, Verbosity};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "chanarch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Download the files of imageboard threads",
    group(ArgGroup::new("verbosity").args(["quiet", "verbose", "debug"]))
)]
pub struct Cli {
    /// Thread URLs
    #[arg(value_name = "THREAD")]
    pub threads: Vec<String>,

    /// Download directory
    #[arg(short, long, value_name = "DIRECTORY", default_value = ".")]
    pub directory: String,

    /// List of threads in a file, one URL per line (repeatable)
    #[arg(short, long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Be quiet
    #[arg(short, long)]
    pub quiet: bool,

    /// Report every thread and file as it is handled
    #[arg(short, long)]
    pub verbose: bool,

    /// Debug-level verbosity
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    pub fn into_config(self) -> RunConfiguration {
        let verbosity = self.verbosity();
        RunConfiguration {
            output_base_dir: expand_home(&self.directory),
            verbosity,
            input_urls: self.threads,
            input_files: self.files,
            ..RunConfiguration::default()
        }
    }
}

/// `~` and `~/x` resolve against the home directory; anything else is taken as is.
fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match home::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}
