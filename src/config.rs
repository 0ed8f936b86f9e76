// src/config.rs

use std::path::PathBuf;

use crate::fetcher::Endpoints;

/// How chatty the run is. Maps onto a tracing level in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

/// Everything a run needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub output_base_dir: PathBuf,
    pub verbosity: Verbosity,
    /// Thread urls given directly, in order.
    pub input_urls: Vec<String>,
    /// Files holding one thread url per line, in order.
    pub input_files: Vec<PathBuf>,
    pub endpoints: Endpoints,
}

impl RunConfiguration {
    pub fn new(output_base_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_base_dir: output_base_dir.into(),
            verbosity: Verbosity::Normal,
            input_urls: Vec::new(),
            input_files: Vec::new(),
            endpoints: Endpoints::default(),
        }
    }

    pub fn has_input(&self) -> bool {
        !self.input_urls.is_empty() || !self.input_files.is_empty()
    }
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self::new(".")
    }
}
