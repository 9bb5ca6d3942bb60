//! CLI command handlers.

pub mod config;
pub mod serve;
pub mod tools;

use std::path::PathBuf;

use harness_config::{InvokerConfig, LoadedConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration and the files it came from.
    pub loaded: LoadedConfig,
    /// Project directory given on the command line.
    pub project_dir: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Invoker settings, with backends running in the project directory
    /// unless the config names a working directory.
    pub fn invoker_config(&self) -> InvokerConfig {
        let mut invoker = self.loaded.config.invoker();
        if invoker.working_dir.is_none() {
            invoker.working_dir = self.project_dir.clone();
        }
        invoker
    }
}
