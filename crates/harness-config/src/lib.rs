//! Configuration system for the agent harness tool server.
//!
//! Provides TOML-based configuration with:
//! - Server identity and unknown-method policy (`[server]`)
//! - Process invocation settings (`[invoker]`)
//! - Backend executables for each tool family (`[backends.tasks]`, `[backends.memory]`)
//! - Log output settings (`[logging]`)
//!
//! Files are layered: the user config directory first, then a project-local
//! `harness.toml`, with CLI flags applied last by the caller.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, LoadedConfig, load_config, load_config_file, user_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
