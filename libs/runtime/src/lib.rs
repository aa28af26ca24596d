//! Process-level plumbing shared by the server binary and the modules:
//! layered configuration, logging bootstrap, home directory resolution and
//! shutdown signals.

pub mod config;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{AppConfig, CliArgs, LoggingConfig, Section, ServerConfig};
