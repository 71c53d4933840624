//! StemRoute - Multi-mode audio separation orchestrator
//!
//! Routes a task to the strategy for its mode, drives the separation engine
//! stage by stage, keeps only the stems each stage is expected to produce and
//! assembles them into a mode-specific result.

pub mod assembler;
pub mod audio;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod resolver;
pub mod stems;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, Args};
pub use context::{Mode, ProcessingContext};
pub use error::{StemRouteError, Result};
pub use pipeline::{Pipeline, TaskRequest, TaskResponse};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Log to stderr; stdout carries the JSON response
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)
    }
}
