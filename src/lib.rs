// Library interface for snb
// This allows integration tests and external code to use snb's modules

pub mod build;
pub mod cli;
pub mod cli_utils;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod merger;
pub mod storage;

// Re-export commonly used types
pub use build::{Orchestrator, ReferencedObject, Resolver, Step, StepExecutor};
pub use error::BuildError;
pub use storage::{CacheStore, RocksCacheStore};
