/// Configuration merger: CLI args > Env vars > Config file > Defaults
///
/// This module handles merging configuration from multiple sources:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Built-in defaults (lowest priority)
use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::CommonConfigArgs;
use crate::config::{validate_cache_dir, SnbConfig};
use crate::storage::state_dir;

/// Merged configuration for every command
#[derive(Debug, Clone)]
pub struct MergedBuildConfig {
    /// Absolute build root; steps run here and paths resolve against it
    pub build_root: PathBuf,
    pub spec_file: String,
    pub shell: String,
    pub source_root: String,
    /// Absolute state directory holding the cache database
    pub state_dir: PathBuf,
}

impl MergedBuildConfig {
    /// Merge configuration from CLI args and config file
    /// Precedence: CLI > env (already handled by clap) > config file > defaults
    pub fn merge(
        build_root: PathBuf,
        args: &CommonConfigArgs,
        file_config: Option<SnbConfig>,
    ) -> Self {
        let file = file_config.unwrap_or_default();

        let cache_dir = args
            .config_cache_dir
            .clone()
            .unwrap_or_else(|| file.cache.dir.clone());

        Self {
            state_dir: state_dir(&build_root, &cache_dir),
            spec_file: args
                .config_spec_file
                .clone()
                .unwrap_or_else(|| file.build.spec_file.clone()),
            shell: args
                .config_shell
                .clone()
                .unwrap_or_else(|| file.build.shell.clone()),
            source_root: args
                .config_source_root
                .clone()
                .unwrap_or_else(|| file.build.source_root.clone()),
            build_root,
        }
    }

    /// Resolve the build root, discover the config file and merge everything
    pub fn load(args: &CommonConfigArgs) -> Result<Self> {
        let dir = args.dir.as_deref().unwrap_or(".");
        let build_root = std::fs::canonicalize(dir)
            .with_context(|| format!("Build directory not found: {}", dir))?;

        let file_config = SnbConfig::discover(&build_root, args.config.as_deref())?;
        if let Some(config) = &file_config {
            config.validate()?;
        }

        let merged = Self::merge(build_root, args, file_config);

        if let Some(dir) = &args.config_cache_dir {
            validate_cache_dir(dir)?;
        }
        if merged.shell.trim().is_empty() {
            anyhow::bail!("Shell must not be empty");
        }

        Ok(merged)
    }
}
