use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::cache_dir::DEFAULT_STATE_DIR;

/// Name of the optional configuration file in the build root
pub const CONFIG_FILE_NAME: &str = "snb.toml";

/// Complete snb configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnbConfig {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Specification document, relative to the build root
    #[serde(default = "default_spec_file")]
    pub spec_file: String,

    /// Shell used to run each step as `<shell> -c <step>`
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Secondary root searched for tokens that don't exist in the build root
    #[serde(default = "default_source_root")]
    pub source_root: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            spec_file: default_spec_file(),
            shell: default_shell(),
            source_root: default_source_root(),
        }
    }
}

/// Local cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// State directory holding the cache database
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_spec_file() -> String {
    "ShakeAndBakeFile".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_source_root() -> String {
    "src".to_string()
}

fn default_cache_dir() -> String {
    DEFAULT_STATE_DIR.to_string()
}

impl SnbConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: SnbConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load the explicit config file if given, otherwise `snb.toml` in the
    /// build root. Returns `None` when neither exists.
    pub fn discover(build_root: &Path, explicit_path: Option<&str>) -> Result<Option<Self>> {
        if let Some(path) = explicit_path {
            return Ok(Some(Self::from_file(path)?));
        }

        let path = config_path(build_root);
        if path.exists() {
            Ok(Some(Self::from_file(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.build.spec_file.trim().is_empty() {
            anyhow::bail!("build.spec_file must not be empty");
        }

        if self.build.shell.trim().is_empty() {
            anyhow::bail!("build.shell must not be empty");
        }

        validate_cache_dir(&self.cache.dir)
    }
}

/// The state directory must be hidden, or a step mentioning the build root
/// would fingerprint the cache database itself
pub fn validate_cache_dir(dir: &str) -> Result<()> {
    let hidden = Path::new(dir)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false);

    if !hidden {
        anyhow::bail!(
            "Invalid cache dir: '{}'. The final path component must start with '.'",
            dir
        );
    }

    Ok(())
}

pub fn config_path(build_root: &Path) -> PathBuf {
    build_root.join(CONFIG_FILE_NAME)
}
