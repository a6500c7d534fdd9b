// scout-core/src/config.rs

//! Handles the `Scout.toml` configuration structures and their validation.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "Scout.toml";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScoutConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub ls: LsConfig,
    #[serde(default)]
    pub diff: DiffConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ExecutorConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_pattern_length")]
    pub max_pattern_length: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LsConfig {
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
    #[serde(default)]
    pub caps: LsCaps,
}

/// Ceilings an `ls_plan_v1` document may not exceed.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LsCaps {
    #[serde(default = "default_ls_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_ls_max_entries_scanned")]
    pub max_entries_scanned: usize,
    #[serde(default = "default_ls_max_top_n")]
    pub max_top_n: usize,
    #[serde(default = "default_ls_max_view_bytes")]
    pub max_view_bytes: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DiffConfig {
    #[serde(default = "default_diff_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_parallelism() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_pattern_length() -> usize {
    512
}
fn default_artifact_dir() -> String {
    ".scout/ls".to_string()
}
fn default_ls_max_depth() -> usize {
    16
}
fn default_ls_max_entries_scanned() -> usize {
    50_000
}
fn default_ls_max_top_n() -> usize {
    5_000
}
fn default_ls_max_view_bytes() -> usize {
    262_144
}
fn default_diff_timeout_secs() -> u64 {
    30
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pattern_length: default_max_pattern_length(),
        }
    }
}

impl Default for LsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            caps: LsCaps::default(),
        }
    }
}

impl Default for LsCaps {
    fn default() -> Self {
        Self {
            max_depth: default_ls_max_depth(),
            max_entries_scanned: default_ls_max_entries_scanned(),
            max_top_n: default_ls_max_top_n(),
            max_view_bytes: default_ls_max_view_bytes(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_diff_timeout_secs(),
        }
    }
}

impl ScoutConfig {
    pub fn from_toml_str(config_toml_content: &str) -> Result<ScoutConfig> {
        let config: ScoutConfig = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };

        if config.executor.parallelism == 0 {
            return Err(anyhow!("'executor.parallelism' must be a positive integer."));
        }
        if config.executor.timeout_secs == 0 {
            return Err(anyhow!("'executor.timeout_secs' must be a positive integer."));
        }
        if config.limits.max_pattern_length == 0 {
            return Err(anyhow!("'limits.max_pattern_length' must be a positive integer."));
        }
        if config.ls.artifact_dir.trim().is_empty() {
            return Err(anyhow!("'ls.artifact_dir' in config content is empty."));
        }
        let caps = &config.ls.caps;
        for (key, value) in [
            ("max_depth", caps.max_depth),
            ("max_entries_scanned", caps.max_entries_scanned),
            ("max_top_n", caps.max_top_n),
            ("max_view_bytes", caps.max_view_bytes),
        ] {
            if value == 0 {
                return Err(anyhow!("'ls.caps.{}' must be a positive integer.", key));
            }
        }
        if config.diff.timeout_secs == 0 {
            return Err(anyhow!("'diff.timeout_secs' must be a positive integer."));
        }

        tracing::info!("Successfully parsed and validated scout configuration.");
        Ok(config)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.executor.timeout_secs)
    }

    pub fn diff_timeout(&self) -> Duration {
        Duration::from_secs(self.diff.timeout_secs)
    }
}

/// Walks up from `start` looking for the directory that holds `Scout.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// A loaded configuration and the directory artifacts are anchored to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ScoutConfig,
    pub project_root: PathBuf,
    pub source: Option<PathBuf>,
}

/// Loads `explicit` if given, else the nearest `Scout.toml` above the working
/// directory, else the built-in defaults anchored at the working directory.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let (config_path, project_root) = match explicit {
        Some(path) => {
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| current_dir.clone());
            (Some(path.to_path_buf()), root)
        }
        None => match find_project_root(&current_dir) {
            Some(root) => (Some(root.join(CONFIG_FILENAME)), root),
            None => (None, current_dir),
        },
    };

    let config = match &config_path {
        Some(path) => {
            tracing::info!("Found configuration file at: {:?}", path);
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            ScoutConfig::from_toml_str(&content)
                .context("Failed to parse or validate configuration content")?
        }
        None => {
            tracing::debug!("No {} found; using built-in defaults.", CONFIG_FILENAME);
            ScoutConfig::default()
        }
    };

    Ok(LoadedConfig {
        config,
        project_root,
        source: config_path,
    })
}
