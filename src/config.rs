use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "xcresult-extract.toml";

/// Top-level configuration loaded from xcresult-extract.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ExtractConfig {
    pub derived_data: DerivedDataConfig,
    pub xcresulttool: ToolConfig,
    pub output: OutputConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DerivedDataConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub labels: Vec<String>,
}

// --- Default implementations ---

impl Default for DerivedDataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/Library/Developer/Xcode/DerivedData"),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: "xcrun".to_string(),
            args: vec!["xcresulttool".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("data.txt"),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            labels: crate::record::DEFAULT_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }
}

impl DerivedDataConfig {
    /// The DerivedData root with a leading `~` expanded to the home directory.
    pub fn resolved_root(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

/// Expand a leading `~` component. Paths without one, or when no home
/// directory can be determined, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Load the config.
///
/// With `explicit` set, the file must exist. Otherwise `xcresult-extract.toml`
/// in `dir` is used if present and defaults apply when it is not.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<ExtractConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.exists() {
                tracing::debug!(path = %candidate.display(), "no config file, using defaults");
                return Ok(ExtractConfig::default());
            }
            candidate
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Errors from loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, .. } => {
                write!(f, "failed to read config file {}", path.display())
            }
            ConfigError::Parse { path, .. } => {
                write!(f, "failed to parse config file {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
