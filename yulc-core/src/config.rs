use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Compiler version used when a project does not pin one.
pub const DEFAULT_SOLC_VERSION: &str = "0.8.17";

/// Settings for one run; never changed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub version: String,
    /// Forwarded to the backend as `settings.optimizer.details.yulDetails`.
    pub yul_details: Option<Map<String, Value>>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        YulConfig::default().settings()
    }
}

/// The `[yul]` table of a project's `yul.toml`.
///
/// ```toml
/// [yul]
/// version = "0.8.19"
///
/// [yul.yulDetails]
/// stackAllocation = true
/// optimizerSteps = "dhfoDgvulfnTUtnIf"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct YulConfig {
    pub version: String,
    pub yul_details: Option<Map<String, Value>>,
}

impl Default for YulConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_SOLC_VERSION.to_string(),
            yul_details: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    yul: YulConfig,
}

impl YulConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ProjectFile>(text).map(|file| file.yul)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn settings(&self) -> BuildSettings {
        BuildSettings {
            version: self.version.clone(),
            yul_details: self.yul_details.clone(),
        }
    }
}
