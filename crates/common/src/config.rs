use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::ProcessClient;
use crate::platform::Platform;

pub const CONFIG_FILE_NAME: &str = "wfx.toml";
pub const DEFAULT_TEMPLATE_FILE: &str = "templatenode.zip";
pub const DEFAULT_NODE_SCRIPT: &str = "test";
pub const DEFAULT_START_SCRIPT: &str = "teststart";

/// Settings shared by every scenario generated into one work directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Template archive unpacked into every node, relative to the work directory
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
    /// Which launcher flavour to emit
    #[serde(default)]
    pub platform: Platform,
    /// Client executable name inside the template
    #[serde(default)]
    pub client_program: Option<String>,
    /// Base name of the per-node launcher
    #[serde(default = "default_node_script")]
    pub node_script: String,
    /// Base name of the launcher that starts every node
    #[serde(default = "default_start_script")]
    pub start_script: String,
}

fn default_template_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_FILE)
}

fn default_node_script() -> String {
    DEFAULT_NODE_SCRIPT.to_string()
}

fn default_start_script() -> String {
    DEFAULT_START_SCRIPT.to_string()
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            template_path: default_template_path(),
            platform: Platform::current(),
            client_program: None,
            node_script: default_node_script(),
            start_script: default_start_script(),
        }
    }
}

impl FixtureConfig {
    /// Default config targeting `platform` instead of the host.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Client executable name, falling back to the platform's default.
    pub fn client_program(&self) -> &str {
        self.client_program
            .as_deref()
            .unwrap_or_else(|| self.platform.default_client_program())
    }

    pub fn process_client(&self) -> ProcessClient {
        ProcessClient::new(self.client_program())
    }

    /// Template archive path, resolved against `work_dir` when relative.
    pub fn template_in(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.template_path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load `path` if it exists, else the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_client_program_follows_platform() {
        assert_eq!(
            FixtureConfig::for_platform(Platform::Windows).client_program(),
            "whisper_client.exe"
        );
        assert_eq!(
            FixtureConfig::for_platform(Platform::Unix).client_program(),
            "whisper_client"
        );

        let custom = FixtureConfig {
            client_program: Some("wc".to_string()),
            ..FixtureConfig::for_platform(Platform::Unix)
        };
        assert_eq!(custom.client_program(), "wc");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: FixtureConfig = toml::from_str("platform = \"windows\"\n").unwrap();
        assert_eq!(config.platform, Platform::Windows);
        assert_eq!(config.template_path, PathBuf::from("templatenode.zip"));
        assert_eq!(config.node_script, "test");
        assert_eq!(config.start_script, "teststart");
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        let config = FixtureConfig {
            template_path: PathBuf::from("/opt/templates/node.zip"),
            ..FixtureConfig::for_platform(Platform::Unix)
        };

        config.save(&path).unwrap();
        assert_eq!(FixtureConfig::load(&path).unwrap(), config);
        assert_eq!(
            config.template_in(tmp.path()),
            PathBuf::from("/opt/templates/node.zip")
        );
    }

    #[test]
    fn test_load_or_default_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FixtureConfig::load_or_default(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config, FixtureConfig::default());
    }
}
