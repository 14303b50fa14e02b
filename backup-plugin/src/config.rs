//! Configuration management for the backup plugin host.
//!
//! Loads configuration from a TOML file; every section is optional and falls
//! back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Application type recorded with every backup version
    #[serde(default = "default_plugin_name")]
    pub name: String,

    /// Root under which per-session staging directories are created
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Follow symbolic links when collecting files for incremental backup
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Copy full backups through a staging directory instead of sending
    /// (and restoring into) the live tree directly
    #[serde(default)]
    pub staged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory used by the local media agent to store backup versions
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_plugin_name() -> String {
    "SampleFS".to_string()
}

fn default_staging_root() -> PathBuf {
    PathBuf::from("/var/tmp/backup-plugin")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("/var/lib/backup-plugin/media")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            name: default_plugin_name(),
            staging_root: default_staging_root(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.plugin.name, "SampleFS");
        assert_eq!(config.log.level, "info");
        assert!(!config.backup.follow_symlinks);
        assert!(!config.backup.staged);
    }

    #[test]
    fn test_partial_override() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("plugin.toml");
        std::fs::write(
            &path,
            "[plugin]\nstaging_root = \"/tmp/stage\"\n\n[backup]\nfollow_symlinks = true\n",
        )?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.plugin.staging_root, PathBuf::from("/tmp/stage"));
        assert_eq!(config.plugin.name, "SampleFS");
        assert!(config.backup.follow_symlinks);
        assert_eq!(config.media.store_dir, default_store_dir());
        Ok(())
    }
}
