use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{json::INDENT_CHOICES, timestamp::TimezoneOffset, todo::TODO_FILENAME};

const APP_DIR: &str = "toolset";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zone preselected in the timestamp converter
    pub timezone: TimezoneOffset,
    pub json_indent: usize,
    /// Overrides the desktop language, e.g. `zh-CN`
    pub language: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: TimezoneOffset::default(),
            json_indent: 2,
            language: None,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if !INDENT_CHOICES.contains(&config.json_indent) {
            warn!(
                "Unsupported json_indent {}, falling back to 2",
                config.json_indent
            );
            config.json_indent = 2;
        }

        Ok(config)
    }

    /// Reads the config file at `path`. Missing or malformed files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            debug!("No config at {}, using defaults", path.display());
            return Config::default();
        };
        Self::from_toml(&content).unwrap_or_else(|e| {
            warn!("Ignoring malformed config {}: {}", path.display(), e);
            Config::default()
        })
    }

    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Directory holding the todo list
    pub fn data_dir(&self) -> PathBuf {
        if let Some(path) = std::env::var_os("TOOLSET_DATA_HOME") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_DIR}")))
    }

    pub fn todo_path(&self) -> PathBuf {
        self.data_dir().join(TODO_FILENAME)
    }
}

fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TOOLSET_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILENAME)
}

// tests
#[test]
fn test_parse_config() {
    let config = Config::from_toml(
        r#"
timezone = "UTC+9"
json_indent = 4
language = "zh-CN"
data_dir = "/tmp/toolset-data"
"#,
    )
    .unwrap();
    assert_eq!(config.timezone, TimezoneOffset::UtcPlus9);
    assert_eq!(config.json_indent, 4);
    assert_eq!(config.language.as_deref(), Some("zh-CN"));
    assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/toolset-data")));
}

#[test]
fn test_partial_and_invalid_config() {
    let config = Config::from_toml("json_indent = 3").unwrap();
    assert_eq!(config, Config::default());
    assert!(Config::from_toml("timezone = \"UTC+5\"").is_err());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILENAME);
    assert_eq!(Config::load_from(&path), Config::default());

    fs::write(&path, "timezone = \"UTC-8\"\n").unwrap();
    assert_eq!(Config::load_from(&path).timezone, TimezoneOffset::UtcMinus8);

    fs::write(&path, "timezone = [").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
}
