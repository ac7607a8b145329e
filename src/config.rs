//! Process file - parses muxrun.yml into run options and commands

use crate::command::CommandSpec;
use crate::core::RunOptions;
use crate::error::MuxError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default process file name
pub const CONFIG_FILE: &str = "muxrun.yml";

/// Contents of a process file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub options: RunOptions,
    #[serde(default)]
    pub processes: Vec<CommandSpec>,
}

impl Config {
    /// Parse a process file from YAML text; relative `cwd`s stay relative
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, MuxError> {
        serde_yaml::from_str(content).map_err(|source| MuxError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a process file; relative `cwd`s are resolved against its directory
    pub fn from_file(path: &Path) -> Result<Self, MuxError> {
        let content = std::fs::read_to_string(path).map_err(|source| MuxError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content, path)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for process in &mut config.processes {
            if let Some(cwd) = process.cwd.as_mut() {
                if cwd.is_relative() {
                    *cwd = base.join(&*cwd);
                }
            }
        }

        log::debug!(
            "Loaded {} processes from {}",
            config.processes.len(),
            path.display()
        );
        Ok(config)
    }

    /// Per-user process file location
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("muxrun").join(CONFIG_FILE))
    }

    /// Find a process file.
    /// Priority:
    /// 1. muxrun.yml in `dir`
    /// 2. muxrun.yml in the user config directory
    pub fn locate(dir: &Path) -> Option<PathBuf> {
        let local = dir.join(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_path().filter(|path| path.exists())
    }

    /// Locate and load a process file starting from the current directory
    pub fn auto_load() -> Result<Self, MuxError> {
        match Self::locate(Path::new(".")) {
            Some(path) => Self::from_file(&path),
            None => Err(MuxError::ConfigNotFound {
                user_path: Self::user_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "the user config directory".to_string()),
            }),
        }
    }
}
