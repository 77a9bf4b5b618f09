//! Settings of the tool itself, as opposed to the property declaration.
//!
//! Layers, lowest to highest priority: compiled defaults, the optional
//! `proptree-settings.toml` next to the root project, then a handful of
//! environment variables:
//!
//! | Variable            | Field       |
//! |---------------------|-------------|
//! | `GRADLE_USER_HOME`  | `user_home` |
//! | `PROPTREE_OFFLINE`  | `offline`   |
//! | `PROPTREE_CACHE_DIR`| `cache_dir` |

use std::path::{Path, PathBuf};

use confique::Config;
use toml::{Table, Value};
use tracing::warn;

use crate::error::ProptreeError;
use crate::validate;

pub const SETTINGS_FILE_NAME: &str = "proptree-settings.toml";

#[derive(Config, Debug, Clone)]
pub struct ToolSettings {
    /// Build tool cache directory, relative to the root project.
    #[config(default = ".gradle")]
    pub cache_dir: PathBuf,

    /// Build tool user home, searched for `GLOBAL` properties files.
    /// Falls back to `~/.gradle`.
    pub user_home: Option<PathBuf>,

    /// Skip the update check.
    #[config(default = false)]
    pub offline: bool,

    /// Group of the virtual accessors artifact.
    #[config(default = "proptree")]
    pub group_id: String,

    /// Declaration file, relative to the root project.
    #[config(default = "proptree.toml")]
    pub declaration_file: PathBuf,

    /// Reject unknown keys in the declaration file.
    #[config(default = true)]
    pub strict: bool,
}

impl ToolSettings {
    /// Settings with every default applied.
    pub fn defaults() -> Result<Self, ProptreeError> {
        resolve_settings(None, Vec::new())
    }

    /// Read `proptree-settings.toml` from `root_dir` plus the process
    /// environment.
    pub fn load(root_dir: &Path) -> Result<Self, ProptreeError> {
        let path = root_dir.join(SETTINGS_FILE_NAME);
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => Some((path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ProptreeError::io(path, e)),
        };
        resolve_settings(file, std::env::vars().collect())
    }

    pub fn user_home_dir(&self) -> PathBuf {
        self.user_home.clone().unwrap_or_else(|| {
            directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".gradle"))
                .unwrap_or_else(|| PathBuf::from(".gradle"))
        })
    }

    pub fn declaration_path(&self, root_dir: &Path) -> PathBuf {
        root_dir.join(&self.declaration_file)
    }
}

/// Resolve settings from a pre-read file and environment pairs. No I/O.
pub fn resolve_settings(
    file: Option<(PathBuf, String)>,
    env_vars: Vec<(String, String)>,
) -> Result<ToolSettings, ProptreeError> {
    let mut merged = Table::new();
    if let Some((path, content)) = &file {
        validate::validate_plain_keys::<<ToolSettings as Config>::Layer>(content, path)?;
        merged = toml::from_str(content).map_err(|e| ProptreeError::ParseError {
            path: path.clone(),
            source: e,
        })?;
    }

    for (name, value) in env_vars {
        match name.as_str() {
            "GRADLE_USER_HOME" if !value.trim().is_empty() => {
                merged.insert("user_home".into(), Value::String(value));
            }
            "PROPTREE_CACHE_DIR" if !value.trim().is_empty() => {
                merged.insert("cache_dir".into(), Value::String(value));
            }
            "PROPTREE_OFFLINE" => match parse_flag(&value) {
                Some(flag) => {
                    merged.insert("offline".into(), Value::Boolean(flag));
                }
                None => warn!(value = %value, "ignoring unrecognized PROPTREE_OFFLINE"),
            },
            _ => {}
        }
    }

    let path = file.map(|(path, _)| path).unwrap_or_default();
    let layer: <ToolSettings as Config>::Layer = Value::Table(merged)
        .try_into()
        .map_err(|e| ProptreeError::ParseError { path, source: e })?;
    ToolSettings::builder()
        .preloaded(layer)
        .load()
        .map_err(ProptreeError::from)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
