//! Change detection between builds, and the on-disk layout of the accessors
//! artifact.
//!
//! Regeneration is skipped only when all three hold: the declaration hash is
//! unchanged, the resolved maps equal the cached ones, and the previous
//! output is still on disk. [`BuildState`] is the explicit context carrying
//! the hash and the cached maps; it is persisted as JSON so a fresh process
//! can skip work too.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ProptreeError;
use crate::types::PropertyMap;

/// Directory under the build tool's cache dir owned by this crate.
pub const TOOL_DIR_NAME: &str = "proptree";
pub const ACCESSORS_NAME: &str = "properties-accessors";
pub const STATE_FILE_NAME: &str = "build-state.json";

/// Lowercase hex SHA-256 of `text`.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// True when `path` is missing, not a directory, or has no entries.
pub fn is_dir_empty(path: &Path) -> bool {
    fs::read_dir(path).map_or(true, |mut entries| entries.next().is_none())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildState {
    /// Hash of the declaration text seen by the last build.
    pub last_config_hash: Option<String>,
    /// Maps the accessors were last generated from, in generation order.
    pub settings_maps: Vec<PropertyMap>,
    /// Maps the project sources were last generated from, by project.
    pub project_maps: IndexMap<String, PropertyMap>,
    #[serde(skip, default = "modified")]
    config_modified: bool,
}

fn modified() -> bool {
    true
}

impl Default for BuildState {
    fn default() -> Self {
        Self {
            last_config_hash: None,
            settings_maps: Vec::new(),
            project_maps: IndexMap::new(),
            config_modified: true,
        }
    }
}

impl BuildState {
    /// Read persisted state. A missing or unreadable file starts fresh.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "could not read build state, starting fresh");
                }
                return Self::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "corrupt build state, starting fresh");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ProptreeError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProptreeError::io(parent, e))?;
        }
        fs::write(path, json).map_err(|e| ProptreeError::io(path, e))
    }

    /// Record the current declaration text. Without one, the configuration
    /// always counts as modified.
    pub fn observe_declaration(&mut self, text: Option<&str>) -> bool {
        let hash = text.map(fingerprint);
        self.config_modified = hash.is_none() || hash != self.last_config_hash;
        self.last_config_hash = hash;
        debug!(modified = self.config_modified, "checked declaration");
        self.config_modified
    }

    pub fn config_modified(&self) -> bool {
        self.config_modified
    }

    /// Whether accessors must be regenerated for `maps`. Every directory in
    /// `output_dirs` must still hold the previous output.
    pub fn accessors_stale(&self, maps: &[PropertyMap], output_dirs: &[&Path]) -> bool {
        self.config_modified
            || self.settings_maps.len() != maps.len()
            || !self.settings_maps.iter().zip(maps).all(|(a, b)| same_entries(a, b))
            || output_dirs.iter().any(|dir| is_dir_empty(dir))
    }

    pub fn remember_accessors(&mut self, maps: Vec<PropertyMap>) {
        self.settings_maps = maps;
    }

    /// Whether one project's sources must be regenerated.
    pub fn sources_stale(&self, project: &str, map: &PropertyMap, output_dir: &Path) -> bool {
        self.config_modified
            || !self
                .project_maps
                .get(project)
                .is_some_and(|cached| same_entries(cached, map))
            || is_dir_empty(output_dir)
    }

    pub fn remember_sources(&mut self, project: &str, map: PropertyMap) {
        self.project_maps.insert(project.to_string(), map);
    }
}

/// Equal keys, values and order.
fn same_entries(a: &PropertyMap, b: &PropertyMap) -> bool {
    a.len() == b.len() && a.iter().eq(b.iter())
}

/// Maven coordinates of the virtual accessors artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactCoordinates {
    pub fn accessors(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: ACCESSORS_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// `group:artifact:version`
    pub fn notation(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Directory of this version inside a Maven repository layout.
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir: PathBuf = self.group_id.split('.').collect();
        dir.push(&self.artifact_id);
        dir.push(&self.version);
        dir
    }

    pub fn pom_file_name(&self) -> String {
        format!("{}-{}.pom", self.artifact_id, self.version)
    }

    pub fn pom(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <project xmlns=\"http://maven.apache.org/POM/4.0.0\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd\">\n\
             \x20 <modelVersion>4.0.0</modelVersion>\n\
             \x20 <groupId>{}</groupId>\n\
             \x20 <artifactId>{}</artifactId>\n\
             \x20 <version>{}</version>\n\
             </project>\n",
            self.group_id, self.artifact_id, self.version
        )
    }

    /// Write the POM under `repository`. Returns its path.
    pub fn write_pom(&self, repository: &Path) -> Result<PathBuf, ProptreeError> {
        let dir = repository.join(self.relative_dir());
        fs::create_dir_all(&dir).map_err(|e| ProptreeError::io(&dir, e))?;
        let path = dir.join(self.pom_file_name());
        fs::write(&path, self.pom()).map_err(|e| ProptreeError::io(&path, e))?;
        Ok(path)
    }
}

/// `<root>/<cache_dir>/proptree`
pub fn tool_dir(root_dir: &Path, cache_dir: &Path) -> PathBuf {
    root_dir.join(cache_dir).join(TOOL_DIR_NAME)
}

/// Repository root of the accessors artifact.
pub fn accessors_dir(root_dir: &Path, cache_dir: &Path) -> PathBuf {
    tool_dir(root_dir, cache_dir).join(ACCESSORS_NAME)
}

pub fn state_path(root_dir: &Path, cache_dir: &Path) -> PathBuf {
    tool_dir(root_dir, cache_dir).join(STATE_FILE_NAME)
}
