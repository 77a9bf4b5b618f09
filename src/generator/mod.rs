//! Source generators.
//!
//! Generators are pure: they turn resolved property maps into
//! [`GeneratedFile`]s and never touch the disk themselves. Writing happens in
//! [`deploy`](crate::deploy) through [`GeneratedFile::write_to`].
//!
//! - [`accessors`]: Java accessor trees for build scripts
//! - [`sources`]: Kotlin constant objects for project sources

pub mod accessors;
pub mod sources;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ProptreeError;
use crate::naming::{first_number_to_letter, upper_camelcase};

/// One generated source file, relative to its output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Package directories plus file name (`com/example/AppProperties.kt`).
    pub relative_path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub(crate) fn new(package: &str, file_name: &str, contents: String) -> Self {
        let mut relative_path: PathBuf = package.split('.').filter(|s| !s.is_empty()).collect();
        relative_path.push(file_name);
        Self {
            relative_path,
            contents,
        }
    }

    /// Write under `root`, creating package directories. Returns the full path.
    pub fn write_to(&self, root: &Path) -> Result<PathBuf, ProptreeError> {
        let path = root.join(&self.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProptreeError::io(parent, e))?;
        }
        fs::write(&path, &self.contents).map_err(|e| ProptreeError::io(&path, e))?;
        debug!(path = %path.display(), "wrote generated file");
        Ok(path)
    }
}

/// Wall-clock timestamp for generation banners.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Type name for an owner: `:core:data` → `CoreData`, `Global` → `Global`.
pub fn owner_type_name(owner: &str) -> String {
    let camel = upper_camelcase(&owner.replace(':', "_"));
    first_number_to_letter(
        &camel
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>(),
    )
}

/// Doc comment opening every generated file.
pub(crate) fn banner(timestamp: &str, description: &str) -> String {
    format!(
        "/**\n * This {description} is generated by proptree at {timestamp}\n * <br/>\n * The content here is automatically generated according to the properties of your projects\n */\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_path_follows_package() {
        let file = GeneratedFile::new("com.example.generated", "AppProperties.kt", String::new());
        assert_eq!(
            file.relative_path,
            PathBuf::from("com/example/generated/AppProperties.kt")
        );
    }

    #[test]
    fn write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let file = GeneratedFile::new("a.b", "C.java", "class C {}".into());
        let path = file.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("a/b/C.java"));
        assert_eq!(fs::read_to_string(path).unwrap(), "class C {}");
    }

    #[test]
    fn owner_type_names() {
        assert_eq!(owner_type_name("Global"), "Global");
        assert_eq!(owner_type_name(":app"), "App");
        assert_eq!(owner_type_name(":core:data"), "CoreData");
        assert_eq!(owner_type_name("my-demo"), "MyDemo");
        assert_eq!(owner_type_name("2048"), "Z048");
    }

    #[test]
    fn banner_carries_timestamp() {
        let text = banner("2024-01-01 00:00:00", "class");
        assert!(text.starts_with("/**\n"));
        assert!(text.contains("This class is generated by proptree at 2024-01-01 00:00:00"));
    }
}
