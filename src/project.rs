//! Read-only snapshot of the host build's project graph.
//!
//! The root project is addressed by its plain name; sub-projects by their
//! full colon path (`:app`, `:core:data`). Lookups accept sub-project names
//! with or without the leading colon.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::ProptreeError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SubProject {
    dir: PathBuf,
    group: Option<String>,
}

/// Project names and directories as handed over by the host build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTree {
    root_name: String,
    root_dir: PathBuf,
    home_dir: PathBuf,
    root_group: Option<String>,
    subprojects: IndexMap<String, SubProject>,
}

/// Everything the resolution pipeline needs to know about one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// Full name: the plain root name, or `:a:b` for sub-projects.
    pub name: String,
    pub current_dir: PathBuf,
    pub root_dir: PathBuf,
    /// The build tool's user home (`GLOBAL` location).
    pub home_dir: PathBuf,
    pub is_root: bool,
    /// Maven group, if the host assigned one.
    pub group: Option<String>,
}

impl ProjectDescriptor {
    /// Name without the leading colon (`app:data` for `:app:data`).
    pub fn plain_name(&self) -> &str {
        self.name.strip_prefix(':').unwrap_or(&self.name)
    }
}

/// Full name of a sub-project: ensures exactly one leading colon.
pub fn full_name(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

impl ProjectTree {
    pub fn new(
        root_name: impl Into<String>,
        root_dir: impl Into<PathBuf>,
        home_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root_name: root_name.into(),
            root_dir: root_dir.into(),
            home_dir: home_dir.into(),
            root_group: None,
            subprojects: IndexMap::new(),
        }
    }

    /// Register a sub-project. `name` may omit the leading colon.
    pub fn with_subproject(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.subprojects.insert(
            full_name(name),
            SubProject {
                dir: dir.into(),
                group: None,
            },
        );
        self
    }

    /// Assign a Maven group to the root project or a registered sub-project.
    pub fn with_group(mut self, name: &str, group: &str) -> Self {
        if name == self.root_name {
            self.root_group = Some(group.to_string());
        } else if let Some(sub) = self.subprojects.get_mut(&full_name(name)) {
            sub.group = Some(group.to_string());
        }
        self
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn root(&self) -> ProjectDescriptor {
        ProjectDescriptor {
            name: self.root_name.clone(),
            current_dir: self.root_dir.clone(),
            root_dir: self.root_dir.clone(),
            home_dir: self.home_dir.clone(),
            is_root: true,
            group: self.root_group.clone(),
        }
    }

    /// Look up a project. A blank name or the root name is the root project.
    pub fn descriptor(&self, name: &str) -> Result<ProjectDescriptor, ProptreeError> {
        if name.trim().is_empty() || name == self.root_name {
            return Ok(self.root());
        }
        let full = full_name(name);
        let sub = self
            .subprojects
            .get(&full)
            .ok_or_else(|| ProptreeError::ProjectNotFound(name.to_string()))?;
        Ok(ProjectDescriptor {
            name: full,
            current_dir: sub.dir.clone(),
            root_dir: self.root_dir.clone(),
            home_dir: self.home_dir.clone(),
            is_root: false,
            group: sub.group.clone(),
        })
    }

    /// Root first, then sub-projects in registration order.
    pub fn projects(&self) -> Vec<ProjectDescriptor> {
        let mut out = vec![self.root()];
        out.extend(self.subprojects.keys().filter_map(|n| self.descriptor(n).ok()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ProjectTree {
        ProjectTree::new("demo", "/work/demo", "/home/me/.gradle")
            .with_subproject(":app", "/work/demo/app")
            .with_subproject("core:data", "/work/demo/core/data")
            .with_group(":app", "com.example")
    }

    #[test]
    fn root_lookup() {
        let tree = tree();
        for name in ["", "demo"] {
            let root = tree.descriptor(name).unwrap();
            assert!(root.is_root);
            assert_eq!(root.name, "demo");
            assert_eq!(root.current_dir, PathBuf::from("/work/demo"));
        }
    }

    #[test]
    fn subproject_lookup_with_or_without_colon() {
        let tree = tree();
        let app = tree.descriptor("app").unwrap();
        assert_eq!(app.name, ":app");
        assert_eq!(app.current_dir, PathBuf::from("/work/demo/app"));
        assert_eq!(app.root_dir, PathBuf::from("/work/demo"));
        assert_eq!(app.group.as_deref(), Some("com.example"));
        assert_eq!(tree.descriptor(":core:data").unwrap().plain_name(), "core:data");
    }

    #[test]
    fn unknown_project_is_not_found() {
        let err = tree().descriptor(":nope").unwrap_err();
        assert!(matches!(err, ProptreeError::ProjectNotFound(ref n) if n == ":nope"));
    }

    #[test]
    fn projects_are_root_first() {
        let names: Vec<String> = tree().projects().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["demo", ":app", ":core:data"]);
    }

    #[test]
    fn full_name_adds_single_colon() {
        assert_eq!(full_name("app"), ":app");
        assert_eq!(full_name(":app"), ":app");
    }
}
