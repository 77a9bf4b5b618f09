#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::declare::Declaration;
    use crate::merge::{BaseConfig, resolve_declaration};
    use crate::project::{ProjectDescriptor, ProjectTree};
    use crate::types::{PropertyMap, PropertyValue, SourceTable};

    /// Timestamp used in place of the wall clock in generated banners.
    pub const FIXED_TIMESTAMP: &str = "2024-01-01 00:00:00";

    /// Defaults for every field, owned by the global config.
    pub fn base_config() -> BaseConfig {
        resolve_declaration(&Declaration::new(), "demo")
            .unwrap()
            .global
            .sources_code
            .base
    }

    pub fn table(pairs: &[(&str, &str)]) -> SourceTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::from(*v)))
            .collect()
    }

    pub fn map(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// A sub-project `:app` with separate current, root and home directories,
    /// all existing and empty.
    pub fn project_dirs() -> (TempDir, ProjectDescriptor) {
        let dir = TempDir::new().unwrap();
        let tree = sample_tree(dir.path());
        let app = tree.descriptor(":app").unwrap();
        (dir, app)
    }

    /// Root `demo` at `<base>/demo` with sub-projects `:app` and `:lib`,
    /// user home at `<base>/home`. Directories are created.
    pub fn sample_tree(base: &Path) -> ProjectTree {
        let root = base.join("demo");
        let home = base.join("home");
        for dir in [root.join("app"), root.join("lib"), home.clone()] {
            fs::create_dir_all(dir).unwrap();
        }
        ProjectTree::new("demo", &root, &home)
            .with_subproject(":app", root.join("app"))
            .with_subproject(":lib", root.join("lib"))
    }

    /// Declaration file exercising every block.
    pub const SAMPLE_DECLARATION: &str = r#"
enabled = true

[global.all]
properties_file_names = ["gradle.properties", "local.properties"]
exclude_keys = [{ regex = "secret\\..*" }]

[global.sources_code]
package_name = "com.example"

[global.build_script]
extension_name = "props"

[root_project.sources_code]
enabled = false

[projects.":app".all]
permanent_key_values = { "build.ci" = false }

[projects.":app".sources_code]
class_name = "AppConfig"
restricted_access = true
"#;

    #[test]
    fn sample_declaration_parses() {
        let decl =
            Declaration::from_toml_str(SAMPLE_DECLARATION, Path::new("proptree.toml"), true)
                .unwrap();
        assert_eq!(decl.enabled, Some(true));
        assert!(decl.root_project.is_some());
        assert!(decl.projects.contains_key(":app"));
    }
}
