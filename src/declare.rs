//! The declarative configuration tree, before any merging.
//!
//! Every field is optional: an absent field falls through to the next layer
//! when [`merge`](crate::merge) computes the effective configuration. The
//! tree can be built in code through the validating setters, or read from a
//! TOML file:
//!
//! ```toml
//! enabled = true
//!
//! [global.all]
//! properties_file_names = ["gradle.properties", "local.properties"]
//! exclude_keys = [{ regex = "^secret\\..*" }]
//!
//! [global.sources_code]
//! package_name = "com.example.config"
//!
//! [root_project.build_script]
//! extension_name = "props"
//!
//! [projects.":app".all]
//! generate_location_types = ["ROOT_PROJECT", "CURRENT_PROJECT"]
//! ```
//!
//! Key/value rules are closures and can only be attached in code.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ProptreeError;
use crate::types::{KeyMatcher, LocationType, PropertyValue, ValueRule};
use crate::validate::{self, RetainsUnknownKeys};

/// File name every properties list starts from.
pub const DEFAULT_PROPERTIES_FILE_NAME: &str = "gradle.properties";

/// Top of the declaration tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Declaration {
    /// Master switch. Nothing is generated when `false`.
    pub enabled: Option<bool>,
    /// Defaults for every project.
    pub global: SubDeclaration,
    /// Overrides for the root project, whatever its name.
    pub root_project: Option<SubDeclaration>,
    /// Overrides keyed by project name (`:app`, `app`, `:core:data`).
    pub projects: IndexMap<String, SubDeclaration>,
}

/// One level of the tree: a shared base block plus the two feature blocks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubDeclaration {
    pub all: Option<BaseBlock>,
    pub sources_code: Option<SourcesCodeBlock>,
    pub build_script: Option<BuildScriptBlock>,
}

/// Fields shared by both features.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseBlock {
    pub enabled: Option<bool>,
    pub properties_file_names: Option<Vec<String>>,
    pub permanent_key_values: Option<IndexMap<String, PropertyValue>>,
    pub exclude_keys: Option<Vec<KeyMatcher>>,
    pub include_keys: Option<Vec<KeyMatcher>>,
    #[serde(skip)]
    pub key_value_rules: Option<IndexMap<String, ValueRule>>,
    pub exclude_non_string_value: Option<bool>,
    pub type_auto_conversion: Option<bool>,
    pub value_interpolation: Option<bool>,
    pub generate_location_types: Option<Vec<LocationType>>,
    /// Keys nobody claimed, kept for strict-mode reporting.
    #[serde(flatten)]
    pub(crate) unknown: IndexMap<String, toml::Value>,
}

/// Base fields plus the project-sources generator settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesCodeBlock {
    #[serde(flatten)]
    pub base: BaseBlock,
    pub generate_dir_path: Option<String>,
    pub source_set_name: Option<String>,
    pub package_name: Option<String>,
    pub class_name: Option<String>,
    pub restricted_access: Option<bool>,
}

/// Base fields plus the build-script accessor settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildScriptBlock {
    #[serde(flatten)]
    pub base: BaseBlock,
    pub extension_name: Option<String>,
}

impl BaseBlock {
    pub fn enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = Some(enabled);
        self
    }

    /// Properties files to read from each location, in order.
    ///
    /// Duplicates are dropped keeping the first occurrence. With
    /// `add_default`, [`DEFAULT_PROPERTIES_FILE_NAME`] is put first.
    pub fn properties_file_names(
        &mut self,
        names: &[&str],
        add_default: bool,
    ) -> Result<&mut Self, ProptreeError> {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        check_list("properties_file_names", &names, |n| n.as_str())?;
        self.properties_file_names = Some(normalize_file_names(names, add_default));
        Ok(self)
    }

    /// Key/values always present in the output, before any source is read.
    pub fn permanent_key_values<K, V>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<&mut Self, ProptreeError>
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let map: IndexMap<String, PropertyValue> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let keys: Vec<&String> = map.keys().collect();
        check_list("permanent_key_values", &keys, |k| k.as_str())?;
        self.permanent_key_values = Some(map);
        Ok(self)
    }

    pub fn exclude_keys(&mut self, keys: Vec<KeyMatcher>) -> Result<&mut Self, ProptreeError> {
        check_list("exclude_keys", &keys, KeyMatcher::as_str)?;
        self.exclude_keys = Some(keys);
        Ok(self)
    }

    pub fn include_keys(&mut self, keys: Vec<KeyMatcher>) -> Result<&mut Self, ProptreeError> {
        check_list("include_keys", &keys, KeyMatcher::as_str)?;
        self.include_keys = Some(keys);
        Ok(self)
    }

    /// Per-key transforms, applied after interpolation.
    pub fn key_value_rules<K: Into<String>>(
        &mut self,
        rules: impl IntoIterator<Item = (K, ValueRule)>,
    ) -> Result<&mut Self, ProptreeError> {
        let map: IndexMap<String, ValueRule> =
            rules.into_iter().map(|(k, r)| (k.into(), r)).collect();
        let keys: Vec<&String> = map.keys().collect();
        check_list("key_value_rules", &keys, |k| k.as_str())?;
        self.key_value_rules = Some(map);
        Ok(self)
    }

    pub fn exclude_non_string_value(&mut self, enabled: bool) -> &mut Self {
        self.exclude_non_string_value = Some(enabled);
        self
    }

    pub fn type_auto_conversion(&mut self, enabled: bool) -> &mut Self {
        self.type_auto_conversion = Some(enabled);
        self
    }

    pub fn value_interpolation(&mut self, enabled: bool) -> &mut Self {
        self.value_interpolation = Some(enabled);
        self
    }

    /// Location tags by name (`CURRENT_PROJECT`, `ROOT_PROJECT`, `GLOBAL`,
    /// `SYSTEM`, `SYSTEM_ENV`). Later tags override earlier ones.
    pub fn generate_from(&mut self, types: &[&str]) -> Result<&mut Self, ProptreeError> {
        if types.is_empty() {
            return Err(ProptreeError::EmptyDeclaration("generate_location_types"));
        }
        let parsed = types
            .iter()
            .map(|t| t.parse::<LocationType>())
            .collect::<Result<Vec<_>, _>>()?;
        self.generate_location_types = Some(parsed);
        Ok(self)
    }

    /// Re-check lists that arrived without going through the setters.
    fn validate(&self) -> Result<(), ProptreeError> {
        if let Some(names) = &self.properties_file_names {
            check_list("properties_file_names", names, |n| n.as_str())?;
        }
        if let Some(map) = &self.permanent_key_values {
            let keys: Vec<&String> = map.keys().collect();
            check_list("permanent_key_values", &keys, |k| k.as_str())?;
        }
        if let Some(keys) = &self.exclude_keys {
            check_list("exclude_keys", keys, KeyMatcher::as_str)?;
        }
        if let Some(keys) = &self.include_keys {
            check_list("include_keys", keys, KeyMatcher::as_str)?;
        }
        if let Some(rules) = &self.key_value_rules {
            let keys: Vec<&String> = rules.keys().collect();
            check_list("key_value_rules", &keys, |k| k.as_str())?;
        }
        if self
            .generate_location_types
            .as_ref()
            .is_some_and(|t| t.is_empty())
        {
            return Err(ProptreeError::EmptyDeclaration("generate_location_types"));
        }
        Ok(())
    }

    fn unknown_keys(&self, prefix: &str, out: &mut Vec<String>) {
        out.extend(self.unknown.keys().map(|k| format!("{prefix}.{k}")));
    }
}

impl SourcesCodeBlock {
    pub fn generate_dir_path(&mut self, path: &str) -> &mut Self {
        self.generate_dir_path = Some(path.to_string());
        self
    }

    pub fn source_set_name(&mut self, name: &str) -> &mut Self {
        self.source_set_name = Some(name.to_string());
        self
    }

    pub fn package_name(&mut self, name: &str) -> &mut Self {
        self.package_name = Some(name.to_string());
        self
    }

    pub fn class_name(&mut self, name: &str) -> &mut Self {
        self.class_name = Some(name.to_string());
        self
    }

    pub fn restricted_access(&mut self, enabled: bool) -> &mut Self {
        self.restricted_access = Some(enabled);
        self
    }
}

impl BuildScriptBlock {
    pub fn extension_name(&mut self, name: &str) -> &mut Self {
        self.extension_name = Some(name.to_string());
        self
    }
}

impl SubDeclaration {
    pub fn all(&mut self) -> &mut BaseBlock {
        self.all.get_or_insert_with(BaseBlock::default)
    }

    pub fn sources_code(&mut self) -> &mut SourcesCodeBlock {
        self.sources_code.get_or_insert_with(SourcesCodeBlock::default)
    }

    pub fn build_script(&mut self) -> &mut BuildScriptBlock {
        self.build_script.get_or_insert_with(BuildScriptBlock::default)
    }

    /// Name grammar checks for the generated symbols this level declares.
    pub(crate) fn check_names(&self) -> Result<(), ProptreeError> {
        if let Some(block) = &self.sources_code {
            validate::check_package_name(block.package_name.as_deref().unwrap_or_default())?;
            validate::check_class_name(block.class_name.as_deref().unwrap_or_default())?;
        }
        if let Some(block) = &self.build_script {
            validate::check_extension_name(block.extension_name.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ProptreeError> {
        if let Some(all) = &self.all {
            all.validate()?;
        }
        if let Some(block) = &self.sources_code {
            block.base.validate()?;
        }
        if let Some(block) = &self.build_script {
            block.base.validate()?;
        }
        Ok(())
    }

    fn unknown_keys(&self, prefix: &str, out: &mut Vec<String>) {
        if let Some(all) = &self.all {
            all.unknown_keys(&format!("{prefix}.all"), out);
        }
        if let Some(block) = &self.sources_code {
            block.base.unknown_keys(&format!("{prefix}.sources_code"), out);
        }
        if let Some(block) = &self.build_script {
            block.base.unknown_keys(&format!("{prefix}.build_script"), out);
        }
    }
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn global(&mut self) -> &mut SubDeclaration {
        &mut self.global
    }

    pub fn root_project(&mut self) -> &mut SubDeclaration {
        self.root_project.get_or_insert_with(SubDeclaration::default)
    }

    /// Declaration for one project, created on first use.
    pub fn project(&mut self, name: &str) -> &mut SubDeclaration {
        self.projects.entry(name.to_string()).or_default()
    }

    /// Parse a TOML declaration.
    ///
    /// In strict mode unknown keys are rejected with their line numbers.
    /// Empty or blank lists are rejected in either mode.
    pub fn from_toml_str(content: &str, path: &Path, strict: bool) -> Result<Self, ProptreeError> {
        if strict {
            validate::validate_unknown_keys::<Declaration>(content, path)?;
        }
        let declaration: Declaration =
            toml::from_str(content).map_err(|e| ProptreeError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        declaration.validate()?;
        Ok(declaration)
    }

    /// Read and parse a declaration file. A missing file yields `None`.
    pub fn load(path: &Path, strict: bool) -> Result<Option<(Self, String)>, ProptreeError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProptreeError::io(path, e)),
        };
        let declaration = Self::from_toml_str(&content, path, strict)?;
        Ok(Some((declaration, content)))
    }

    pub(crate) fn validate(&self) -> Result<(), ProptreeError> {
        self.global.validate()?;
        if let Some(root) = &self.root_project {
            root.validate()?;
        }
        self.projects.values().try_for_each(SubDeclaration::validate)
    }
}

impl RetainsUnknownKeys for Declaration {
    fn retained_unknown_keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.global.unknown_keys("global", &mut out);
        if let Some(root) = &self.root_project {
            root.unknown_keys("root_project", &mut out);
        }
        for (name, sub) in &self.projects {
            sub.unknown_keys(&format!("projects.{name}"), &mut out);
        }
        out
    }
}

/// Reject an empty list or one with a blank entry.
fn check_list<T>(
    field: &'static str,
    items: &[T],
    text: impl Fn(&T) -> &str,
) -> Result<(), ProptreeError> {
    if items.is_empty() {
        return Err(ProptreeError::EmptyDeclaration(field));
    }
    if items.iter().any(|item| text(item).trim().is_empty()) {
        return Err(ProptreeError::BlankDeclaration(field));
    }
    Ok(())
}

fn normalize_file_names(names: Vec<String>, add_default: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len() + 1);
    if add_default {
        out.push(DEFAULT_PROPERTIES_FILE_NAME.to_string());
    }
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("/work/proptree.toml")
    }

    #[test]
    fn file_names_dedup_and_prepend_default() {
        let mut block = BaseBlock::default();
        block
            .properties_file_names(&["local.properties", "gradle.properties", "local.properties"], true)
            .unwrap();
        assert_eq!(
            block.properties_file_names.as_deref().unwrap(),
            ["gradle.properties", "local.properties"]
        );

        block.properties_file_names(&["a.properties"], false).unwrap();
        assert_eq!(block.properties_file_names.as_deref().unwrap(), ["a.properties"]);
    }

    #[test]
    fn empty_and_blank_lists_are_rejected() {
        let mut block = BaseBlock::default();
        assert!(matches!(
            block.properties_file_names(&[], true),
            Err(ProptreeError::EmptyDeclaration("properties_file_names"))
        ));
        assert!(matches!(
            block.properties_file_names(&["  "], false),
            Err(ProptreeError::BlankDeclaration("properties_file_names"))
        ));
        assert!(matches!(
            block.exclude_keys(vec![]),
            Err(ProptreeError::EmptyDeclaration("exclude_keys"))
        ));
        assert!(matches!(
            block.include_keys(vec![KeyMatcher::literal("")]),
            Err(ProptreeError::BlankDeclaration("include_keys"))
        ));
        assert!(matches!(
            block.permanent_key_values(Vec::<(String, String)>::new()),
            Err(ProptreeError::EmptyDeclaration("permanent_key_values"))
        ));
        assert!(matches!(
            block.key_value_rules(Vec::<(String, ValueRule)>::new()),
            Err(ProptreeError::EmptyDeclaration("key_value_rules"))
        ));
        assert!(matches!(
            block.generate_from(&[]),
            Err(ProptreeError::EmptyDeclaration("generate_location_types"))
        ));
    }

    #[test]
    fn generate_from_parses_tags() {
        let mut block = BaseBlock::default();
        block.generate_from(&["ROOT_PROJECT", "SYSTEM_ENV"]).unwrap();
        assert_eq!(
            block.generate_location_types.as_deref().unwrap(),
            [LocationType::RootProject, LocationType::SystemEnv]
        );
        assert!(matches!(
            block.generate_from(&["ROOT_PROJECT", "NOWHERE"]),
            Err(ProptreeError::InvalidLocationType(ref t)) if t == "NOWHERE"
        ));
    }

    #[test]
    fn setters_create_blocks_on_demand() {
        let mut decl = Declaration::new();
        decl.global().all().enabled(false);
        decl.project(":app").sources_code().class_name("AppConfig");
        decl.project(":app").build_script().extension_name("props");
        assert_eq!(decl.global.all.as_ref().unwrap().enabled, Some(false));
        let app = &decl.projects[":app"];
        assert_eq!(app.sources_code.as_ref().unwrap().class_name.as_deref(), Some("AppConfig"));
        assert_eq!(app.build_script.as_ref().unwrap().extension_name.as_deref(), Some("props"));
        assert!(decl.root_project.is_none());
    }

    #[test]
    fn parses_full_toml_declaration() {
        let content = r#"
enabled = true

[global.all]
properties_file_names = ["gradle.properties", "local.properties"]
exclude_keys = ["debug.flag", { regex = "^secret\\..*" }]
permanent_key_values = { "build.ci" = "false", "build.number" = 42 }

[global.sources_code]
package_name = "com.example.config"
type_auto_conversion = false

[root_project.build_script]
extension_name = "props"

[projects.":app".all]
generate_location_types = ["ROOT_PROJECT", "CURRENT_PROJECT"]
"#;
        let decl = Declaration::from_toml_str(content, &path(), true).unwrap();
        assert_eq!(decl.enabled, Some(true));
        let all = decl.global.all.as_ref().unwrap();
        assert_eq!(all.properties_file_names.as_ref().unwrap().len(), 2);
        let excludes = all.exclude_keys.as_ref().unwrap();
        assert!(excludes[1].matches("secret.token"));
        let permanent = all.permanent_key_values.as_ref().unwrap();
        assert_eq!(permanent["build.ci"], PropertyValue::from("false"));
        assert_eq!(permanent["build.number"], PropertyValue::Integer(42));
        let sources = decl.global.sources_code.as_ref().unwrap();
        assert_eq!(sources.package_name.as_deref(), Some("com.example.config"));
        assert_eq!(sources.base.type_auto_conversion, Some(false));
        assert_eq!(
            decl.root_project.as_ref().unwrap().build_script.as_ref().unwrap().extension_name.as_deref(),
            Some("props")
        );
        assert_eq!(
            decl.projects[":app"].all.as_ref().unwrap().generate_location_types.as_deref(),
            Some(&[LocationType::RootProject, LocationType::CurrentProject][..])
        );
    }

    #[test]
    fn strict_reports_unknown_keys_inside_blocks() {
        let content = "[global.sources_code]\npackage_name = \"a.b\"\nclas_name = \"X\"\n";
        let err = Declaration::from_toml_str(content, &path(), true).unwrap_err();
        match err {
            ProptreeError::UnknownKeys(keys) => match &keys[0] {
                ProptreeError::UnknownKey { key, line, .. } => {
                    assert_eq!(key, "global.sources_code.clas_name");
                    assert_eq!(*line, 3);
                }
                other => panic!("Expected UnknownKey, got: {other:?}"),
            },
            other => panic!("Expected UnknownKeys, got: {other:?}"),
        }
    }

    #[test]
    fn lenient_ignores_unknown_keys() {
        let content = "[global.all]\nenabeld = false\n";
        let decl = Declaration::from_toml_str(content, &path(), false).unwrap();
        assert_eq!(decl.global.all.as_ref().unwrap().enabled, None);
    }

    #[test]
    fn toml_lists_are_validated() {
        let content = "[global.all]\nproperties_file_names = []\n";
        let err = Declaration::from_toml_str(content, &path(), true).unwrap_err();
        assert!(matches!(err, ProptreeError::EmptyDeclaration("properties_file_names")));
    }

    #[test]
    fn invalid_location_type_in_toml() {
        let content = "[global.all]\ngenerate_location_types = [\"HOME\"]\n";
        let err = Declaration::from_toml_str(content, &path(), false).unwrap_err();
        assert!(matches!(err, ProptreeError::ParseError { .. }));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = Declaration::load(&dir.path().join("proptree.toml"), true).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_returns_text_for_fingerprinting() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("proptree.toml");
        std::fs::write(&file, "enabled = false\n").unwrap();
        let (decl, text) = Declaration::load(&file, true).unwrap().unwrap();
        assert_eq!(decl.enabled, Some(false));
        assert_eq!(text, "enabled = false\n");
    }
}
