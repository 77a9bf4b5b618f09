//! Effective configuration: collapse the declaration tree into one fully
//! populated config per (project, feature).
//!
//! Each field is looked up independently through four layers and stops at
//! the first one that declares it:
//!
//! ```text
//! self-specific ?? self-base ?? global-specific ?? global-base ?? default
//! ```
//!
//! "Specific" is the feature block (`sources_code` / `build_script`), "base"
//! is the shared `all` block, "self" is the project's own declaration and
//! "global" the top-level one. Fields that only exist on a feature block skip
//! the two base layers. Blank strings count as undeclared.

use indexmap::IndexMap;

use crate::declare::{
    BaseBlock, BuildScriptBlock, DEFAULT_PROPERTIES_FILE_NAME, Declaration, SourcesCodeBlock,
    SubDeclaration,
};
use crate::error::ProptreeError;
use crate::project::full_name;
use crate::types::{DEFAULT_LOCATION_TYPES, KeyMatcher, LocationType, PropertyValue, ValueRule};
use crate::validate;

/// Owner name of the configs every undeclared project falls back to.
pub const GLOBAL_CONFIG_NAME: &str = "Global";
pub const DEFAULT_EXTENSION_NAME: &str = "property";
pub const DEFAULT_GENERATE_DIR_PATH: &str = "build/generated/proptree";
pub const DEFAULT_SOURCE_SET_NAME: &str = "main";

/// Merged fields shared by both features.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// Owner: [`GLOBAL_CONFIG_NAME`] or a project's full name.
    pub name: String,
    pub enabled: bool,
    pub properties_file_names: Vec<String>,
    pub permanent_key_values: IndexMap<String, PropertyValue>,
    pub exclude_keys: Vec<KeyMatcher>,
    pub include_keys: Vec<KeyMatcher>,
    pub key_value_rules: IndexMap<String, ValueRule>,
    pub exclude_non_string_value: bool,
    pub type_auto_conversion: bool,
    pub value_interpolation: bool,
    pub generate_location_types: Vec<LocationType>,
}

#[derive(Debug, Clone)]
pub struct SourcesCodeConfig {
    pub base: BaseConfig,
    /// Output directory, relative to the project directory.
    pub generate_dir_path: String,
    pub source_set_name: String,
    /// `None` means derive from the project (see [`generator::sources`](crate::generator::sources)).
    pub package_name: Option<String>,
    pub class_name: Option<String>,
    /// Emit `internal` instead of public declarations.
    pub restricted_access: bool,
}

#[derive(Debug, Clone)]
pub struct BuildScriptConfig {
    pub base: BaseConfig,
    pub extension_name: String,
}

impl BuildScriptConfig {
    /// The symbol the extension is registered under (`my-props` → `myProps`).
    pub fn extension_symbol(&self) -> String {
        crate::naming::camelcase(&self.extension_name)
    }
}

/// Both feature configs of one owner.
#[derive(Debug, Clone)]
pub struct SubConfigs {
    pub sources_code: SourcesCodeConfig,
    pub build_script: BuildScriptConfig,
}

/// The merged configuration for a whole build.
#[derive(Debug, Clone)]
pub struct ResolvedConfigs {
    pub enabled: bool,
    pub global: SubConfigs,
    /// Keyed by full project name; the root project under its plain name.
    pub projects: IndexMap<String, SubConfigs>,
}

impl ResolvedConfigs {
    /// Configs for a project, falling back to the global ones.
    pub fn with(&self, project: &str) -> &SubConfigs {
        self.projects.get(project).unwrap_or(&self.global)
    }
}

/// Feature blocks expose their embedded base fields.
trait FeatureBlock {
    fn base(&self) -> &BaseBlock;
}

impl FeatureBlock for SourcesCodeBlock {
    fn base(&self) -> &BaseBlock {
        &self.base
    }
}

impl FeatureBlock for BuildScriptBlock {
    fn base(&self) -> &BaseBlock {
        &self.base
    }
}

/// The four declared layers for one (owner, feature).
struct Layers<'a, S> {
    self_specific: Option<&'a S>,
    self_base: Option<&'a BaseBlock>,
    global_specific: Option<&'a S>,
    global_base: Option<&'a BaseBlock>,
}

impl<S: FeatureBlock> Layers<'_, S> {
    /// First declared value of a base field across all four layers.
    fn base_field<T>(&self, field: impl Fn(&BaseBlock) -> Option<&T>) -> Option<T::Owned>
    where
        T: ToOwned + ?Sized,
    {
        [
            self.self_specific.map(FeatureBlock::base),
            self.self_base,
            self.global_specific.map(FeatureBlock::base),
            self.global_base,
        ]
        .into_iter()
        .flatten()
        .find_map(field)
        .map(ToOwned::to_owned)
    }

    /// First declared value of a feature-only field.
    fn specific_field<T>(&self, field: impl Fn(&S) -> Option<&T>) -> Option<T::Owned>
    where
        T: ToOwned + ?Sized,
    {
        [self.self_specific, self.global_specific]
            .into_iter()
            .flatten()
            .find_map(field)
            .map(ToOwned::to_owned)
    }

    fn base_config(&self, name: &str) -> BaseConfig {
        BaseConfig {
            name: name.to_string(),
            enabled: self.base_field(|b| b.enabled.as_ref()).unwrap_or(true),
            properties_file_names: self
                .base_field(|b| b.properties_file_names.as_deref())
                .unwrap_or_else(|| vec![DEFAULT_PROPERTIES_FILE_NAME.to_string()]),
            permanent_key_values: self
                .base_field(|b| b.permanent_key_values.as_ref())
                .unwrap_or_default(),
            exclude_keys: self
                .base_field(|b| b.exclude_keys.as_deref())
                .unwrap_or_default(),
            include_keys: self
                .base_field(|b| b.include_keys.as_deref())
                .unwrap_or_default(),
            key_value_rules: self
                .base_field(|b| b.key_value_rules.as_ref())
                .unwrap_or_default(),
            exclude_non_string_value: self
                .base_field(|b| b.exclude_non_string_value.as_ref())
                .unwrap_or(true),
            type_auto_conversion: self
                .base_field(|b| b.type_auto_conversion.as_ref())
                .unwrap_or(true),
            value_interpolation: self
                .base_field(|b| b.value_interpolation.as_ref())
                .unwrap_or(true),
            generate_location_types: self
                .base_field(|b| b.generate_location_types.as_deref())
                .unwrap_or_else(|| DEFAULT_LOCATION_TYPES.to_vec()),
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}

fn sources_code_config(name: &str, own: &SubDeclaration, global: &SubDeclaration) -> SourcesCodeConfig {
    let layers = Layers {
        self_specific: own.sources_code.as_ref(),
        self_base: own.all.as_ref(),
        global_specific: global.sources_code.as_ref(),
        global_base: global.all.as_ref(),
    };
    SourcesCodeConfig {
        base: layers.base_config(name),
        generate_dir_path: layers
            .specific_field(|b| non_blank(&b.generate_dir_path))
            .unwrap_or_else(|| DEFAULT_GENERATE_DIR_PATH.to_string()),
        source_set_name: layers
            .specific_field(|b| non_blank(&b.source_set_name))
            .unwrap_or_else(|| DEFAULT_SOURCE_SET_NAME.to_string()),
        package_name: layers.specific_field(|b| non_blank(&b.package_name)),
        class_name: layers.specific_field(|b| non_blank(&b.class_name)),
        restricted_access: layers
            .specific_field(|b| b.restricted_access.as_ref())
            .unwrap_or(false),
    }
}

fn build_script_config(name: &str, own: &SubDeclaration, global: &SubDeclaration) -> BuildScriptConfig {
    let layers = Layers {
        self_specific: own.build_script.as_ref(),
        self_base: own.all.as_ref(),
        global_specific: global.build_script.as_ref(),
        global_base: global.all.as_ref(),
    };
    BuildScriptConfig {
        base: layers.base_config(name),
        extension_name: layers
            .specific_field(|b| non_blank(&b.extension_name))
            .unwrap_or_else(|| DEFAULT_EXTENSION_NAME.to_string()),
    }
}

fn sub_configs(name: &str, own: &SubDeclaration, global: &SubDeclaration) -> SubConfigs {
    SubConfigs {
        sources_code: sources_code_config(name, own, global),
        build_script: build_script_config(name, own, global),
    }
}

/// Validate `declaration` and merge it for a build whose root project is
/// `root_name`.
///
/// Fails on the first malformed name, on a project declared under the root
/// project's own name, and on project names not starting with a letter.
pub fn resolve_declaration(
    declaration: &Declaration,
    root_name: &str,
) -> Result<ResolvedConfigs, ProptreeError> {
    declaration.validate()?;
    declaration.global.check_names()?;
    if let Some(name) = declaration
        .projects
        .keys()
        .find(|name| name.to_lowercase() == root_name.to_lowercase())
    {
        return Err(ProptreeError::RootProjectMisconfigured(name.clone()));
    }

    let mut declared: Vec<(String, &SubDeclaration)> = Vec::new();
    if let Some(root) = &declaration.root_project {
        declared.push((root_name.to_string(), root));
    }
    for (name, sub) in &declaration.projects {
        validate::check_project_name(name)?;
        declared.push((full_name(name), sub));
    }

    let mut projects = IndexMap::new();
    for (name, sub) in declared {
        sub.check_names()?;
        projects.insert(name.clone(), sub_configs(&name, sub, &declaration.global));
    }

    Ok(ResolvedConfigs {
        enabled: declaration.enabled.unwrap_or(true),
        global: sub_configs(GLOBAL_CONFIG_NAME, &declaration.global, &declaration.global),
        projects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn merged(decl: &Declaration) -> ResolvedConfigs {
        resolve_declaration(decl, "demo").unwrap()
    }

    #[test]
    fn defaults_when_nothing_declared() {
        let configs = merged(&Declaration::new());
        assert!(configs.enabled);
        let sources = &configs.global.sources_code;
        assert_eq!(sources.base.name, GLOBAL_CONFIG_NAME);
        assert!(sources.base.enabled);
        assert_eq!(sources.base.properties_file_names, vec!["gradle.properties"]);
        assert!(sources.base.permanent_key_values.is_empty());
        assert!(sources.base.exclude_non_string_value);
        assert!(sources.base.type_auto_conversion);
        assert!(sources.base.value_interpolation);
        assert_eq!(
            sources.base.generate_location_types,
            vec![LocationType::CurrentProject, LocationType::RootProject]
        );
        assert_eq!(sources.generate_dir_path, DEFAULT_GENERATE_DIR_PATH);
        assert_eq!(sources.source_set_name, "main");
        assert_eq!(sources.package_name, None);
        assert!(!sources.restricted_access);
        assert_eq!(configs.global.build_script.extension_name, "property");
    }

    /// Layer 0 = self-specific, 1 = self-base, 2 = global-specific,
    /// 3 = global-base, 4 = nothing declared. The selected layer declares
    /// `false`, every layer below it declares `true`.
    #[rstest]
    #[case(0, false)]
    #[case(1, false)]
    #[case(2, false)]
    #[case(3, false)]
    #[case(4, true)]
    fn enabled_precedence(#[case] selected: usize, #[case] expected: bool) {
        let mut decl = Declaration::new();
        let value = |layer: usize| layer != selected;
        for layer in selected..4 {
            match layer {
                0 => {
                    decl.project(":app").sources_code().base.enabled(value(0));
                }
                1 => {
                    decl.project(":app").all().enabled(value(1));
                }
                2 => {
                    decl.global().sources_code().base.enabled(value(2));
                }
                _ => {
                    decl.global().all().enabled(value(3));
                }
            }
        }
        let configs = merged(&decl);
        assert_eq!(configs.with(":app").sources_code.base.enabled, expected);
    }

    #[test]
    fn list_fields_use_the_same_layers() {
        let mut decl = Declaration::new();
        decl.global().all().properties_file_names(&["global-base.properties"], false).unwrap();
        decl.global()
            .build_script()
            .base
            .properties_file_names(&["global-specific.properties"], false)
            .unwrap();
        decl.project("app").all().properties_file_names(&["self-base.properties"], false).unwrap();
        let configs = merged(&decl);
        let app = configs.with(":app");
        assert_eq!(app.build_script.base.properties_file_names, vec!["self-base.properties"]);
        assert_eq!(app.sources_code.base.properties_file_names, vec!["self-base.properties"]);
        assert_eq!(
            configs.global.build_script.base.properties_file_names,
            vec!["global-specific.properties"]
        );
        assert_eq!(
            configs.global.sources_code.base.properties_file_names,
            vec!["global-base.properties"]
        );
    }

    #[test]
    fn feature_only_fields_skip_base_layers() {
        let mut decl = Declaration::new();
        decl.global().sources_code().package_name("com.example.global");
        decl.project(":app").sources_code().class_name("AppConfig");
        decl.project(":lib").sources_code().package_name("  ");
        let configs = merged(&decl);
        let app = &configs.with(":app").sources_code;
        assert_eq!(app.package_name.as_deref(), Some("com.example.global"));
        assert_eq!(app.class_name.as_deref(), Some("AppConfig"));
        let lib = &configs.with(":lib").sources_code;
        assert_eq!(lib.package_name.as_deref(), Some("com.example.global"));
    }

    #[test]
    fn undeclared_project_uses_global() {
        let mut decl = Declaration::new();
        decl.global().build_script().extension_name("props");
        let configs = merged(&decl);
        let other = configs.with(":other");
        assert_eq!(other.build_script.base.name, GLOBAL_CONFIG_NAME);
        assert_eq!(other.build_script.extension_name, "props");
    }

    #[test]
    fn project_keys_are_normalized_to_full_names() {
        let mut decl = Declaration::new();
        decl.project("app").all().enabled(false);
        decl.project(":core:data").all().enabled(false);
        let configs = merged(&decl);
        assert!(configs.projects.contains_key(":app"));
        assert!(configs.projects.contains_key(":core:data"));
        assert_eq!(configs.with(":app").sources_code.base.name, ":app");
    }

    #[test]
    fn root_project_block_is_keyed_by_root_name() {
        let mut decl = Declaration::new();
        decl.root_project().build_script().extension_name("rootProps");
        let configs = merged(&decl);
        assert_eq!(configs.with("demo").build_script.extension_name, "rootProps");
        assert_eq!(configs.with("demo").build_script.extension_symbol(), "rootProps");
    }

    #[test]
    fn root_name_under_projects_is_rejected() {
        let mut decl = Declaration::new();
        decl.project("Demo");
        let err = resolve_declaration(&decl, "demo").unwrap_err();
        assert!(matches!(err, ProptreeError::RootProjectMisconfigured(ref n) if n == "Demo"));
    }

    #[test]
    fn invalid_names_fail_fast() {
        let mut decl = Declaration::new();
        decl.global().sources_code().package_name("com..bad");
        assert!(matches!(
            resolve_declaration(&decl, "demo"),
            Err(ProptreeError::InvalidPackageName(_))
        ));

        let mut decl = Declaration::new();
        decl.project(":app").sources_code().class_name("9Lives");
        assert!(matches!(
            resolve_declaration(&decl, "demo"),
            Err(ProptreeError::InvalidClassName(_))
        ));

        let mut decl = Declaration::new();
        decl.project(":app").build_script().extension_name("tasks");
        assert!(matches!(
            resolve_declaration(&decl, "demo"),
            Err(ProptreeError::ReservedExtensionName(_))
        ));

        let mut decl = Declaration::new();
        decl.project(":1app");
        assert!(matches!(
            resolve_declaration(&decl, "demo"),
            Err(ProptreeError::NotStartingWithLetter { kind: "Project", .. })
        ));
    }

    #[test]
    fn master_switch() {
        let mut decl = Declaration::new();
        decl.enabled(false);
        assert!(!merged(&decl).enabled);
    }
}
