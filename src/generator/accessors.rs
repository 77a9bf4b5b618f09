//! Build-script accessors: one Java class per owner exposing its property
//! map as a tree of getters.
//!
//! Keys are split into segments by [`SegmentNamer`]; every prefix becomes a
//! nested `static` class and the last segment a typed getter on the deepest
//! one. `app.name=Demo` and `app.version=1` render roughly as:
//!
//! ```text
//! public class DemoPropertiesAccessors {
//!   private final AppAccessors appAccessors;
//!   public final AppAccessors getApp() { ... }
//!
//!   public static class AppAccessors implements IExtensionAccessors {
//!     public final String getName() { return "Demo"; }
//!     public final int getVersion() { return 1; }
//!   }
//! }
//! ```
//!
//! When two keys normalize to the same getter at the same level the first one
//! is kept and the later one dropped (logged at `debug`).

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GeneratedFile, banner, owner_type_name};
use crate::error::ProptreeError;
use crate::merge::BuildScriptConfig;
use crate::naming::{SegmentName, SegmentNamer, uncapitalize};
use crate::types::PropertyMap;
use crate::typing::{Dialect, TypedValue};

/// Package of every generated accessor class.
pub const ACCESSORS_PACKAGE_NAME: &str = "proptree.plugin.extension.accessors.generated";
/// Package of the marker interface stub.
pub const PROXY_PACKAGE_NAME: &str = "proptree.plugin.extension.accessors.proxy";
pub const MARKER_INTERFACE: &str = "IExtensionAccessors";

const CLASS_SUFFIX: &str = "Accessors";
const TOP_CLASS_SUFFIX: &str = "PropertiesAccessors";
const INDENT: &str = "  ";

/// Owner name → fully-qualified accessor class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorsRegistry {
    classes: IndexMap<String, String>,
}

impl AccessorsRegistry {
    /// Registry for a set of configs, without generating anything.
    pub fn for_configs<'a>(
        configs: impl IntoIterator<Item = &'a BuildScriptConfig>,
    ) -> Result<Self, ProptreeError> {
        let mut registry = Self::default();
        for config in configs {
            let class = top_class_name(&config.base.name)?;
            registry
                .classes
                .insert(config.base.name.clone(), format!("{ACCESSORS_PACKAGE_NAME}.{class}"));
        }
        Ok(registry)
    }

    pub fn class_for(&self, owner: &str) -> Result<&str, ProptreeError> {
        self.classes
            .get(owner)
            .map(String::as_str)
            .ok_or_else(|| ProptreeError::AccessorsNotRegistered(owner.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Generated sources for every owner plus the registry describing them.
#[derive(Debug, Clone)]
pub struct AccessorsOutput {
    pub files: Vec<GeneratedFile>,
    pub registry: AccessorsRegistry,
}

fn top_class_name(owner: &str) -> Result<String, ProptreeError> {
    if owner.trim().is_empty() {
        return Err(ProptreeError::BlankClassName);
    }
    Ok(format!("{}{TOP_CLASS_SUFFIX}", owner_type_name(owner)))
}

#[derive(Debug)]
enum Member {
    /// Getter for a nested accessors class (index into the node arena).
    Child(usize),
    /// Getter returning a value.
    Value { key: String, value: TypedValue },
}

#[derive(Debug)]
struct Node {
    /// Dotted path this class stands for; empty on the top class.
    accessors_name: String,
    /// Java simple name.
    class_name: String,
    /// Getter suffix → member, in insertion order.
    members: IndexMap<String, Member>,
}

impl Node {
    fn inner(segment: &SegmentName) -> Self {
        Node {
            accessors_name: segment.accessors_name.clone(),
            class_name: format!("{}{CLASS_SUFFIX}", segment.class_name),
            members: IndexMap::new(),
        }
    }

    fn field_name(&self) -> String {
        uncapitalize(&self.class_name)
    }
}

/// Trie of one owner's keys. Node 0 is the top-level class.
#[derive(Debug)]
pub struct AccessorTree {
    nodes: Vec<Node>,
    namer: SegmentNamer,
    auto_conversion: bool,
}

impl AccessorTree {
    pub fn new(owner: &str, auto_conversion: bool) -> Result<Self, ProptreeError> {
        let top = Node {
            accessors_name: String::new(),
            class_name: top_class_name(owner)?,
            members: IndexMap::new(),
        };
        Ok(Self {
            nodes: vec![top],
            namer: SegmentNamer::new(),
            auto_conversion,
        })
    }

    pub fn top_class_name(&self) -> &str {
        &self.nodes[0].class_name
    }

    /// Add one key. Returns `false` when an earlier key already owns the
    /// getter this key normalizes to.
    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        let segments = self.namer.resolve(key);
        let Some((last, prefix)) = segments.split_last() else {
            return false;
        };

        let mut current = 0;
        for segment in prefix {
            match self.nodes[current].members.get(&segment.method_name) {
                Some(Member::Child(child)) => current = *child,
                Some(Member::Value { key: owner, .. }) => {
                    debug!(key, kept = %owner, "accessor collides with an existing value, dropped");
                    return false;
                }
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::inner(segment));
                    self.nodes[current]
                        .members
                        .insert(segment.method_name.clone(), Member::Child(child));
                    current = child;
                }
            }
        }

        let node = &mut self.nodes[current];
        if node.members.contains_key(&last.method_name) {
            debug!(key, "accessor already generated by an earlier key, dropped");
            return false;
        }
        node.members.insert(
            last.method_name.clone(),
            Member::Value {
                key: key.to_string(),
                value: TypedValue::parse(value, self.auto_conversion),
            },
        );
        true
    }

    /// Render the complete Java source file.
    pub fn render(&self, timestamp: &str) -> Result<String, ProptreeError> {
        let top = &self.nodes[0];
        if let Some(clash) = self.nodes[1..]
            .iter()
            .find(|n| n.class_name.eq_ignore_ascii_case(&top.class_name))
        {
            return Err(ProptreeError::Generation(format!(
                "nested class \"{}\" for \"{}\" clashes with the top-level class",
                clash.class_name, clash.accessors_name
            )));
        }

        let mut out = String::new();
        out.push_str(&format!("package {ACCESSORS_PACKAGE_NAME};\n\n"));
        out.push_str("import javax.annotation.Nonnull;\n\n");
        out.push_str(&banner(timestamp, "class"));
        out.push_str(&format!("public class {} {{\n", top.class_name));
        self.render_body(0, INDENT, &mut out);
        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            out.push('\n');
            push_doc(&mut out, INDENT, &format!("The \"{}\" accessors", node.accessors_name));
            out.push_str(&format!(
                "{INDENT}public static class {} implements {PROXY_PACKAGE_NAME}.{MARKER_INTERFACE} {{\n",
                node.class_name
            ));
            self.render_body(index, &format!("{INDENT}{INDENT}"), &mut out);
            out.push_str(&format!("{INDENT}}}\n"));
        }
        out.push_str("}\n");
        Ok(out)
    }

    /// Fields, constructor and getters of one class.
    fn render_body(&self, index: usize, indent: &str, out: &mut String) {
        let node = &self.nodes[index];
        let children: Vec<&Node> = node
            .members
            .values()
            .filter_map(|m| match m {
                Member::Child(child) => Some(&self.nodes[*child]),
                Member::Value { .. } => None,
            })
            .collect();

        for child in &children {
            push_doc(out, indent, &format!("Create the \"{}\" accessors", child.accessors_name));
            out.push_str(&format!(
                "{indent}private final {} {};\n\n",
                child.class_name,
                child.field_name()
            ));
        }

        out.push_str(&format!("{indent}public {}() {{\n", node.class_name));
        for child in &children {
            out.push_str(&format!(
                "{indent}{INDENT}{} = new {}();\n",
                child.field_name(),
                child.class_name
            ));
        }
        out.push_str(&format!("{indent}}}\n"));

        for (method, member) in &node.members {
            out.push('\n');
            match member {
                Member::Child(child) => {
                    let child = &self.nodes[*child];
                    push_doc(out, indent, &format!("Resolve the \"{}\" accessors", child.accessors_name));
                    push_getter(out, indent, &child.class_name, method, &child.field_name());
                }
                Member::Value { key, value } => {
                    let literal = value.literal(Dialect::Java);
                    push_doc(out, indent, &format!("Resolve the \"{key}\" value {literal}"));
                    push_getter(out, indent, value.kind.java_type(), method, &literal);
                }
            }
        }
    }
}

fn push_doc(out: &mut String, indent: &str, text: &str) {
    out.push_str(&format!(
        "{indent}/**\n{indent} * {}\n{indent} */\n",
        text.replace("*/", "*&#47;")
    ));
}

fn push_getter(out: &mut String, indent: &str, returns: &str, method: &str, expr: &str) {
    out.push_str(&format!("{indent}@Nonnull\n"));
    out.push_str(&format!("{indent}public final {returns} get{method}() {{\n"));
    out.push_str(&format!("{indent}{INDENT}return {expr};\n"));
    out.push_str(&format!("{indent}}}\n"));
}

/// Generate one accessor class per (config, map) pair.
///
/// `configs` and `maps` are matched by position and must have the same
/// length. Each unit gets its own naming history.
pub fn generate(
    configs: &[&BuildScriptConfig],
    maps: &[PropertyMap],
    timestamp: &str,
) -> Result<AccessorsOutput, ProptreeError> {
    if configs.len() != maps.len() {
        return Err(ProptreeError::ArgumentMismatch {
            configs: configs.len(),
            maps: maps.len(),
        });
    }

    let mut files = Vec::with_capacity(configs.len());
    let mut seen_classes = HashSet::new();
    for (config, map) in configs.iter().zip(maps) {
        let mut tree = AccessorTree::new(&config.base.name, config.base.type_auto_conversion)?;
        if !seen_classes.insert(tree.top_class_name().to_lowercase()) {
            return Err(ProptreeError::Generation(format!(
                "class \"{}\" for \"{}\" is generated twice",
                tree.top_class_name(),
                config.base.name
            )));
        }
        let dropped = map
            .iter()
            .filter(|(key, value)| !tree.insert(key, value))
            .count();
        debug!(
            owner = %config.base.name,
            keys = map.len(),
            dropped,
            "built accessor tree"
        );
        let file_name = format!("{}.java", tree.top_class_name());
        files.push(GeneratedFile::new(
            ACCESSORS_PACKAGE_NAME,
            &file_name,
            tree.render(timestamp)?,
        ));
    }

    Ok(AccessorsOutput {
        files,
        registry: AccessorsRegistry::for_configs(configs.iter().copied())?,
    })
}

/// Stubs the accessor classes compile against.
pub fn compile_stub_files() -> Vec<GeneratedFile> {
    vec![
        GeneratedFile::new(
            "javax.annotation",
            "Nonnull.java",
            "package javax.annotation;\n\npublic @interface Nonnull {\n}\n".to_string(),
        ),
        GeneratedFile::new(
            PROXY_PACKAGE_NAME,
            &format!("{MARKER_INTERFACE}.java"),
            format!("package {PROXY_PACKAGE_NAME};\n\npublic interface {MARKER_INTERFACE} {{\n}}\n"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::Declaration;
    use crate::fixtures::test::{FIXED_TIMESTAMP, map};
    use crate::merge::resolve_declaration;

    fn config(owner: &str) -> BuildScriptConfig {
        let mut decl = Declaration::new();
        decl.project(":app");
        let configs = resolve_declaration(&decl, "demo").unwrap();
        let mut config = configs.global.build_script.clone();
        config.base.name = owner.to_string();
        config
    }

    fn render(owner: &str, pairs: &[(&str, &str)]) -> String {
        let config = config(owner);
        let output = generate(&[&config], &[map(pairs)], FIXED_TIMESTAMP).unwrap();
        output.files[0].contents.clone()
    }

    #[test]
    fn nested_getters_with_types() {
        let source = render("demo", &[("app.name", "Demo"), ("app.version", "1")]);
        assert!(source.starts_with("package proptree.plugin.extension.accessors.generated;\n"));
        assert!(source.contains("public class DemoPropertiesAccessors {"));
        assert!(source.contains("private final AppAccessors appAccessors;"));
        assert!(source.contains("appAccessors = new AppAccessors();"));
        assert!(source.contains("public final AppAccessors getApp() {"));
        assert!(source.contains(
            "public static class AppAccessors implements proptree.plugin.extension.accessors.proxy.IExtensionAccessors {"
        ));
        assert!(source.contains("public final String getName() {\n      return \"Demo\";"));
        assert!(source.contains("public final int getVersion() {\n      return 1;"));
        assert!(source.contains("Resolve the \"app.name\" value \"Demo\""));
        assert!(source.contains(FIXED_TIMESTAMP));
    }

    #[test]
    fn single_segment_key_sits_on_top_class() {
        let source = render("demo", &[("debug", "true")]);
        assert!(source.contains("  public final boolean getDebug() {\n    return true;"));
        assert!(!source.contains("static class"));
    }

    #[test]
    fn deep_keys_share_prefix_classes() {
        let source = render(
            "demo",
            &[("a.b.c", "1"), ("a.b.d", "2"), ("a.e", "x")],
        );
        assert_eq!(source.matches("public static class AAccessors").count(), 1);
        assert_eq!(source.matches("public static class ABAccessors").count(), 1);
        assert!(source.contains("private final ABAccessors aBAccessors;"));
        assert!(source.contains("public final int getC()"));
        assert!(source.contains("public final int getD()"));
        assert!(source.contains("public final String getE()"));
    }

    #[test]
    fn first_writer_wins_on_normalization_collision() {
        let mut tree = AccessorTree::new("demo", true).unwrap();
        assert!(tree.insert("app.name", "first"));
        assert!(!tree.insert("app-name", "second"));
        assert!(!tree.insert("app.Name", "third"));
        let source = tree.render(FIXED_TIMESTAMP).unwrap();
        assert!(source.contains("return \"first\";"));
        assert!(!source.contains("second"));
        assert!(!source.contains("third"));
    }

    #[test]
    fn value_blocks_deeper_keys_with_same_prefix() {
        let mut tree = AccessorTree::new("demo", true).unwrap();
        assert!(tree.insert("app", "x"));
        assert!(!tree.insert("app.name", "y"));
        assert!(tree.insert("other.name", "z"));
    }

    #[test]
    fn quoted_value_stays_string() {
        let source = render("demo", &[("agent.code", "\"007\"")]);
        assert!(source.contains("public final String getCode() {\n      return \"007\";"));
    }

    #[test]
    fn auto_conversion_off_keeps_strings() {
        let mut config = config("demo");
        config.base.type_auto_conversion = false;
        let output = generate(&[&config], &[map(&[("build.ci", "false")])], FIXED_TIMESTAMP).unwrap();
        assert!(output.files[0].contents.contains("public final String getCi()"));
    }

    #[test]
    fn long_values_get_suffix() {
        let source = render("demo", &[("size", "3000000000")]);
        assert!(source.contains("public final long getSize() {\n    return 3000000000L;"));
    }

    #[test]
    fn reserved_and_numeric_segments_are_renamed() {
        let source = render("demo", &[("java.class", "x"), ("1st.run", "y")]);
        assert!(source.contains("getClazz()"));
        assert!(source.contains("public final IstAccessors getIst()"));
    }

    #[test]
    fn doc_comments_cannot_be_closed_by_values() {
        let source = render("demo", &[("evil", "*/ oops")]);
        assert!(source.contains("*&#47; oops"));
    }

    #[test]
    fn one_file_per_owner_with_registry() {
        let global = config("Global");
        let app = config(":app");
        let output = generate(
            &[&global, &app],
            &[map(&[("a", "1")]), map(&[("b", "2")])],
            FIXED_TIMESTAMP,
        )
        .unwrap();
        let paths: Vec<String> = output
            .files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec![
                "proptree/plugin/extension/accessors/generated/GlobalPropertiesAccessors.java",
                "proptree/plugin/extension/accessors/generated/AppPropertiesAccessors.java",
            ]
        );
        assert_eq!(
            output.registry.class_for(":app").unwrap(),
            "proptree.plugin.extension.accessors.generated.AppPropertiesAccessors"
        );
        assert!(matches!(
            output.registry.class_for(":lib"),
            Err(ProptreeError::AccessorsNotRegistered(_))
        ));
    }

    #[test]
    fn mismatched_arguments_fail() {
        let config = config("demo");
        let err = generate(&[&config], &[], FIXED_TIMESTAMP).unwrap_err();
        assert!(matches!(err, ProptreeError::ArgumentMismatch { configs: 1, maps: 0 }));
    }

    #[test]
    fn empty_input_generates_nothing() {
        let output = generate(&[], &[], FIXED_TIMESTAMP).unwrap();
        assert!(output.files.is_empty());
        assert!(output.registry.is_empty());
    }

    #[test]
    fn blank_owner_fails() {
        assert!(matches!(
            AccessorTree::new("  ", true),
            Err(ProptreeError::BlankClassName)
        ));
    }

    #[test]
    fn clashing_top_classes_fail() {
        let a = config(":a_b");
        let b = config(":a:b");
        let err = generate(&[&a, &b], &[PropertyMap::new(), PropertyMap::new()], FIXED_TIMESTAMP)
            .unwrap_err();
        assert!(matches!(err, ProptreeError::Generation(_)));
    }

    #[test]
    fn nested_class_clashing_with_top_class_fails() {
        let mut tree = AccessorTree::new("app", true).unwrap();
        tree.insert("app.properties.x", "1");
        assert!(matches!(
            tree.render(FIXED_TIMESTAMP),
            Err(ProptreeError::Generation(_))
        ));
    }

    #[test]
    fn stubs() {
        let stubs = compile_stub_files();
        assert_eq!(stubs.len(), 2);
        assert_eq!(
            stubs[0].relative_path,
            std::path::PathBuf::from("javax/annotation/Nonnull.java")
        );
        assert!(stubs[1].contents.contains("public interface IExtensionAccessors"));
    }
}
