//! Project sources: one Kotlin `object` per project with a `const val` per
//! property.
//!
//! Names are derived when not declared:
//!
//! - package: declared ?? project group ?? `proptree.defaultproperties.<project>`,
//!   always suffixed with `.generated`
//! - class: declared ?? upper-camel project name ?? `Undefined`, suffixed
//!   with `Properties`

use super::{GeneratedFile, banner};
use crate::merge::SourcesCodeConfig;
use crate::naming::{UpperSnakeNamer, flatted, upper_camelcase};
use crate::project::ProjectDescriptor;
use crate::types::PropertyMap;
use crate::typing::{Dialect, TypedValue};

pub const DEFAULT_PACKAGE_NAME: &str = "proptree.defaultproperties";

pub fn package_name(config: &SourcesCodeConfig, project: &ProjectDescriptor) -> String {
    let base = config
        .package_name
        .clone()
        .or_else(|| project.group.clone().filter(|g| !g.trim().is_empty()))
        .unwrap_or_else(|| {
            format!(
                "{DEFAULT_PACKAGE_NAME}.{}",
                flatted(&project.plain_name().replace(':', ""))
            )
        });
    format!("{base}.generated")
}

pub fn class_name(config: &SourcesCodeConfig, project: &ProjectDescriptor) -> String {
    let base = config
        .class_name
        .clone()
        .or_else(|| {
            Some(upper_camelcase(&project.plain_name().replace(':', "_")))
                .filter(|n| !n.trim().is_empty())
        })
        .unwrap_or_else(|| "Undefined".to_string());
    format!("{}Properties", upper_camelcase(&base))
}

/// Render the Kotlin object for one project.
pub fn generate(
    config: &SourcesCodeConfig,
    map: &PropertyMap,
    package: &str,
    class: &str,
    timestamp: &str,
) -> GeneratedFile {
    let visibility = if config.restricted_access {
        "internal"
    } else {
        "public"
    };
    let mut namer = UpperSnakeNamer::new();

    let mut out = String::new();
    out.push_str(&banner(timestamp, "file"));
    out.push_str("@file:Suppress(\"unused\", \"RedundantVisibilityModifier\")\n\n");
    out.push_str(&format!("package {package}\n\n"));
    out.push_str(&format!(
        "/**\n * The properties of \"{}\"\n */\n",
        config.base.name.replace("*/", "*&#47;")
    ));
    out.push_str(&format!("{visibility} object {class} {{\n"));
    for (index, (key, value)) in map.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let typed = TypedValue::parse(value, config.base.type_auto_conversion);
        let literal = typed.literal(Dialect::Kotlin);
        out.push_str(&format!(
            "    /** The \"{}\" value {} */\n",
            key.replace("*/", "*&#47;"),
            literal.replace("*/", "*&#47;")
        ));
        out.push_str(&format!(
            "    {visibility} const val {}: {} = {literal}\n",
            namer.name(key),
            typed.kind.kotlin_type()
        ));
    }
    out.push_str("}\n");

    GeneratedFile::new(package, &format!("{class}.kt"), out)
}
