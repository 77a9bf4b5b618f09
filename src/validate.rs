//! Declaration checks: identifier grammar for generated names, and
//! strict-mode detection of unknown keys in declaration files.
//!
//! Unknown keys are found with `serde_ignored`: the file is deserialized into
//! the declaration type and every key it doesn't consume is reported with its
//! file path and best-effort line number.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ProptreeError;
use crate::naming::camelcase;

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("proptree: static regex is valid")
});

static CLASS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("proptree: static regex is valid")
});

/// Extension symbols a Gradle build script already owns.
pub const RESERVED_EXTENSION_NAMES: &[&str] = &[
    "allprojects",
    "android",
    "ant",
    "apply",
    "artifacts",
    "base",
    "buildDir",
    "buildscript",
    "components",
    "configurations",
    "defaultTasks",
    "dependencies",
    "description",
    "ext",
    "extensions",
    "extra",
    "gradle",
    "group",
    "java",
    "kotlin",
    "layout",
    "libs",
    "logger",
    "logging",
    "objects",
    "plugins",
    "project",
    "properties",
    "providers",
    "publishing",
    "repositories",
    "rootProject",
    "settings",
    "sourceSets",
    "subprojects",
    "tasks",
    "version",
];

/// Blank means "not declared" and always passes.
pub fn check_package_name(name: &str) -> Result<(), ProptreeError> {
    if name.trim().is_empty() || PACKAGE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ProptreeError::InvalidPackageName(name.to_string()))
    }
}

pub fn check_class_name(name: &str) -> Result<(), ProptreeError> {
    if name.trim().is_empty() || CLASS_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ProptreeError::InvalidClassName(name.to_string()))
    }
}

pub fn check_starts_with_letter(kind: &'static str, name: &str) -> Result<(), ProptreeError> {
    match name.chars().next() {
        None => Ok(()),
        Some(c) if c.is_alphabetic() => Ok(()),
        Some(_) => Err(ProptreeError::NotStartingWithLetter {
            kind,
            name: name.to_string(),
        }),
    }
}

/// Must start with a letter and must not shadow a built-in extension.
pub fn check_extension_name(name: &str) -> Result<(), ProptreeError> {
    check_starts_with_letter("Extension", name)?;
    let symbol = camelcase(name);
    if !name.trim().is_empty() && RESERVED_EXTENSION_NAMES.contains(&symbol.as_str()) {
        return Err(ProptreeError::ReservedExtensionName(name.to_string()));
    }
    Ok(())
}

/// Project names may carry one leading `:`; the rest must start with a letter.
pub fn check_project_name(name: &str) -> Result<(), ProptreeError> {
    let bare = name.strip_prefix(':').unwrap_or(name);
    if bare.is_empty() {
        return Err(ProptreeError::NotStartingWithLetter {
            kind: "Project",
            name: name.to_string(),
        });
    }
    check_starts_with_letter("Project", bare)
}

/// Types that capture unrecognized keys in a catch-all instead of ignoring
/// them. `serde_ignored` cannot see through `#[serde(flatten)]`, so such
/// types report those keys themselves, as dotted paths.
pub trait RetainsUnknownKeys {
    fn retained_unknown_keys(&self) -> Vec<String>;
}

/// Validate that a TOML document contains no keys unknown to `T`.
///
/// Line numbers are found by searching the source text for the key name.
pub fn validate_unknown_keys<T>(content: &str, path: &Path) -> Result<(), ProptreeError>
where
    T: DeserializeOwned + RetainsUnknownKeys,
{
    check_unknown_keys::<T>(content, path, T::retained_unknown_keys)
}

/// Like [`validate_unknown_keys`], for types without a catch-all.
pub fn validate_plain_keys<T: DeserializeOwned>(
    content: &str,
    path: &Path,
) -> Result<(), ProptreeError> {
    check_unknown_keys::<T>(content, path, |_| Vec::new())
}

fn check_unknown_keys<T: DeserializeOwned>(
    content: &str,
    path: &Path,
    retained: impl FnOnce(&T) -> Vec<String>,
) -> Result<(), ProptreeError> {
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let parsed: T = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| ProptreeError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    unknown_keys.extend(retained(&parsed));

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let errors: Vec<ProptreeError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            ProptreeError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(ProptreeError::UnknownKeys(errors))
}

/// Find the 1-indexed line number for a dotted key in TOML content.
///
/// Tracks the current `[section]` header (quoted segments like
/// `[projects.":app".all]` are unquoted) and only matches the leaf key inside
/// the right section. Returns 0 if the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let leaf = segments.last().copied().unwrap_or(dotted_key);
    let expected_section = &segments[..segments.len().saturating_sub(1)];

    let mut current_section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header
                .split('.')
                .map(|s| s.trim().trim_matches('"').to_string())
                .collect();
            continue;
        }

        let in_right_section = expected_section.len() == current_section.len()
            && expected_section
                .iter()
                .zip(&current_section)
                .all(|(a, b)| *a == b);

        if in_right_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
