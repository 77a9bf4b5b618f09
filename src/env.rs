//! The `SYSTEM` and `SYSTEM_ENV` property sources.
//!
//! Neither is read from a file: system properties are the host's JVM-style
//! key/values and environment variables come from the running process.

use std::path::MAIN_SEPARATOR_STR;

use indexmap::IndexMap;

use crate::types::{PropertyValue, SourceTable};

/// Snapshot of the two virtual property sources: process-wide system
/// properties and environment variables.
///
/// Captured once per run so every project sees the same tables, and so
/// tests can pass synthetic data instead of touching the real process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    /// `SYSTEM` source. May carry non-text values.
    pub system_properties: SourceTable,
    /// `SYSTEM_ENV` source, sorted by name.
    pub variables: IndexMap<String, String>,
}

impl Environment {
    /// Read the live process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn capture() -> Self {
        let mut variables: IndexMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        variables.sort_keys();
        Self {
            system_properties: default_system_properties(),
            variables,
        }
    }

    /// Build a snapshot from synthetic pairs.
    pub fn from_pairs(
        system_properties: impl IntoIterator<Item = (String, PropertyValue)>,
        variables: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            system_properties: system_properties.into_iter().collect(),
            variables: variables.into_iter().collect(),
        }
    }

    /// Add or replace one system property.
    pub fn with_system_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.system_properties.insert(key.to_string(), value.into());
        self
    }

    /// Environment variables as a source table (all `Text`).
    pub fn variables_table(&self) -> SourceTable {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), PropertyValue::Text(v.clone())))
            .collect()
    }
}

/// The process properties a JVM-hosted build would always expose.
fn default_system_properties() -> SourceTable {
    let mut props = SourceTable::new();
    let mut put = |key: &str, value: String| {
        props.insert(key.to_string(), PropertyValue::Text(value));
    };
    put("os.name", std::env::consts::OS.to_string());
    put("os.arch", std::env::consts::ARCH.to_string());
    put("file.separator", MAIN_SEPARATOR_STR.to_string());
    put(
        "path.separator",
        if cfg!(windows) { ";" } else { ":" }.to_string(),
    );
    put(
        "line.separator",
        if cfg!(windows) { "\r\n" } else { "\n" }.to_string(),
    );
    if let Ok(dir) = std::env::current_dir() {
        put("user.dir", dir.display().to_string());
    }
    if let Some(user) = directories::UserDirs::new() {
        put("user.home", user.home_dir().display().to_string());
    }
    if let Ok(name) = std::env::var("USER").or_else(|_| std::env::var("USERNAME")) {
        put("user.name", name);
    }
    put("proptree.version", env!("CARGO_PKG_VERSION").to_string());
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn synthetic_snapshot() {
        let env = Environment::from_pairs(
            vec![("java.version".to_string(), PropertyValue::from("17"))],
            vars(&[("CI", "true"), ("HOME", "/home/me")]),
        );
        assert_eq!(env.system_properties["java.version"], PropertyValue::from("17"));
        let table = env.variables_table();
        assert_eq!(table["CI"], PropertyValue::from("true"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn with_system_property_overrides() {
        let env = Environment::default()
            .with_system_property("a", "1")
            .with_system_property("b", 2)
            .with_system_property("a", "3");
        assert_eq!(env.system_properties.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(env.system_properties["a"], PropertyValue::from("3"));
        assert_eq!(env.system_properties["b"], PropertyValue::Integer(2));
    }

    #[test]
    fn capture_is_sorted_and_has_defaults() {
        let env = Environment::capture();
        let keys: Vec<_> = env.variables.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(env.system_properties.contains_key("os.name"));
        assert!(env.system_properties.contains_key("file.separator"));
    }

    #[test]
    fn capture_is_deterministic() {
        assert_eq!(Environment::capture(), Environment::capture());
    }
}
