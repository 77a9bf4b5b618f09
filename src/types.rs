//! Shared vocabulary: location tags, key matchers, value rules, and the
//! property map types that flow between the loader, the resolver, and the
//! generators.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProptreeError;

/// Resolved key/value pairs for one (project, feature) pair, in insertion order.
pub type PropertyMap = IndexMap<String, String>;

/// Raw key/value pairs contributed by a single source, before filtering.
pub type SourceTable = IndexMap<String, PropertyValue>;

/// Which physical or virtual source contributes key/values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    /// Properties files in the current project's directory.
    CurrentProject,
    /// Properties files in the root project's directory.
    RootProject,
    /// Properties files in the build tool's user home.
    Global,
    /// Process-wide system properties.
    System,
    /// Process environment variables.
    SystemEnv,
}

/// Default generation locations: current project, then root project.
pub const DEFAULT_LOCATION_TYPES: [LocationType; 2] =
    [LocationType::CurrentProject, LocationType::RootProject];

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::CurrentProject => "CURRENT_PROJECT",
            LocationType::RootProject => "ROOT_PROJECT",
            LocationType::Global => "GLOBAL",
            LocationType::System => "SYSTEM",
            LocationType::SystemEnv => "SYSTEM_ENV",
        }
    }
}

impl FromStr for LocationType {
    type Err = ProptreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRENT_PROJECT" => Ok(LocationType::CurrentProject),
            "ROOT_PROJECT" => Ok(LocationType::RootProject),
            "GLOBAL" => Ok(LocationType::Global),
            "SYSTEM" => Ok(LocationType::System),
            "SYSTEM_ENV" => Ok(LocationType::SystemEnv),
            other => Err(ProptreeError::InvalidLocationType(other.to_string())),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two generation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Accessors compiled into project sources.
    SourcesCode,
    /// Accessors exposed to build scripts.
    BuildScript,
}

/// A scalar value as it appears in a source before stringification.
///
/// Files and environment variables only ever produce `Text`; system
/// properties and permanent key/values may carry other scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" that a JVM would print.
            PropertyValue::Float(v) => write!(f, "{v:?}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

/// Selects property keys, either by exact text or by a whole-key regex.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawMatcher")]
pub enum KeyMatcher {
    Literal(String),
    Pattern { source: String, regex: Regex },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatcher {
    Literal(String),
    Pattern { regex: String },
}

impl TryFrom<RawMatcher> for KeyMatcher {
    type Error = ProptreeError;

    fn try_from(raw: RawMatcher) -> Result<Self, Self::Error> {
        match raw {
            RawMatcher::Literal(s) => Ok(KeyMatcher::Literal(s)),
            RawMatcher::Pattern { regex } => KeyMatcher::pattern(&regex),
        }
    }
}

impl KeyMatcher {
    pub fn literal(key: &str) -> Self {
        KeyMatcher::Literal(key.to_string())
    }

    /// Compile a pattern that must match the entire key.
    pub fn pattern(pattern: &str) -> Result<Self, ProptreeError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ProptreeError::InvalidPattern {
                pattern: pattern.to_string(),
                source: e,
            }
        })?;
        Ok(KeyMatcher::Pattern {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Literal(s) => s == key,
            KeyMatcher::Pattern { regex, .. } => regex.is_match(key),
        }
    }

    /// The declared text, used for blank checks and de-duplication.
    pub fn as_str(&self) -> &str {
        match self {
            KeyMatcher::Literal(s) => s,
            KeyMatcher::Pattern { source, .. } => source,
        }
    }

    fn is_pattern(&self) -> bool {
        matches!(self, KeyMatcher::Pattern { .. })
    }
}

impl PartialEq for KeyMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.is_pattern() == other.is_pattern() && self.as_str() == other.as_str()
    }
}

/// A per-key transform applied after interpolation.
#[derive(Clone)]
pub struct ValueRule(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl ValueRule {
    pub fn new(rule: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        ValueRule(Arc::new(rule))
    }

    pub fn apply(&self, value: &str) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for ValueRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueRule(..)")
    }
}
