//! Key normalization: turning arbitrary property keys into code identifiers.
//!
//! Two flavors are provided:
//!
//! - [`SegmentNamer`] splits a key on `.`, `-` and `_` into a path of
//!   segments. Each segment gets a method name (`App`) and a class name that
//!   concatenates the whole path (`AppName`). Class names that collide
//!   case-insensitively with an earlier, different path get a numeric suffix
//!   starting at 2.
//! - [`UpperSnakeNamer`] produces flat `UPPER_SNAKE` constant names, suffixing
//!   collisions the same way.
//!
//! Both are stateful per generation unit and deterministic for a fixed input
//! order.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static LOWER_THEN_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([a-z])([A-Z]+)").expect("proptree: static regex is valid"));

/// One normalized segment of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName {
    /// Dotted original path up to and including this segment (`app.name`).
    pub accessors_name: String,
    /// Unique class identifier for this path (`AppName`).
    pub class_name: String,
    /// Member identifier for this segment alone (`Name`).
    pub method_name: String,
}

/// Assigns collision-free segment identifiers across all keys of one unit.
#[derive(Debug, Default)]
pub struct SegmentNamer {
    assigned: HashMap<(String, String), String>,
    taken: HashMap<String, String>,
    duplicates: HashMap<String, usize>,
}

impl SegmentNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `key` into named segments, reusing identifiers for paths seen before.
    pub fn resolve(&mut self, key: &str) -> Vec<SegmentName> {
        let mut parent_class = String::new();
        let mut accessors_name = String::new();
        let mut names = Vec::new();
        for raw in split_key(key) {
            let method_name = segment_identifier(&raw);
            if !accessors_name.is_empty() {
                accessors_name.push('.');
            }
            accessors_name.push_str(&raw);
            let class_name = self.class_name_for(&parent_class, &method_name);
            names.push(SegmentName {
                accessors_name: accessors_name.clone(),
                class_name: class_name.clone(),
                method_name,
            });
            parent_class = class_name;
        }
        names
    }

    fn class_name_for(&mut self, parent_class: &str, method_name: &str) -> String {
        let identity = (parent_class.to_string(), method_name.to_string());
        if let Some(existing) = self.assigned.get(&identity) {
            return existing.clone();
        }
        let mut candidate = format!("{parent_class}{method_name}");
        while self.taken.contains_key(&candidate.to_lowercase()) {
            let base = format!("{parent_class}{method_name}");
            let index = self.next_duplicate_index(&base);
            candidate = format!("{base}{index}");
        }
        self.taken.insert(candidate.to_lowercase(), candidate.clone());
        self.assigned.insert(identity, candidate.clone());
        candidate
    }

    fn next_duplicate_index(&mut self, base: &str) -> usize {
        let counter = self.duplicates.entry(base.to_lowercase()).or_insert(1);
        *counter += 1;
        *counter
    }
}

/// Split a key on `.`, `-` and `_`; spaces survive as `_` inside a segment.
///
/// Blank segments are dropped. A key made only of separators is kept whole.
pub fn split_key(key: &str) -> Vec<String> {
    let segments: Vec<String> = key
        .split(['.', '-', '_'])
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.replace(' ', "_"))
        .collect();
    if segments.is_empty() {
        vec![key.replace(' ', "_")]
    } else {
        segments
    }
}

/// Capitalize, avoid the `class` keyword, map a leading digit to a letter,
/// and replace characters that cannot appear in an identifier.
pub fn segment_identifier(segment: &str) -> String {
    let capitalized = capitalize(segment);
    let renamed = if capitalized.to_lowercase() == "class" {
        capitalized.replace("lass", "lazz")
    } else {
        capitalized
    };
    let lettered = first_number_to_letter(&renamed);
    let sanitized: String = lettered
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Replace a leading digit with the visually closest capital letter.
pub fn first_number_to_letter(s: &str) -> String {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let letter = match first {
        '0' => 'O',
        '1' => 'I',
        '2' => 'Z',
        '3' => 'E',
        '4' => 'A',
        '5' => 'S',
        '6' => 'G',
        '7' => 'T',
        '8' => 'B',
        '9' => 'P',
        other => other,
    };
    let mut out = String::with_capacity(s.len());
    out.push(letter);
    out.push_str(chars.as_str());
    out
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `my-app.name` → `myAppName`.
pub fn camelcase(s: &str) -> String {
    let mut words = s.split(['_', '.', '-', ' ']).filter(|w| !w.is_empty());
    let Some(first) = words.next() else {
        return s.to_string();
    };
    let mut out = uncapitalize(first);
    for word in words {
        out.push_str(&capitalize(word));
    }
    out
}

/// `my-app.name` → `MyAppName`.
pub fn upper_camelcase(s: &str) -> String {
    capitalize(&camelcase(s))
}

/// `app.versionName` → `APP_VERSION_NAME`.
pub fn underscore(s: &str) -> String {
    let replaced = s.replace(['.', '-', ' '], "_");
    LOWER_THEN_UPPER
        .replace_all(&replaced, "${1}_${2}")
        .to_uppercase()
}

/// Remove spaces and lowercase, for package segments.
pub fn flatted(s: &str) -> String {
    s.replace(' ', "").to_lowercase()
}

/// Assigns unique `UPPER_SNAKE` names within one generated unit.
#[derive(Debug, Default)]
pub struct UpperSnakeNamer {
    used: HashSet<String>,
    duplicates: HashMap<String, usize>,
}

impl UpperSnakeNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, key: &str) -> String {
        let base = first_number_to_letter(
            &underscore(key)
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
                .collect::<String>(),
        );
        let mut candidate = base.clone();
        while self.used.contains(&candidate) {
            let counter = self.duplicates.entry(base.clone()).or_insert(1);
            *counter += 1;
            candidate = format!("{base}{counter}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
