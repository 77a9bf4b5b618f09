//! Properties file parsing and loading.
//!
//! Files use the `java.util.Properties` text syntax:
//!
//! - `#` and `!` start comment lines.
//! - A key ends at the first unescaped `=`, `:` or whitespace.
//! - A line ending in an odd number of backslashes continues on the next
//!   line, whose leading whitespace is dropped.
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` escapes are decoded; any other
//!   escaped character stands for itself.
//!
//! # Loading
//!
//! [`load_properties_files`] reads an ordered list of file names from one
//! directory and merges them so later files override earlier keys. Missing
//! files, and a missing directory, are silently skipped. Only actual I/O
//! errors (permissions, etc.) are propagated.

use std::path::Path;

use tracing::debug;

use crate::error::ProptreeError;
use crate::types::PropertyMap;

const BLANKS: [char; 3] = [' ', '\t', '\x0c'];

/// Parse properties text into an ordered map. Later duplicates win.
pub fn parse_properties(text: &str) -> PropertyMap {
    let mut map = PropertyMap::new();
    for line in logical_lines(text) {
        let (key, value) = split_entry(&line);
        map.insert(unescape(key), unescape(value));
    }
    map
}

/// Join continued lines and drop blanks and comments.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;
    for natural in text.lines() {
        let trimmed = natural.trim_start_matches(BLANKS);
        if !continuing && (trimmed.is_empty() || trimmed.starts_with(['#', '!'])) {
            continue;
        }
        let trailing = trimmed.len() - trimmed.trim_end_matches('\\').len();
        if trailing % 2 == 1 {
            current.push_str(&trimmed[..trimmed.len() - 1]);
            continuing = true;
        } else {
            current.push_str(trimmed);
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }
    if continuing {
        lines.push(current);
    }
    lines
}

/// Split one logical line into raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut explicit_separator = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                explicit_separator = true;
                break;
            }
            c if BLANKS.contains(&c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }
    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(BLANKS);
    if explicit_separator {
        rest = rest[1..].trim_start_matches(BLANKS);
    } else if let Some(after) = rest.strip_prefix(['=', ':']) {
        rest = after.trim_start_matches(BLANKS);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            match u16::from_str_radix(&hex, 16) {
                Ok(unit) if hex.len() == 4 => units.push(unit),
                _ => {
                    flush_units(&mut units, &mut out);
                    out.push('u');
                    out.push_str(&hex);
                }
            }
            continue;
        }
        flush_units(&mut units, &mut out);
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    flush_units(&mut units, &mut out);
    out
}

/// `\uXXXX` escapes are UTF-16 code units; surrogate pairs arrive as two.
fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if !units.is_empty() {
        out.push_str(&String::from_utf16_lossy(units));
        units.clear();
    }
}

/// Load `names` from `dir` in order and merge them (later files win).
///
/// A `None` directory, a missing directory, and missing files all yield no
/// properties. Invalid UTF-8 is decoded lossily.
pub fn load_properties_files(
    dir: Option<&Path>,
    names: &[String],
) -> Result<PropertyMap, ProptreeError> {
    let mut merged = PropertyMap::new();
    let Some(dir) = dir else {
        return Ok(merged);
    };
    for name in names {
        let path = dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let parsed = parse_properties(&String::from_utf8_lossy(&bytes));
                debug!(path = %path.display(), keys = parsed.len(), "loaded properties file");
                merged.extend(parsed);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "properties file not found, skipping");
            }
            Err(e) => return Err(ProptreeError::io(path, e)),
        }
    }
    Ok(merged)
}
