//! Primitive type inference for raw property values.
//!
//! A value is typed once, at generation time, and rendered as a literal in
//! either Java or Kotlin source. Quoting a value (`"007"`, `'1.0'`, or with
//! curly quotes) forces the string type and strips that one layer of quotes.

/// Inferred primitive kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Long,
    Double,
    Float,
    Boolean,
}

impl ValueKind {
    pub fn java_type(&self) -> &'static str {
        match self {
            ValueKind::String => "String",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
        }
    }

    pub fn kotlin_type(&self) -> &'static str {
        match self {
            ValueKind::String => "String",
            ValueKind::Int => "Int",
            ValueKind::Long => "Long",
            ValueKind::Double => "Double",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
        }
    }
}

/// Target language of a rendered literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Java,
    Kotlin,
}

/// A value paired with its inferred kind.
///
/// `value` is the normalized text: quotes stripped for quoted strings,
/// trimmed for non-string kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub kind: ValueKind,
    pub value: String,
}

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('\u{201C}', '\u{201D}'), ('\u{2018}', '\u{2019}')];

/// Return the inner text if `raw` is wrapped in exactly one matching quote pair.
pub fn strip_quotes(raw: &str) -> Option<&str> {
    let mut chars = raw.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    QUOTE_PAIRS
        .iter()
        .any(|&(open, close)| first == open && last == close)
        .then(|| &raw[first.len_utf8()..raw.len() - last.len_utf8()])
}

/// Remove one layer of explicit quoting, if present.
pub fn remove_auto_conversion(raw: &str) -> &str {
    strip_quotes(raw).unwrap_or(raw)
}

impl TypedValue {
    /// Infer the kind of `raw`.
    ///
    /// With `auto_conversion` off everything is a string. With it on, a
    /// quoted value is a string; otherwise int, long, double, float and
    /// boolean are tried in that order.
    pub fn parse(raw: &str, auto_conversion: bool) -> Self {
        if !auto_conversion {
            return TypedValue::string(raw);
        }
        if let Some(inner) = strip_quotes(raw) {
            return TypedValue::string(inner);
        }
        let trimmed = raw.trim();
        let kind = if trimmed.parse::<i32>().is_ok() {
            ValueKind::Int
        } else if trimmed.parse::<i64>().is_ok() {
            ValueKind::Long
        } else if is_finite_number::<f64>(trimmed) {
            ValueKind::Double
        } else if is_finite_number::<f32>(trimmed) {
            ValueKind::Float
        } else if trimmed == "true" || trimmed == "false" {
            ValueKind::Boolean
        } else {
            return TypedValue::string(raw);
        };
        TypedValue {
            kind,
            value: trimmed.to_string(),
        }
    }

    fn string(value: &str) -> Self {
        TypedValue {
            kind: ValueKind::String,
            value: value.to_string(),
        }
    }

    /// Render as a source literal.
    pub fn literal(&self, dialect: Dialect) -> String {
        match self.kind {
            ValueKind::String => format!("\"{}\"", escape_literal(&self.value, dialect)),
            // Leading zeros would read as octal in Java and fail in Kotlin.
            ValueKind::Int => self
                .value
                .parse::<i32>()
                .map_or_else(|_| self.value.clone(), |v| v.to_string()),
            ValueKind::Long => self
                .value
                .parse::<i64>()
                .map_or_else(|_| format!("{}L", self.value), |v| format!("{v}L")),
            ValueKind::Double if self.value.ends_with('.') => format!("{}0", self.value),
            ValueKind::Float if self.value.ends_with('.') => format!("{}0f", self.value),
            ValueKind::Float => format!("{}f", self.value),
            _ => self.value.clone(),
        }
    }
}

/// Only plain decimal notation counts; `NaN`, `inf` and friends stay strings.
/// So do values that overflow or underflow to zero, which javac rejects.
fn is_finite_number<T>(s: &str) -> bool
where
    T: std::str::FromStr + Into<f64>,
{
    s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        && s.parse::<T>().is_ok_and(|v| {
            let v: f64 = v.into();
            v.is_finite() && (v != 0.0 || !has_nonzero_mantissa(s))
        })
}

fn has_nonzero_mantissa(s: &str) -> bool {
    s.split(['e', 'E'])
        .next()
        .is_some_and(|mantissa| mantissa.bytes().any(|b| matches!(b, b'1'..=b'9')))
}

/// Escape text for embedding inside a double-quoted string literal.
pub fn escape_literal(s: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '$' if dialect == Dialect::Kotlin => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_literal`].
pub fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
