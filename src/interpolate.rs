//! `${key}` expansion against a flat property map.
//!
//! Substituted values lose one layer of explicit quoting and are expanded
//! again, so `a = ${b}` with `b = "${c}"` ends up with the value of `c`.
//! The length of one chain of references is capped at
//! [`MAX_CHAIN_DEPTH`]; chasing one more key is a
//! [`RecursionLimit`](ProptreeError::RecursionLimit) error, which also stops
//! reference cycles.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ProptreeError;
use crate::types::PropertyMap;
use crate::typing::remove_auto_conversion;

/// Maximum number of keys chased while expanding one value.
pub const MAX_CHAIN_DEPTH: usize = 5;

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.+?)\}").expect("proptree: static regex is valid"));

/// Cheap pre-check: does `value` look like it contains a reference?
pub fn has_interpolation(value: &str) -> bool {
    value.contains("${") && value.contains('}')
}

/// Expands references in one value.
///
/// With `enabled` false, `${name}` becomes the literal text `name` and no
/// lookup happens. Unknown keys expand to the empty string.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'a> {
    lookup: &'a PropertyMap,
    enabled: bool,
}

impl<'a> Interpolator<'a> {
    pub fn new(lookup: &'a PropertyMap, enabled: bool) -> Self {
        Self { lookup, enabled }
    }

    /// Expand `value`, which belongs to `key` (only used in error messages).
    pub fn resolve(&self, key: &str, value: &str) -> Result<String, ProptreeError> {
        let mut chain = Vec::new();
        self.expand(key, value, &mut chain)
    }

    fn expand(
        &self,
        key: &str,
        value: &str,
        chain: &mut Vec<String>,
    ) -> Result<String, ProptreeError> {
        let mut out = String::with_capacity(value.len());
        let mut last = 0;
        for caps in INTERPOLATION.captures_iter(value) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&value[last..whole.start()]);
            last = whole.end();

            if chain.len() >= MAX_CHAIN_DEPTH {
                let mut chased = chain.clone();
                chased.push(name.as_str().to_string());
                return Err(ProptreeError::RecursionLimit {
                    key: key.to_string(),
                    chain: chased,
                });
            }
            chain.push(name.as_str().to_string());

            let looked_up = if self.enabled {
                self.lookup
                    .get(name.as_str())
                    .map(String::as_str)
                    .unwrap_or_default()
            } else {
                name.as_str()
            };
            let substituted = remove_auto_conversion(looked_up);
            if has_interpolation(substituted) {
                out.push_str(&self.expand(key, substituted, chain)?);
            } else {
                out.push_str(substituted);
            }
            chain.pop();
        }
        out.push_str(&value[last..]);
        Ok(out)
    }
}

/// Expand every value of `map` that contains a reference, in map order.
///
/// Later keys see the already expanded values of earlier keys, which is
/// equivalent since expansion is idempotent on values without references.
pub fn resolve_all(map: &mut PropertyMap, enabled: bool) -> Result<(), ProptreeError> {
    let keys: Vec<String> = map
        .iter()
        .filter(|(_, v)| has_interpolation(v))
        .map(|(k, _)| k.clone())
        .collect();
    for key in keys {
        let Some(raw) = map.get(&key).cloned() else {
            continue;
        };
        let resolved = Interpolator::new(map, enabled).resolve(&key, &raw)?;
        debug!(key = %key, from = %raw, to = %resolved, "interpolated property value");
        map.insert(key, resolved);
    }
    Ok(())
}
