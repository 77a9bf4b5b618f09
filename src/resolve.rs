//! Property resolution pipeline: from an effective config to one ordered
//! key/value map.
//!
//! Source gathering ([`collect_sources`]) is the only step that touches the
//! filesystem. [`resolve`] operates on pre-loaded tables (`ResolveInput`)
//! with no I/O, making the full pipeline testable with synthetic inputs.
//! Steps:
//!
//! 1. Seed the map with the permanent key/values (never filtered)
//! 2. For each location tag in order: filter the tag's table (blank keys,
//!    non-string values, include list, exclude list) and merge it on top,
//!    later tags overriding earlier ones
//! 3. Expand `${key}` references against the complete map
//! 4. Apply per-key rules

use tracing::debug;

use crate::env::Environment;
use crate::error::ProptreeError;
use crate::interpolate;
use crate::merge::BaseConfig;
use crate::project::ProjectDescriptor;
use crate::properties::load_properties_files;
use crate::types::{KeyMatcher, LocationType, PropertyMap, PropertyValue, SourceTable};

/// All pre-loaded data needed to resolve one map. No I/O happens here.
pub struct ResolveInput<'a> {
    pub config: &'a BaseConfig,
    /// One raw table per location tag, in the config's tag order.
    pub sources: Vec<(LocationType, SourceTable)>,
}

/// Read the raw table of every configured location tag.
///
/// File-based tags read the config's properties files from the tag's
/// directory; `SYSTEM` and `SYSTEM_ENV` copy the environment snapshot whole.
pub fn collect_sources(
    config: &BaseConfig,
    project: &ProjectDescriptor,
    env: &Environment,
) -> Result<Vec<(LocationType, SourceTable)>, ProptreeError> {
    let mut sources = Vec::with_capacity(config.generate_location_types.len());
    for &location in &config.generate_location_types {
        let table = match location {
            LocationType::CurrentProject => {
                load_text_table(&project.current_dir, &config.properties_file_names)?
            }
            LocationType::RootProject => {
                load_text_table(&project.root_dir, &config.properties_file_names)?
            }
            LocationType::Global => {
                load_text_table(&project.home_dir, &config.properties_file_names)?
            }
            LocationType::System => env.system_properties.clone(),
            LocationType::SystemEnv => env.variables_table(),
        };
        debug!(
            project = %project.name,
            location = %location,
            keys = table.len(),
            "collected property source"
        );
        sources.push((location, table));
    }
    Ok(sources)
}

fn load_text_table(
    dir: &std::path::Path,
    names: &[String],
) -> Result<SourceTable, ProptreeError> {
    Ok(load_properties_files(Some(dir), names)?
        .into_iter()
        .map(|(k, v)| (k, PropertyValue::Text(v)))
        .collect())
}

/// Resolve one property map from pre-loaded source tables.
pub fn resolve(input: ResolveInput<'_>) -> Result<PropertyMap, ProptreeError> {
    let config = input.config;

    // 1: Permanent key/values first
    let mut result: PropertyMap = config
        .permanent_key_values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();

    // 2: Filtered sources on top, later tags winning
    for (location, table) in input.sources {
        let before = result.len();
        for (key, value) in table {
            if key.trim().is_empty() {
                continue;
            }
            let text = match value {
                PropertyValue::Text(s) => s,
                _ if config.exclude_non_string_value => continue,
                other => other.to_string(),
            };
            if !config.include_keys.is_empty() && !matches_any(&config.include_keys, &key) {
                continue;
            }
            if matches_any(&config.exclude_keys, &key) {
                continue;
            }
            result.insert(key, text);
        }
        debug!(
            owner = %config.name,
            location = %location,
            added = result.len() - before,
            "merged property source"
        );
    }

    // 3: Interpolation against the complete map
    interpolate::resolve_all(&mut result, config.value_interpolation)?;

    // 4: Rules
    for (key, rule) in &config.key_value_rules {
        if let Some(value) = result.get_mut(key) {
            *value = rule.apply(value);
        }
    }

    Ok(result)
}

/// Collect and resolve in one step.
pub fn resolve_properties(
    config: &BaseConfig,
    project: &ProjectDescriptor,
    env: &Environment,
) -> Result<PropertyMap, ProptreeError> {
    let sources = collect_sources(config, project, env)?;
    resolve(ResolveInput { config, sources })
}

fn matches_any(matchers: &[KeyMatcher], key: &str) -> bool {
    matchers.iter().any(|m| m.matches(key))
}
