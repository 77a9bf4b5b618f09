//! One build run: resolve, generate and hand results back to the host.
//!
//! A [`Session`] is the explicit context of a run. It owns the merged
//! configuration, the environment snapshot and the change-detection state,
//! and is driven by the host in lifecycle order:
//!
//! 1. [`Session::generate_accessors`] while settings are evaluated
//! 2. [`Session::deploy_accessors`] once projects are loaded, yielding the
//!    extensions the host should register
//! 3. [`Session::deploy_sources`] (or [`Session::deploy_project_sources`] per
//!    evaluated project)
//! 4. [`Session::finish`] to persist the state for the next run

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cache::{self, ArtifactCoordinates, BuildState};
use crate::env::Environment;
use crate::error::ProptreeError;
use crate::generator::accessors::{self, AccessorsRegistry};
use crate::generator::sources;
use crate::merge::{BuildScriptConfig, ResolvedConfigs};
use crate::project::{ProjectDescriptor, ProjectTree};
use crate::resolve::resolve_properties;
use crate::settings::ToolSettings;
use crate::types::{Feature, PropertyMap};
use crate::update::{self, UpdateNotice};

/// Directory under the accessors repository holding the generated Java files.
pub const ACCESSORS_SOURCES_DIR: &str = "sources";

/// An extension the host should register on a project's build script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionBinding {
    /// Full project name.
    pub project: String,
    /// Camel-case symbol to register under (`property`, `myProps`).
    pub extension: String,
    /// Fully-qualified accessor class.
    pub class: String,
}

/// Result of deploying one project's sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesOutcome {
    pub project: String,
    pub output_dir: PathBuf,
    /// Source set the host should add `output_dir` to.
    pub source_set: String,
    /// Written file, or `None` when the previous output was still current.
    pub written: Option<PathBuf>,
}

pub struct Session {
    tree: ProjectTree,
    configs: ResolvedConfigs,
    env: Environment,
    settings: ToolSettings,
    state: BuildState,
    registry: AccessorsRegistry,
    coordinates: ArtifactCoordinates,
    timestamp: String,
}

impl Session {
    pub(crate) fn new(
        tree: ProjectTree,
        configs: ResolvedConfigs,
        env: Environment,
        settings: ToolSettings,
        declaration_text: Option<&str>,
        timestamp: String,
    ) -> Self {
        let mut state = BuildState::load(&cache::state_path(tree.root_dir(), &settings.cache_dir));
        state.observe_declaration(declaration_text);
        let coordinates = ArtifactCoordinates::accessors(&settings.group_id);
        Self {
            tree,
            configs,
            env,
            settings,
            state,
            registry: AccessorsRegistry::default(),
            coordinates,
            timestamp,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.configs.enabled
    }

    pub fn configs(&self) -> &ResolvedConfigs {
        &self.configs
    }

    pub fn project_tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn config_modified(&self) -> bool {
        self.state.config_modified()
    }

    pub fn coordinates(&self) -> &ArtifactCoordinates {
        &self.coordinates
    }

    /// Repository root of the accessors artifact.
    pub fn accessors_dir(&self) -> PathBuf {
        cache::accessors_dir(self.tree.root_dir(), &self.settings.cache_dir)
    }

    fn accessors_sources_dir(&self) -> PathBuf {
        self.accessors_dir().join(ACCESSORS_SOURCES_DIR)
    }

    /// Resolved properties of one project for one feature.
    pub fn resolve_project(
        &self,
        project: &str,
        feature: Feature,
    ) -> Result<PropertyMap, ProptreeError> {
        let descriptor = self.tree.descriptor(project)?;
        let sub = self.configs.with(&descriptor.name);
        let base = match feature {
            Feature::SourcesCode => &sub.sources_code.base,
            Feature::BuildScript => &sub.build_script.base,
        };
        resolve_properties(base, &descriptor, &self.env)
    }

    /// Build-script configs that get an accessor class, with their projects:
    /// the global one (resolved against the root project) and every declared
    /// project, skipping disabled ones. A declared project missing from the
    /// tree is an error.
    fn accessor_units(
        &self,
    ) -> Result<Vec<(&BuildScriptConfig, ProjectDescriptor)>, ProptreeError> {
        let mut units = Vec::new();
        if self.configs.global.build_script.base.enabled {
            units.push((&self.configs.global.build_script, self.tree.root()));
        }
        for (name, sub) in &self.configs.projects {
            if !sub.build_script.base.enabled {
                continue;
            }
            units.push((&sub.build_script, self.tree.descriptor(name)?));
        }
        Ok(units)
    }

    /// Generate the accessor classes, unless the previous output is current.
    ///
    /// Returns whether files were written.
    pub fn generate_accessors(&mut self) -> Result<bool, ProptreeError> {
        if !self.is_enabled() {
            return Ok(false);
        }
        let units = self.accessor_units()?;
        let mut configs = Vec::with_capacity(units.len());
        let mut maps = Vec::with_capacity(units.len());
        for (config, descriptor) in &units {
            maps.push(resolve_properties(&config.base, descriptor, &self.env)?);
            configs.push(*config);
        }
        let registry = AccessorsRegistry::for_configs(configs.iter().copied())?;

        let repository = self.accessors_dir();
        let artifact_dir = repository.join(self.coordinates.relative_dir());
        let sources_dir = self.accessors_sources_dir();
        let outputs = [sources_dir.as_path(), artifact_dir.as_path()];
        if !self.state.accessors_stale(&maps, &outputs) {
            debug!(units = maps.len(), "accessors are current, generation skipped");
            self.registry = registry;
            return Ok(false);
        }

        let output = accessors::generate(&configs, &maps, &self.timestamp)?;
        remove_dir_if_exists(&sources_dir)?;
        for file in output.files.iter().chain(&accessors::compile_stub_files()) {
            file.write_to(&sources_dir)?;
        }
        self.coordinates.write_pom(&repository)?;
        info!(
            classes = output.files.len(),
            artifact = %self.coordinates.notation(),
            "generated accessors"
        );

        self.state.remember_accessors(maps);
        self.registry = output.registry;
        Ok(true)
    }

    /// Fully-qualified accessor class serving `project`.
    pub fn accessors_class(&self, project: &str) -> Result<&str, ProptreeError> {
        let config = &self.configs.with(project).build_script;
        self.registry.class_for(&config.base.name)
    }

    /// Extensions to register on the root project and every sub-project.
    ///
    /// Fails when a class the registry promises is missing from disk, which
    /// means an earlier run was interrupted.
    pub fn deploy_accessors(&self) -> Result<Vec<ExtensionBinding>, ProptreeError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let sources_dir = self.accessors_sources_dir();
        let mut bindings = Vec::new();
        for project in self.tree.projects() {
            let config = &self.configs.with(&project.name).build_script;
            if !config.base.enabled {
                continue;
            }
            let class = self.registry.class_for(&config.base.name)?;
            let file = sources_dir.join(format!("{}.java", class.replace('.', "/")));
            if !file.is_file() {
                return Err(ProptreeError::GeneratedClassMissing {
                    class: class.to_string(),
                    project: project.name,
                    cache_dir: self.accessors_dir(),
                });
            }
            bindings.push(ExtensionBinding {
                project: project.name,
                extension: config.extension_symbol(),
                class: class.to_string(),
            });
        }
        Ok(bindings)
    }

    /// Generate the sources of every enabled project.
    pub fn deploy_sources(&mut self) -> Result<Vec<SourcesOutcome>, ProptreeError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let mut outcomes = Vec::new();
        for project in self.tree.projects() {
            if let Some(outcome) = self.deploy_sources_for(&project)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    /// Generate the sources of one project. `None` when disabled.
    pub fn deploy_project_sources(
        &mut self,
        project: &str,
    ) -> Result<Option<SourcesOutcome>, ProptreeError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let descriptor = self.tree.descriptor(project)?;
        self.deploy_sources_for(&descriptor)
    }

    fn deploy_sources_for(
        &mut self,
        project: &ProjectDescriptor,
    ) -> Result<Option<SourcesOutcome>, ProptreeError> {
        let config = &self.configs.with(&project.name).sources_code;
        if !config.base.enabled {
            return Ok(None);
        }
        let output_dir = project.current_dir.join(&config.generate_dir_path);
        let map = resolve_properties(&config.base, project, &self.env)?;
        let mut outcome = SourcesOutcome {
            project: project.name.clone(),
            output_dir: output_dir.clone(),
            source_set: config.source_set_name.clone(),
            written: None,
        };
        if !self.state.sources_stale(&project.name, &map, &output_dir) {
            debug!(project = %project.name, "sources are current, generation skipped");
            return Ok(Some(outcome));
        }

        remove_dir_if_exists(&output_dir)?;
        let package = sources::package_name(config, project);
        let class = sources::class_name(config, project);
        let file = sources::generate(config, &map, &package, &class, &self.timestamp);
        let written = file.write_to(&output_dir)?;
        info!(project = %project.name, class = %format!("{package}.{class}"), "generated sources");

        self.state.remember_sources(&project.name, map);
        outcome.written = Some(written);
        Ok(Some(outcome))
    }

    /// Best-effort release check. `fetch` performs the HTTP GET.
    pub fn check_for_update<E, F>(&self, fetch: F) -> Option<UpdateNotice>
    where
        E: std::fmt::Display,
        F: FnOnce(&str) -> Result<String, E>,
    {
        update::check_for_update(
            self.settings.offline,
            env!("CARGO_PKG_VERSION"),
            &update::metadata_url(&self.settings.group_id, env!("CARGO_PKG_NAME")),
            fetch,
        )
    }

    /// Persist the change-detection state for the next run.
    pub fn finish(self) -> Result<(), ProptreeError> {
        self.state
            .save(&cache::state_path(self.tree.root_dir(), &self.settings.cache_dir))
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), ProptreeError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProptreeError::io(dir, e)),
    }
}
