use std::path::{Path, PathBuf};

use crate::declare::Declaration;
use crate::deploy::Session;
use crate::env::Environment;
use crate::error::ProptreeError;
use crate::generator;
use crate::merge::resolve_declaration;
use crate::project::ProjectTree;
use crate::settings::ToolSettings;

/// Entry point for starting a proptree run.
pub struct Proptree;

impl Proptree {
    pub fn builder() -> ProptreeBuilder {
        ProptreeBuilder::new()
    }
}

/// Where the declaration comes from. Later setter calls replace earlier ones.
enum DeclarationSource {
    /// `<root>/<settings.declaration_file>`, missing file allowed.
    Default,
    File(PathBuf),
    Text(String),
    Built(Declaration),
}

/// Builder for a [`Session`].
///
/// Only the project tree is required. Everything else has a default:
///
/// - **Settings**: read from `proptree-settings.toml` in the root project
///   plus the environment (see [`settings`](crate::settings)).
/// - **Declaration**: the settings' `declaration_file` in the root project;
///   when absent, an empty declaration (all defaults).
/// - **Environment**: captured from the running process.
pub struct ProptreeBuilder {
    project_tree: Option<ProjectTree>,
    declaration: DeclarationSource,
    settings: Option<ToolSettings>,
    environment: Option<Environment>,
    strict: Option<bool>,
    timestamp: Option<String>,
}

impl ProptreeBuilder {
    fn new() -> Self {
        Self {
            project_tree: None,
            declaration: DeclarationSource::Default,
            settings: None,
            environment: None,
            strict: None,
            timestamp: None,
        }
    }

    /// The host's project graph. Required.
    pub fn project_tree(mut self, tree: ProjectTree) -> Self {
        self.project_tree = Some(tree);
        self
    }

    /// Use a declaration built in code.
    ///
    /// There is no text to fingerprint, so every run counts as modified.
    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = DeclarationSource::Built(declaration);
        self
    }

    /// Parse the declaration from TOML text.
    pub fn declaration_str(mut self, content: &str) -> Self {
        self.declaration = DeclarationSource::Text(content.to_string());
        self
    }

    /// Read the declaration from a file other than the configured one.
    /// A missing file is an empty declaration.
    pub fn declaration_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.declaration = DeclarationSource::File(path.into());
        self
    }

    pub fn settings(mut self, settings: ToolSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replace the process snapshot (system properties and variables).
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Enable or disable strict mode (default: the settings' `strict`).
    /// In strict mode, unknown keys in the declaration produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Fix the timestamp written into generated banners.
    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    /// Load settings and declaration, merge, and open the session.
    pub fn build(self) -> Result<Session, ProptreeError> {
        let tree = self.project_tree.ok_or(ProptreeError::ProjectTreeRequired)?;
        let settings = match self.settings {
            Some(settings) => settings,
            None => ToolSettings::load(tree.root_dir())?,
        };
        let strict = self.strict.unwrap_or(settings.strict);

        let (declaration, text) = match self.declaration {
            DeclarationSource::Built(declaration) => (declaration, None),
            DeclarationSource::Text(text) => (
                Declaration::from_toml_str(&text, Path::new("<inline>"), strict)?,
                Some(text),
            ),
            DeclarationSource::File(path) => read_declaration(&path, strict)?,
            DeclarationSource::Default => {
                read_declaration(&settings.declaration_path(tree.root_dir()), strict)?
            }
        };

        let configs = resolve_declaration(&declaration, tree.root_name())?;
        let env = self.environment.unwrap_or_else(Environment::capture);
        let timestamp = self.timestamp.unwrap_or_else(generator::timestamp_now);
        Ok(Session::new(
            tree,
            configs,
            env,
            settings,
            text.as_deref(),
            timestamp,
        ))
    }
}

fn read_declaration(
    path: &Path,
    strict: bool,
) -> Result<(Declaration, Option<String>), ProptreeError> {
    Ok(match Declaration::load(path, strict)? {
        Some((declaration, text)) => (declaration, Some(text)),
        None => (Declaration::new(), None),
    })
}
