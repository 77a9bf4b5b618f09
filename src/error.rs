use std::path::PathBuf;
use thiserror::Error;

/// Broad failure category, used by hosts to decide how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The declarative configuration is malformed.
    Validation,
    /// A property value could not be resolved.
    Resolution,
    /// Code generation hit an internal inconsistency.
    Generation,
    /// A project or generated class does not exist.
    NotFound,
    /// Reading or writing the filesystem failed.
    Io,
}

#[derive(Debug, Error)]
pub enum ProptreeError {
    #[error("Invalid package name \"{0}\"")]
    InvalidPackageName(String),

    #[error("Invalid class name \"{0}\"")]
    InvalidClassName(String),

    #[error("{kind} name \"{name}\" must start with a letter")]
    NotStartingWithLetter { kind: &'static str, name: String },

    #[error("This name \"{0}\" is a Gradle built-in extension")]
    ReservedExtensionName(String),

    #[error(
        "This name \"{0}\" is a root project, please use the root_project block to configure it, not projects.\"{0}\""
    )]
    RootProjectMisconfigured(String),

    #[error("{0} must not be empty")]
    EmptyDeclaration(&'static str),

    #[error("{0} must not have blank contents")]
    BlankDeclaration(&'static str),

    #[error("Invalid generate location type \"{0}\"")]
    InvalidLocationType(String),

    #[error("Invalid key pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in declaration file")]
    UnknownKeys(Vec<ProptreeError>),

    #[error("Key \"{key}\" has been called recursively multiple times of those {chain:?}")]
    RecursionLimit { key: String, chain: Vec<String> },

    #[error("Invalid build arguments: {configs} configs but {maps} property maps")]
    ArgumentMismatch { configs: usize, maps: usize },

    #[error("Class name cannot be empty or blank")]
    BlankClassName,

    #[error("Failed to generate accessors classes: {0}")]
    Generation(String),

    #[error("Project \"{0}\" not found")]
    ProjectNotFound(String),

    #[error("Could not found class for \"{0}\"")]
    AccessorsNotRegistered(String),

    #[error(
        "Generated class \"{class}\" not found, stop loading {project}\n\
         Please check whether the initialization process is interrupted and re-run the build\n\
         If this doesn't work, please manually delete the entire \"{cache_dir}\" directory"
    )]
    GeneratedClassMissing {
        class: String,
        project: String,
        cache_dir: PathBuf,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode build state: {0}")]
    StateError(#[from] serde_json::Error),

    #[error("Tool settings error: {0}")]
    SettingsError(#[from] confique::Error),

    #[error("Project tree is required, call .project_tree() on the builder")]
    ProjectTreeRequired,
}

impl ProptreeError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProptreeError::InvalidPackageName(_)
            | ProptreeError::InvalidClassName(_)
            | ProptreeError::NotStartingWithLetter { .. }
            | ProptreeError::ReservedExtensionName(_)
            | ProptreeError::RootProjectMisconfigured(_)
            | ProptreeError::EmptyDeclaration(_)
            | ProptreeError::BlankDeclaration(_)
            | ProptreeError::InvalidLocationType(_)
            | ProptreeError::InvalidPattern { .. }
            | ProptreeError::UnknownKey { .. }
            | ProptreeError::UnknownKeys(_)
            | ProptreeError::ParseError { .. }
            | ProptreeError::SettingsError(_)
            | ProptreeError::ProjectTreeRequired => ErrorKind::Validation,
            ProptreeError::RecursionLimit { .. } => ErrorKind::Resolution,
            ProptreeError::ArgumentMismatch { .. }
            | ProptreeError::BlankClassName
            | ProptreeError::Generation(_) => ErrorKind::Generation,
            ProptreeError::ProjectNotFound(_)
            | ProptreeError::AccessorsNotRegistered(_)
            | ProptreeError::GeneratedClassMissing { .. } => ErrorKind::NotFound,
            ProptreeError::IoError { .. } | ProptreeError::StateError(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProptreeError::IoError {
            path: path.into(),
            source,
        }
    }
}
