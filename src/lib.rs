//! Layered properties files, resolved per project and turned into typed
//! accessor sources.
//!
//! Proptree walks a multi-project build, reads `*.properties` files from
//! several locations, merges them with system properties and environment
//! variables, resolves `${...}` references, and writes code that exposes the
//! result as typed constants and accessor chains.
//!
//! ```ignore
//! let mut session = Proptree::builder()
//!     .project_tree(tree)
//!     .build()?;
//! session.generate_accessors()?;
//! let bindings = session.deploy_accessors()?;
//! session.deploy_sources()?;
//! session.finish()?;
//! ```
//!
//! That run reads `proptree.toml` from the root project, resolves every
//! declared project, writes a Kotlin `object` per project and a Java
//! accessor tree for build scripts, and remembers what it wrote so the next
//! run can skip unchanged output.
//!
//! # The declaration
//!
//! A single TOML file (see [`declare`]) controls everything. It has three
//! levels, each with a shared `all` block and two feature blocks:
//!
//! - **`global`**: defaults for every project.
//! - **`root_project`**: overrides for the root project, whatever its name.
//! - **`projects.<name>`**: overrides for one sub-project.
//!
//! The two features are **`sources_code`** (a constants object compiled
//! into the project) and **`build_script`** (accessors available to build
//! scripts). Every field is optional.
//!
//! # Configuration merge
//!
//! For a project and feature, each field is taken from the first place that
//! sets it:
//!
//! ```text
//! projects.<name>.<feature>
//!        ↓ falls back to
//! projects.<name>.all
//!        ↓ falls back to
//! global.<feature>
//!        ↓ falls back to
//! global.all
//!        ↓ falls back to
//! compiled default
//! ```
//!
//! See [`merge`] for the resolved shapes.
//!
//! # Property resolution
//!
//! Property sources are tagged by [`LocationType`]. The selected tags are
//! read in the order declared, later sources overriding earlier ones, on top
//! of the permanent key/values:
//!
//! | Tag               | Source                                         |
//! |-------------------|------------------------------------------------|
//! | `CURRENT_PROJECT` | properties files in the project directory      |
//! | `ROOT_PROJECT`    | properties files in the root project directory |
//! | `GLOBAL`          | properties files in the build tool user home   |
//! | `SYSTEM`          | the host's system properties                   |
//! | `SYSTEM_ENV`      | process environment variables                  |
//!
//! Key filters drop entries, `${key}` references are resolved against the
//! merged map, and per-key value rules run last. See [`resolve`] and
//! [`interpolate`].
//!
//! # Generated code
//!
//! - **Project sources** ([`generator::sources`]): one Kotlin `object` per
//!   project holding `const val` declarations with inferred types.
//! - **Build-script accessors** ([`generator::accessors`]): dotted keys
//!   become nested classes, so `app.db.url` reads as
//!   `props.getApp().getDb().getUrl()`.
//!
//! Values are typed by [`typing`]: booleans, integers, longs (`L` suffix),
//! doubles, floats (`f` suffix) and strings. Quoting a value keeps it a
//! string.
//!
//! # Change detection
//!
//! A session fingerprints the declaration and remembers every resolved map
//! in a JSON state file under the build cache (see [`cache`]). Output is
//! regenerated only when the declaration changed, a map changed, or the
//! output directory is empty.
//!
//! # Tool settings
//!
//! The tool's own knobs (cache directory, user home, offline mode, strict
//! parsing) live in an optional `proptree-settings.toml` next to the root
//! project and a few environment variables. See [`settings`].
//!
//! # Strict mode
//!
//! Strict mode is **on by default**. A declaration key that matches no field
//! fails the run with the file path, key name and line number:
//!
//! ```text
//! Unknown key 'global.all.enable' in /work/demo/proptree.toml (line 3)
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`ProptreeError`]. [`ProptreeError::kind`]
//! sorts errors into broad [`ErrorKind`]s for hosts deciding how to report
//! them.

pub mod cache;
pub mod declare;
pub mod deploy;
pub mod env;
pub mod error;
pub mod generator;
pub mod interpolate;
pub mod merge;
pub mod naming;
pub mod project;
pub mod properties;
pub mod resolve;
pub mod settings;
pub mod types;
pub mod typing;
pub mod update;
pub mod validate;

mod builder;

#[cfg(test)]
mod fixtures;

pub use builder::{Proptree, ProptreeBuilder};
pub use declare::Declaration;
pub use deploy::{ExtensionBinding, Session, SourcesOutcome};
pub use env::Environment;
pub use error::{ErrorKind, ProptreeError};
pub use merge::ResolvedConfigs;
pub use project::{ProjectDescriptor, ProjectTree};
pub use settings::ToolSettings;
pub use types::{Feature, KeyMatcher, LocationType, PropertyMap, PropertyValue, ValueRule};
pub use update::UpdateNotice;
