//! Best-effort check for a newer release.
//!
//! The transport is supplied by the host so no network code lives here. Any
//! failure along the way means "no notice".

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

pub const RELEASES_URL: &str = "https://repo1.maven.org/maven2";
pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";

static LATEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<latest>\s*([^<]*?)\s*</latest>").expect("proptree: static regex is valid")
});

/// A newer version is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub current: String,
    pub latest: String,
}

impl fmt::Display for UpdateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proptree update is available, the current version is {}, please update to {}",
            self.current, self.latest
        )
    }
}

/// Metadata location for an artifact: `<releases>/<group path>/<artifact>/maven-metadata.xml`.
pub fn metadata_url(group_id: &str, artifact_id: &str) -> String {
    format!(
        "{RELEASES_URL}/{}/{artifact_id}/{METADATA_FILE_NAME}",
        group_id.replace('.', "/")
    )
}

/// Extract `<latest>` from a Maven metadata document.
pub fn find_latest(metadata: &str) -> Option<String> {
    let doc = metadata.trim();
    if !(doc.contains("<metadata ") || doc.contains("<metadata>")) || !doc.ends_with("</metadata>") {
        return None;
    }
    LATEST
        .captures(doc)
        .map(|caps| caps[1].to_string())
        .filter(|latest| !latest.is_empty())
}

/// Compare the published version against `current`.
///
/// Skipped when `offline`. `fetch` receives the metadata URL and returns the
/// document body.
pub fn check_for_update<E, F>(
    offline: bool,
    current: &str,
    url: &str,
    fetch: F,
) -> Option<UpdateNotice>
where
    E: fmt::Display,
    F: FnOnce(&str) -> Result<String, E>,
{
    if offline {
        return None;
    }
    let body = match fetch(url) {
        Ok(body) => body,
        Err(e) => {
            debug!(url, error = %e, "update check failed");
            return None;
        }
    };
    let latest = find_latest(&body)?;
    if latest == current {
        return None;
    }
    let notice = UpdateNotice {
        current: current.to_string(),
        latest,
    };
    info!("{notice}");
    Some(notice)
}
