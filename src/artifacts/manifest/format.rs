//! Supported manifest shapes.
//!
//! The deployment repository declares pins in two formats. Both are parsed
//! into the same normalized [`PinSet`] before anything downstream sees them,
//! so the diff engine never branches on manifest shape:
//!
//! - a role-requirements file: a YAML list of `{name, src, version}` entries
//! - project variable files: YAML mappings carrying `<name>_git_repo` /
//!   `<name>_git_install_branch` key pairs, merged across every `.yml` file
//!   in one tree directory
//!
//! Malformed entries are skipped with a warning. A manifest that is absent at
//! the requested revision declares no pins and yields an empty set; a
//! manifest that is present but unparseable is an error.

use crate::areas::mirror::Mirror;
use crate::artifacts::manifest::{PinSet, PinnedRevision};
use crate::errors::DifferError;
use git2::Oid;
use serde::Deserialize;
use serde_yaml::Value;

/// Tree directory holding the project variable files.
pub const PROJECT_VARS_DIR: &str = "playbooks/defaults/repo_packages";

const REPO_KEY_SUFFIX: &str = "_git_repo";
const BRANCH_KEY_SUFFIX: &str = "_git_install_branch";

/// Pin for role entries that declare no version.
const DEFAULT_ROLE_PIN: &str = "HEAD";

#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// A single YAML list of role entries.
    RoleRequirements { path: String },
    /// A directory of YAML variable files, merged in name order.
    ProjectVars { dir: String },
}

impl ManifestSource {
    /// Extract the pin set visible at `commit`.
    pub fn read(&self, mirror: &Mirror, commit: Oid) -> Result<PinSet, DifferError> {
        match self {
            ManifestSource::RoleRequirements { path } => match mirror.blob_at(commit, path)? {
                Some(bytes) => parse_role_requirements(path, &bytes),
                None => Ok(PinSet::new()),
            },
            ManifestSource::ProjectVars { dir } => {
                let mut pins = PinSet::new();
                for (name, bytes) in mirror.blobs_under(commit, dir, ".yml")? {
                    let path = format!("{dir}/{name}");
                    // Later files override earlier ones on duplicate names,
                    // matching a plain mapping merge.
                    pins.extend(parse_project_vars(&path, &bytes)?);
                }
                Ok(pins)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoleEntry {
    name: String,
    src: String,
    #[serde(default)]
    version: Option<Value>,
}

fn parse_role_requirements(path: &str, bytes: &[u8]) -> Result<PinSet, DifferError> {
    let doc: Value =
        serde_yaml::from_slice(bytes).map_err(|err| unreadable(path, &err.to_string()))?;
    if doc.is_null() {
        return Ok(PinSet::new());
    }
    let Some(entries) = doc.as_sequence() else {
        return Err(unreadable(path, "expected a list of role entries"));
    };

    let mut pins = PinSet::new();
    for entry in entries {
        match serde_yaml::from_value::<RoleEntry>(entry.clone()) {
            Ok(role) => {
                let revision = role
                    .version
                    .as_ref()
                    .and_then(scalar)
                    .unwrap_or_else(|| DEFAULT_ROLE_PIN.to_string());
                pins.insert(
                    role.name,
                    PinnedRevision {
                        url: role.src,
                        revision,
                    },
                );
            }
            Err(err) => {
                tracing::warn!(manifest = path, error = %err, "skipping malformed role entry");
            }
        }
    }

    Ok(pins)
}

fn parse_project_vars(path: &str, bytes: &[u8]) -> Result<PinSet, DifferError> {
    let doc: Value =
        serde_yaml::from_slice(bytes).map_err(|err| unreadable(path, &err.to_string()))?;
    if doc.is_null() {
        return Ok(PinSet::new());
    }
    let Some(map) = doc.as_mapping() else {
        return Err(unreadable(path, "expected a mapping of project variables"));
    };

    let mut pins = PinSet::new();
    for (key, value) in map {
        let Some(key) = key.as_str() else { continue };
        let Some(name) = key.strip_suffix(REPO_KEY_SUFFIX) else {
            continue;
        };
        let Some(url) = scalar(value) else {
            tracing::warn!(manifest = path, key, "skipping pin with a non-scalar repository url");
            continue;
        };

        let branch_key = format!("{name}{BRANCH_KEY_SUFFIX}");
        match doc.get(branch_key.as_str()).and_then(scalar) {
            Some(revision) => {
                pins.insert(name.to_string(), PinnedRevision { url, revision });
            }
            None => {
                tracing::warn!(manifest = path, project = name, "skipping pin without an install branch");
            }
        }
    }

    Ok(pins)
}

/// YAML scalars that can stand in for a revision or URL string. Unquoted
/// numeric tags are accepted so that entries like `version: 2024.1` survive.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn unreadable(path: &str, reason: &str) -> DifferError {
    DifferError::ManifestUnreadable {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
