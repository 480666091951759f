//! Error kinds for the diff engine.
//!
//! Every kind is scoped to a single repository: a failure while processing
//! one sub-project is recorded against that sub-project and must never abort
//! the remaining ones. Only the deployment repository itself failing (its
//! mirror, its refs, or its manifests) is fatal to the whole run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DifferError {
    /// Clone or fetch failed: network, auth, disk, or a corrupt mirror.
    /// A timed-out network operation is reported through this kind as well.
    #[error("repository {name} is unavailable: {reason}")]
    MirrorUnavailable { name: String, reason: String },

    /// A manifest exists at the requested revision but could not be parsed.
    /// Distinct from an absent manifest, which simply declares no pins.
    #[error("manifest {path} is unreadable: {reason}")]
    ManifestUnreadable { path: String, reason: String },

    /// A pinned revision is not present in the mirror's history.
    #[error(
        "revision {revision} was not found in repository {name}; \
         you may need to pass --update to fetch the latest refs"
    )]
    RevisionUnresolvable { name: String, revision: String },

    /// No commits exist between the two requested revisions in either
    /// direction. Raised only for the deployment repository, where an empty
    /// range in both directions leaves nothing to diff.
    #[error(
        "the commit range {old}..{new} is invalid for {name}; \
         you may need to pass --update to fetch the latest refs"
    )]
    InvalidCommitRange {
        name: String,
        old: String,
        new: String,
    },
}

impl DifferError {
    /// Short label for the failure section of the report.
    pub fn kind(&self) -> &'static str {
        match self {
            DifferError::MirrorUnavailable { .. } => "mirror unavailable",
            DifferError::ManifestUnreadable { .. } => "manifest unreadable",
            DifferError::RevisionUnresolvable { .. } => "revision unresolvable",
            DifferError::InvalidCommitRange { .. } => "invalid commit range",
        }
    }
}
