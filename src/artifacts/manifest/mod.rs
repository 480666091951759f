//! Pin declarations and manifest snapshots.
//!
//! A manifest snapshot is the full set of pins visible at one revision of the
//! deployment repository. Snapshots are read from blob content at that
//! revision; no working tree is ever checked out, so concurrent readers never
//! observe a mutated mirror.

pub mod format;

pub use format::ManifestSource;

use std::collections::BTreeMap;

/// One pin as declared by a manifest: the sub-project's repository URL and
/// the exact revision the deployment requires from it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PinnedRevision {
    pub url: String,
    pub revision: String,
}

/// All pins visible in one manifest snapshot, keyed by sub-project name.
///
/// An ordered map so that everything derived from a snapshot is name-sorted
/// and reproducible without further sorting.
pub type PinSet = BTreeMap<String, PinnedRevision>;
