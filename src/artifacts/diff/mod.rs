//! Pin-set comparison.
//!
//! Compares the pin sets of two manifest snapshots and classifies every
//! difference. Sub-project identity is exact string equality; two pins are
//! equal when their revision identifiers are byte-equal. Output is strictly
//! ordered by sub-project name so the report is stable across runs and
//! diffable itself.

use crate::artifacts::manifest::{PinSet, PinnedRevision};
use derive_new::new;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChangeKind {
    /// Present only in the new snapshot.
    Added,
    /// Present only in the old snapshot.
    Removed,
    /// Present in both with differing revisions.
    Updated,
}

/// One changed pin. At least one of `old`/`new` is present; pins equal on
/// both sides never appear here.
#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct PinChange {
    name: String,
    old: Option<PinnedRevision>,
    new: Option<PinnedRevision>,
}

impl PinChange {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn old(&self) -> Option<&PinnedRevision> {
        self.old.as_ref()
    }

    pub fn new_pin(&self) -> Option<&PinnedRevision> {
        self.new.as_ref()
    }

    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            _ => ChangeKind::Updated,
        }
    }

    /// The repository URL to resolve this change against: the new side's
    /// declaration wins, the old side's is the fallback for removals.
    pub fn url(&self) -> Option<&str> {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|pin| pin.url.as_str())
    }
}

/// Compare two pin sets and return every changed pin, sorted by name.
pub fn diff(old: &PinSet, new: &PinSet) -> Vec<PinChange> {
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    names
        .into_iter()
        .filter_map(|name| match (old.get(name), new.get(name)) {
            (Some(o), Some(n)) if o.revision == n.revision => None,
            (None, None) => None,
            (o, n) => Some(PinChange::new(name.clone(), o.cloned(), n.cloned())),
        })
        .collect()
}
