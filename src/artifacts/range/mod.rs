//! Revision-range resolution.
//!
//! For every changed pin this resolves the old and new revision identifiers
//! against the sub-project's own mirror and enumerates the commits between
//! them. Ancestry is tested in both directions: a pin that moved backwards is
//! a reversal and the range flips to show what was lost; a pin whose old and
//! new revisions share no line of descent (force-push, rebase) is diverged
//! and gets a best-effort exclusive range, never an error.
//!
//! Additions and removals carry a marker and no commit enumeration — the
//! history "behind" a brand-new pin is unbounded and enumerating it would
//! drown the report.

use crate::areas::mirror::MirrorStore;
use crate::artifacts::diff::PinChange;
use crate::errors::DifferError;
use crate::short_rev;
use derive_new::new;

/// How the new revision relates to the old one.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    /// Old revision is an ancestor of the new one: a normal advance.
    Forward,
    /// New revision is an ancestor of the old one: the pin moved backwards
    /// and the commit list holds what was lost.
    Reversed,
    /// Neither revision reaches the other; the commit list holds what is
    /// reachable from new but not old.
    Diverged,
}

/// Metadata of a single commit, newest-first within a range.
#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct CommitRecord {
    id: String,
    author: String,
    subject: String,
}

impl CommitRecord {
    pub fn from_commit(commit: &git2::Commit<'_>) -> Self {
        CommitRecord {
            id: commit.id().to_string(),
            author: commit
                .author()
                .name()
                .unwrap_or("unknown")
                .to_string(),
            subject: commit.summary().unwrap_or("").to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_id(&self) -> &str {
        short_rev(&self.id)
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Merge commits are hidden from report ranges.
    pub fn is_merge(&self) -> bool {
        self.subject.starts_with("Merge ")
    }
}

/// The resolved outcome for one changed pin. Constructed once, immutable,
/// consumed by assembly and rendering.
#[derive(Debug, Clone, new)]
pub struct ProjectDiffResult {
    name: String,
    url: String,
    /// Short form of the old pinned revision; absent for a brand-new pin.
    old: Option<String>,
    /// Short form of the new pinned revision; absent for a removed pin.
    new: Option<String>,
    direction: Direction,
    commits: Vec<CommitRecord>,
}

impl ProjectDiffResult {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn old(&self) -> Option<&str> {
        self.old.as_deref()
    }

    pub fn new_rev(&self) -> Option<&str> {
        self.new.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }
}

/// Resolves changed pins against their sub-project mirrors.
#[derive(new)]
pub struct RangeResolver<'s> {
    store: &'s MirrorStore,
    /// Forwarded to the mirror manager: refresh existing mirrors before
    /// resolving against them.
    update: bool,
}

impl RangeResolver<'_> {
    /// Resolve one changed pin into a [`ProjectDiffResult`].
    ///
    /// Failures are scoped to this pin; the caller records them and carries
    /// on with the remaining sub-projects.
    pub fn resolve(&self, change: &PinChange) -> Result<ProjectDiffResult, DifferError> {
        let (Some(old_pin), Some(new_pin)) = (change.old(), change.new_pin()) else {
            // Additions and removals: marker only, no commit range.
            return Ok(ProjectDiffResult::new(
                change.name().to_string(),
                change.url().unwrap_or_default().to_string(),
                change.old().map(|pin| short_rev(&pin.revision).to_string()),
                change
                    .new_pin()
                    .map(|pin| short_rev(&pin.revision).to_string()),
                Direction::Forward,
                Vec::new(),
            ));
        };

        let mirror = self
            .store
            .ensure(change.name(), &new_pin.url, self.update)?;

        let old_oid = mirror.resolve_commit(&old_pin.revision)?;
        let new_oid = mirror.resolve_commit(&new_pin.revision)?;

        let (direction, from, to) = if mirror.is_ancestor(old_oid, new_oid)? {
            (Direction::Forward, old_oid, new_oid)
        } else if mirror.is_ancestor(new_oid, old_oid)? {
            // The range flips so the list represents what was lost.
            (Direction::Reversed, new_oid, old_oid)
        } else {
            tracing::warn!(
                project = change.name(),
                old = %old_pin.revision,
                new = %new_pin.revision,
                "pinned revisions have diverged; reporting a best-effort range"
            );
            (Direction::Diverged, old_oid, new_oid)
        };

        let commits = mirror
            .commits_between(from, to)?
            .into_iter()
            .filter(|commit| !commit.is_merge())
            .collect();

        Ok(ProjectDiffResult::new(
            change.name().to_string(),
            new_pin.url.clone(),
            Some(short_rev(&old_pin.revision).to_string()),
            Some(short_rev(&new_pin.revision).to_string()),
            direction,
            commits,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_commits_are_recognized_by_subject() {
        let merge = CommitRecord::new(
            "a".repeat(40),
            "Alice".to_string(),
            "Merge branch 'feature'".to_string(),
        );
        let plain = CommitRecord::new(
            "b".repeat(40),
            "Bob".to_string(),
            "Fix the frobnicator".to_string(),
        );

        assert!(merge.is_merge());
        assert!(!plain.is_merge());
    }

    #[test]
    fn short_id_abbreviates_the_full_hash() {
        let commit = CommitRecord::new(
            "0123456789abcdef0123456789abcdef01234567".to_string(),
            "Alice".to_string(),
            "Subject".to_string(),
        );
        assert_eq!(commit.short_id(), "01234567");
    }
}
