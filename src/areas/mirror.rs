//! Local mirrors of remote repositories.
//!
//! Mirrors are bare repositories stored under a single configured root and
//! reused across runs. A mirror is created lazily on first reference and
//! refreshed only when explicitly requested; nothing here ever deletes one.
//!
//! The [`Mirror`] handle is also the entire source-control surface the diff
//! engine depends on: resolve a revision, test ancestry, read blob content at
//! a revision, and enumerate a commit range. Any backend providing these five
//! capabilities could stand in for libgit2.

use crate::artifacts::range::CommitRecord;
use crate::errors::DifferError;
use derive_new::new;
use file_guard::Lock;
use git2::{AutotagOption, ErrorCode, FetchOptions, Oid, RemoteCallbacks, Repository};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Refspecs fetched into every mirror. Branch heads and tags are both valid
/// pin identifiers, so both are mirrored.
const REFSPECS: &[&str] = &["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// Manages the on-disk mirror root.
///
/// The same repository name always derives the same local path, so repeated
/// runs reuse mirrors instead of recloning them.
#[derive(Debug, new)]
pub struct MirrorStore {
    root: PathBuf,
    /// Upper bound for a single clone/fetch network operation. A fetch that
    /// exceeds it is aborted and reported as [`DifferError::MirrorUnavailable`].
    fetch_timeout: Option<Duration>,
}

impl MirrorStore {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the local mirror path for a repository name.
    ///
    /// Pure function of the name: path separators and other characters that
    /// cannot appear in a single path component are flattened.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
            .collect();
        self.root.join(safe)
    }

    /// Guarantee a local mirror of `url` exists and return a handle to it.
    ///
    /// An absent mirror is cloned unconditionally. An existing mirror is
    /// fetched only when `update` is set; otherwise no network operation is
    /// performed. The mirror is locked for the duration of the call so that
    /// concurrent runs do not read a half-fetched mirror.
    pub fn ensure(&self, name: &str, url: &str, update: bool) -> Result<Mirror, DifferError> {
        let path = self.path_for(name);

        std::fs::create_dir_all(&self.root).map_err(|err| unavailable(name, &err.to_string()))?;
        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path(name))
            .map_err(|err| unavailable(name, &err.to_string()))?;
        let _lock = file_guard::lock(&mut lock_file, Lock::Exclusive, 0, 1)
            .map_err(|err| unavailable(name, &err.to_string()))?;

        let repo = if path.exists() {
            let repo = Repository::open_bare(&path)
                .map_err(|err| unavailable(name, err.message()))?;
            if update {
                tracing::info!(name, url, "fetching mirror");
                self.fetch(&repo, name, url)?;
            }
            repo
        } else {
            tracing::info!(name, url, "cloning mirror");
            self.clone_mirror(name, url, &path)?
        };

        Ok(Mirror::new(name.to_string(), url.to_string(), path, repo))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        let mut path = self.path_for(name).into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// First clone always brings the refs fully up to date, so the update
    /// flag is irrelevant here.
    fn clone_mirror(&self, name: &str, url: &str, path: &Path) -> Result<Repository, DifferError> {
        let repo = Repository::init_bare(path).map_err(|err| unavailable(name, err.message()))?;

        if let Err(err) = self.fetch(&repo, name, url) {
            // Leave no half-initialized mirror behind; the next run must
            // reclone rather than open an empty repository.
            drop(repo);
            let _ = std::fs::remove_dir_all(path);
            return Err(err);
        }

        Ok(repo)
    }

    fn fetch(&self, repo: &Repository, name: &str, url: &str) -> Result<(), DifferError> {
        let mut remote = repo
            .remote_anonymous(url)
            .map_err(|err| unavailable(name, err.message()))?;

        let mut callbacks = RemoteCallbacks::new();
        if let Some(timeout) = self.fetch_timeout {
            let deadline = Instant::now() + timeout;
            // Returning false from the progress callback aborts the transfer.
            callbacks.transfer_progress(move |_| Instant::now() < deadline);
        }

        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks);
        opts.download_tags(AutotagOption::All);

        remote
            .fetch(REFSPECS, Some(&mut opts), None)
            .map_err(|err| unavailable(name, err.message()))
    }
}

/// Handle to one mirrored repository.
///
/// Other components hold this read-only; all filesystem writes stay inside
/// [`MirrorStore::ensure`].
#[derive(new)]
pub struct Mirror {
    name: String,
    url: String,
    path: PathBuf,
    repo: Repository,
}

impl Mirror {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a revision identifier (hash, abbreviated hash, branch, tag)
    /// to the commit it names.
    pub fn resolve_commit(&self, revision: &str) -> Result<Oid, DifferError> {
        self.repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map(|commit| commit.id())
            .map_err(|_| DifferError::RevisionUnresolvable {
                name: self.name.clone(),
                revision: revision.to_string(),
            })
    }

    /// Whether `ancestor` is an ancestor of `descendant`. A commit is not
    /// considered its own ancestor.
    pub fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool, DifferError> {
        self.repo
            .graph_descendant_of(descendant, ancestor)
            .map_err(|err| self.unavailable(err.message()))
    }

    /// Ordered commit metadata reachable from `new` but not `old`, newest
    /// first, matching the backend's `old..new` traversal.
    pub fn commits_between(&self, old: Oid, new: Oid) -> Result<Vec<CommitRecord>, DifferError> {
        let mut walk = self
            .repo
            .revwalk()
            .map_err(|err| self.unavailable(err.message()))?;
        walk.push(new)
            .map_err(|err| self.unavailable(err.message()))?;
        walk.hide(old)
            .map_err(|err| self.unavailable(err.message()))?;

        let mut commits = Vec::new();
        for oid in walk {
            let oid = oid.map_err(|err| self.unavailable(err.message()))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|err| self.unavailable(err.message()))?;
            commits.push(CommitRecord::from_commit(&commit));
        }

        Ok(commits)
    }

    /// Blob content of `path` as it existed at `commit`, without touching any
    /// working tree. `None` means the path does not exist at that revision.
    pub fn blob_at(&self, commit: Oid, path: &str) -> Result<Option<Vec<u8>>, DifferError> {
        let tree = self.tree_of(commit)?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(self.unavailable(err.message())),
        };

        let object = entry
            .to_object(&self.repo)
            .map_err(|err| self.unavailable(err.message()))?;

        Ok(object.as_blob().map(|blob| blob.content().to_vec()))
    }

    /// Content of every blob directly under `dir` at `commit` whose name ends
    /// with `suffix`, in tree (name) order. An absent directory yields an
    /// empty list.
    pub fn blobs_under(
        &self,
        commit: Oid,
        dir: &str,
        suffix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, DifferError> {
        let tree = self.tree_of(commit)?;

        let entry = match tree.get_path(Path::new(dir)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.unavailable(err.message())),
        };

        let object = entry
            .to_object(&self.repo)
            .map_err(|err| self.unavailable(err.message()))?;
        let Some(subtree) = object.as_tree() else {
            return Ok(Vec::new());
        };

        let mut blobs = Vec::new();
        for entry in subtree.iter() {
            let Some(name) = entry.name() else { continue };
            if !name.ends_with(suffix) {
                continue;
            }
            let object = entry
                .to_object(&self.repo)
                .map_err(|err| self.unavailable(err.message()))?;
            if let Some(blob) = object.as_blob() {
                blobs.push((name.to_string(), blob.content().to_vec()));
            }
        }

        Ok(blobs)
    }

    fn tree_of(&self, commit: Oid) -> Result<git2::Tree<'_>, DifferError> {
        self.repo
            .find_commit(commit)
            .and_then(|commit| commit.tree())
            .map_err(|err| self.unavailable(err.message()))
    }

    fn unavailable(&self, reason: &str) -> DifferError {
        unavailable(&self.name, reason)
    }
}

fn unavailable(name: &str, reason: &str) -> DifferError {
    DifferError::MirrorUnavailable {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
