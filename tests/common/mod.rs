#![allow(dead_code)]

//! Shared fixture builders.
//!
//! Integration tests run against real repositories built on the fly: one
//! "deployment" repository carrying the version manifests and any number of
//! sub-project repositories referenced by pin. Everything lives in temp dirs
//! and is committed through libgit2, never a git binary.

use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use std::path::Path;

/// Initialize a repository with a deterministic default branch name.
pub fn init_repo(path: &Path) -> Repository {
    std::fs::create_dir_all(path).expect("create repo dir");
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("refs/heads/master");
    Repository::init_opts(path, &opts).expect("init repository")
}

/// Write `content` to `name`, stage it, and commit on the current branch.
pub fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().expect("workdir");
    let path = workdir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&path, content).expect("write file");

    let mut index = repo.index().expect("index");
    index.add_path(Path::new(name)).expect("stage file");
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = Signature::now("Test Author", "test@example.org").expect("signature");

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("parent commit")],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
        .expect("commit")
}

/// Commit a single-file tree onto `branch` with an explicit parent, without
/// touching HEAD or the working tree. Creates the branch if needed.
pub fn commit_on_branch(
    repo: &Repository,
    branch: &str,
    parent: Oid,
    name: &str,
    content: &str,
    message: &str,
) -> Oid {
    let parent_commit = repo.find_commit(parent).expect("parent commit");
    let blob = repo.blob(content.as_bytes()).expect("blob");
    let mut builder = repo.treebuilder(None).expect("treebuilder");
    builder.insert(name, blob, 0o100_644).expect("tree entry");
    let tree = repo.find_tree(builder.write().expect("write tree")).expect("find tree");
    let signature = Signature::now("Test Author", "test@example.org").expect("signature");

    repo.commit(
        Some(&format!("refs/heads/{branch}")),
        &signature,
        &signature,
        message,
        &tree,
        &[&parent_commit],
    )
    .expect("commit on branch")
}

/// One linear commit per subject, on the current branch, oldest first.
pub fn linear_history(repo: &Repository, subjects: &[&str]) -> Vec<Oid> {
    subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| commit_file(repo, &format!("file{i}.txt"), subject, subject))
        .collect()
}

/// Role-requirements manifest body for `(name, src, version)` entries.
pub fn role_manifest(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::from("---\n");
    for (name, src, version) in entries {
        out.push_str(&format!(
            "- name: {name}\n  src: {src}\n  version: {version}\n"
        ));
    }
    out
}

/// Project-variables manifest body for `(name, url, revision)` entries.
pub fn project_manifest(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::from("---\n");
    for (name, url, revision) in entries {
        out.push_str(&format!(
            "{name}_git_repo: {url}\n{name}_git_install_branch: {revision}\n"
        ));
    }
    out
}

/// Local-path URL for a fixture repository.
pub fn repo_url(path: &Path) -> String {
    path.display().to_string()
}
