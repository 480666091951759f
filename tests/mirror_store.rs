mod common;

use fake::faker::lorem::en::Words;
use fake::Fake;
use pindiff::areas::mirror::MirrorStore;
use pindiff::errors::DifferError;

#[test]
fn ensure_clones_an_absent_mirror() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let remote_path = temp.path().join("remote");
    let repo = common::init_repo(&remote_path);
    let content = Words(5..10).fake::<Vec<String>>().join(" ");
    let head = common::commit_file(&repo, "README.md", &content, "Initial commit");

    let store = MirrorStore::new(temp.path().join("mirrors"), None);
    let mirror = store
        .ensure("sub", &common::repo_url(&remote_path), false)
        .expect("clone succeeds");

    assert!(mirror.path().exists());
    assert_eq!(mirror.resolve_commit("master").expect("resolve"), head);
}

#[test]
fn second_ensure_without_update_performs_no_network_operation() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let remote_path = temp.path().join("remote");
    let repo = common::init_repo(&remote_path);
    let head = common::commit_file(&repo, "README.md", "hello", "Initial commit");

    let store = MirrorStore::new(temp.path().join("mirrors"), None);
    store
        .ensure("sub", &common::repo_url(&remote_path), false)
        .expect("first ensure clones");

    // With the remote gone, any network operation would fail. The existing
    // mirror must be reused untouched.
    drop(repo);
    std::fs::remove_dir_all(&remote_path).expect("remove remote");

    let mirror = store
        .ensure("sub", &common::repo_url(&remote_path), false)
        .expect("second ensure reuses the mirror");
    assert_eq!(mirror.resolve_commit("master").expect("resolve"), head);

    // An explicit update against the missing remote does fail, and is scoped.
    let err = store
        .ensure("sub", &common::repo_url(&remote_path), true)
        .expect_err("update against a missing remote fails");
    assert!(matches!(err, DifferError::MirrorUnavailable { .. }));
}

#[test]
fn update_fetches_commits_made_after_the_clone() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let remote_path = temp.path().join("remote");
    let repo = common::init_repo(&remote_path);
    common::commit_file(&repo, "a.txt", "one", "First commit");

    let store = MirrorStore::new(temp.path().join("mirrors"), None);
    let url = common::repo_url(&remote_path);
    store.ensure("sub", &url, false).expect("clone");

    let later = common::commit_file(&repo, "b.txt", "two", "Second commit");

    let stale = store.ensure("sub", &url, false).expect("reuse");
    assert!(matches!(
        stale.resolve_commit(&later.to_string()),
        Err(DifferError::RevisionUnresolvable { .. })
    ));

    let fresh = store.ensure("sub", &url, true).expect("fetch");
    assert_eq!(fresh.resolve_commit(&later.to_string()).expect("resolve"), later);
}

#[test]
fn unreachable_remote_is_reported_and_leaves_no_mirror_behind() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let store = MirrorStore::new(temp.path().join("mirrors"), None);

    let err = store
        .ensure("ghost", "/nonexistent/fixture/repository", false)
        .expect_err("clone fails");

    assert!(matches!(err, DifferError::MirrorUnavailable { .. }));
    // A failed clone must not leave a half-initialized mirror that a later
    // run would open instead of recloning.
    assert!(!store.path_for("ghost").exists());
}

#[test]
fn blob_content_is_read_at_a_revision_without_a_checkout() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let remote_path = temp.path().join("remote");
    let repo = common::init_repo(&remote_path);
    let first = common::commit_file(&repo, "pins.yml", "version: one\n", "Declare pins");
    let second = common::commit_file(&repo, "pins.yml", "version: two\n", "Bump pins");

    let store = MirrorStore::new(temp.path().join("mirrors"), None);
    let mirror = store
        .ensure("sub", &common::repo_url(&remote_path), false)
        .expect("clone");

    let old = mirror.blob_at(first, "pins.yml").expect("read old blob");
    let new = mirror.blob_at(second, "pins.yml").expect("read new blob");
    assert_eq!(old.as_deref(), Some(b"version: one\n" as &[u8]));
    assert_eq!(new.as_deref(), Some(b"version: two\n" as &[u8]));

    let missing = mirror.blob_at(second, "absent.yml").expect("read absent path");
    assert_eq!(missing, None);
}

#[test]
fn tags_are_mirrored_and_resolve_as_revisions() {
    let temp = assert_fs::TempDir::new().expect("tempdir");
    let remote_path = temp.path().join("remote");
    let repo = common::init_repo(&remote_path);
    let head = common::commit_file(&repo, "a.txt", "one", "First commit");
    let commit = repo.find_commit(head).expect("find commit");
    repo.tag_lightweight("v1.0.0", commit.as_object(), false)
        .expect("tag");

    let store = MirrorStore::new(temp.path().join("mirrors"), None);
    let mirror = store
        .ensure("sub", &common::repo_url(&remote_path), false)
        .expect("clone");

    assert_eq!(mirror.resolve_commit("v1.0.0").expect("resolve tag"), head);
}
