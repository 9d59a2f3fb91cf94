//! ops::commit
//!
//! The atomic multi-file commit.
//!
//! # Protocol
//!
//! 1. Resolve the target branch and read its head.
//! 2. Create ONE tree: the head commit's tree with every change overlaid.
//! 3. Create ONE commit whose sole parent is the observed head.
//! 4. Fast-forward the branch ref to the new commit.
//!
//! Steps 2 and 3 are pure object creation; nothing is reachable until step 4
//! succeeds. The ref update is the store's compare-and-swap: if another
//! writer advanced the branch after step 1, the fast-forward fails with
//! `Conflict` and the branch is untouched. The tree and commit objects
//! created by the losing attempt are simply left unreachable; the store
//! garbage-collects them on its own schedule and no cleanup call is made.
//!
//! There are no per-file preconditions here. The commit-level CAS already
//! serializes writers; per-file fingerprints would only re-check what the
//! ref update proves.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use super::{resolve::resolve_branch, validate_path};
use crate::store::{FileChange, ObjectStore, RepoRef, StoreError, TreeEntry};

/// Outcome of a successful multi-file commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    /// Branch the commit landed on
    pub branch: String,
    /// SHA of the new commit
    pub commit_sha: String,
    /// Paths included, in input order
    pub paths: Vec<String>,
}

/// Commit a set of file changes as one commit on `branch`.
///
/// All changes land together or none do. Files not mentioned are inherited
/// from the parent commit unchanged.
///
/// # Errors
///
/// `Validation` if the change set is empty, a path is malformed, a path
/// repeats, or the message is blank; all of these are rejected before any
/// remote call. `Conflict` if a concurrent writer advanced the branch
/// between the head read and the ref update.
pub async fn commit_files(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    message: &str,
    branch: Option<&str>,
    changes: &[FileChange],
) -> Result<CommitOutcome, StoreError> {
    validate_changes(message, changes)?;

    let branch = resolve_branch(store, repo, branch).await?;
    let head = store.get_commit(repo, &branch.head).await?;
    debug!(repo = %repo, branch = %branch.name, head = %head.sha, "commit base resolved");

    let entries: Vec<TreeEntry> = changes
        .iter()
        .map(|change| TreeEntry {
            path: change.path.clone(),
            content: change.content.clone(),
        })
        .collect();
    let tree = store.create_tree(repo, &head.tree, &entries).await?;
    let commit = store.create_commit(repo, message, &head.sha, &tree).await?;
    store.update_ref(repo, &branch.name, &commit).await?;

    info!(
        repo = %repo,
        branch = %branch.name,
        commit = %commit,
        files = changes.len(),
        "committed"
    );
    Ok(CommitOutcome {
        branch: branch.name,
        commit_sha: commit,
        paths: changes.iter().map(|c| c.path.clone()).collect(),
    })
}

fn validate_changes(message: &str, changes: &[FileChange]) -> Result<(), StoreError> {
    if message.trim().is_empty() {
        return Err(StoreError::Validation(
            "commit message must not be empty".into(),
        ));
    }
    if changes.is_empty() {
        return Err(StoreError::Validation(
            "commit requires at least one file change".into(),
        ));
    }
    let mut seen = BTreeSet::new();
    for change in changes {
        validate_path(&change.path)?;
        if !seen.insert(change.path.as_str()) {
            return Err(StoreError::Validation(format!(
                "path '{}' appears more than once",
                change.path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{MockOperation, MockStore};

    fn repo() -> RepoRef {
        RepoRef::new("octo", "demo")
    }

    fn store_with_repo() -> MockStore {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        store
    }

    #[tokio::test]
    async fn commits_all_files_together() {
        let store = store_with_repo();
        store.seed_file(&repo(), "main", "keep.txt", b"kept");

        let outcome = commit_files(
            &store,
            &repo(),
            "add pair",
            Some("main"),
            &[
                FileChange::new("a.txt", b"A".to_vec()),
                FileChange::new("dir/b.txt", b"B".to_vec()),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.paths, vec!["a.txt", "dir/b.txt"]);
        assert_eq!(store.branch_head(&repo(), "main").unwrap(), outcome.commit_sha);
        assert_eq!(store.file_bytes(&repo(), "main", "a.txt").unwrap(), b"A");
        assert_eq!(store.file_bytes(&repo(), "main", "dir/b.txt").unwrap(), b"B");
        // Unmentioned files are inherited.
        assert_eq!(store.file_bytes(&repo(), "main", "keep.txt").unwrap(), b"kept");
    }

    #[tokio::test]
    async fn exactly_one_tree_one_commit_one_ref_update() {
        let store = store_with_repo();
        commit_files(
            &store,
            &repo(),
            "msg",
            Some("main"),
            &[FileChange::new("a.txt", b"A".to_vec())],
        )
        .await
        .unwrap();

        let ops = store.operations();
        let trees = ops
            .iter()
            .filter(|op| matches!(op, MockOperation::CreateTree { .. }))
            .count();
        let commits = ops
            .iter()
            .filter(|op| matches!(op, MockOperation::CreateCommit { .. }))
            .count();
        let refs = ops
            .iter()
            .filter(|op| matches!(op, MockOperation::UpdateRef { .. }))
            .count();
        assert_eq!((trees, commits, refs), (1, 1, 1));
    }

    #[tokio::test]
    async fn empty_change_set_is_rejected_locally() {
        let store = store_with_repo();
        let err = commit_files(&store, &repo(), "msg", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn duplicate_paths_are_rejected_locally() {
        let store = store_with_repo();
        let err = commit_files(
            &store,
            &repo(),
            "msg",
            None,
            &[
                FileChange::new("a.txt", b"1".to_vec()),
                FileChange::new("a.txt", b"2".to_vec()),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn lost_race_leaves_branch_at_winner() {
        let store = store_with_repo();

        // Fail the final CAS as the store would when the head moved.
        let store = store.fail_on(
            crate::store::mock::StoreCall::UpdateRef,
            StoreError::Conflict("update of 'main' is not a fast forward".into()),
        );
        let before = store.branch_head(&repo(), "main").unwrap();
        let err = commit_files(
            &store,
            &repo(),
            "msg",
            Some("main"),
            &[FileChange::new("a.txt", b"A".to_vec())],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.branch_head(&repo(), "main").unwrap(), before);
    }
}
