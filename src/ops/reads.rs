//! ops::reads
//!
//! Read paths and the remaining auxiliary operations: branch-resolved
//! directory listing and file read, branch creation, and the connection
//! probe.

use tracing::info;

use super::{resolve::resolve_branch, validate_path};
use crate::store::{Account, Branch, DirEntry, FileContent, ObjectStore, RepoRef, StoreError};

/// List a directory (empty path for the repository root).
pub async fn list_dir(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    path: &str,
    branch: Option<&str>,
) -> Result<Vec<DirEntry>, StoreError> {
    if !path.is_empty() {
        validate_path(path)?;
    }
    let branch = resolve_branch(store, repo, branch).await?;
    store.list_dir(repo, path, &branch.name).await
}

/// Read a file's content and fingerprint.
pub async fn read_file(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    path: &str,
    branch: Option<&str>,
) -> Result<FileContent, StoreError> {
    validate_path(path)?;
    let branch = resolve_branch(store, repo, branch).await?;
    store.get_file(repo, path, &branch.name).await
}

/// Create a branch from another branch's current head (the default branch
/// when `from` is `None`).
///
/// # Errors
///
/// `Conflict` if `name` already exists; `NotFound` if the source branch is
/// absent.
pub async fn create_branch(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    name: &str,
    from: Option<&str>,
) -> Result<Branch, StoreError> {
    if name.is_empty() {
        return Err(StoreError::Validation("branch name must not be empty".into()));
    }
    let source = resolve_branch(store, repo, from).await?;
    store.create_branch(repo, name, &source.head).await?;
    info!(repo = %repo, branch = name, from = %source.name, head = %source.head, "branch created");
    Ok(Branch {
        name: name.to_string(),
        head: source.head,
    })
}

/// Probe the credential and connection by fetching the authenticated user.
pub async fn check_connection(store: &dyn ObjectStore) -> Result<Account, StoreError> {
    let account = store.authenticated_user().await?;
    info!(store = store.name(), login = %account.login, "connection ok");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use crate::store::EntryKind;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "demo")
    }

    #[tokio::test]
    async fn list_dir_resolves_default_branch() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        store.seed_file(&repo(), "main", "src/lib.rs", b"x");

        let entries = list_dir(&store, &repo(), "", None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "src");
        assert_eq!(entries[0].kind, EntryKind::Dir);
    }

    #[tokio::test]
    async fn read_file_returns_bytes_and_sha() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        store.seed_file(&repo(), "main", "a.txt", b"hello");

        let file = read_file(&store, &repo(), "a.txt", None).await.unwrap();
        assert_eq!(file.content, b"hello");
        assert_eq!(file.size, 5);
        assert!(!file.sha.is_empty());
    }

    #[tokio::test]
    async fn create_branch_from_default_head() {
        let store = MockStore::new();
        let head = store.add_repo("octo", "demo", "main");

        let branch = create_branch(&store, &repo(), "feature", None).await.unwrap();
        assert_eq!(branch.head, head);
        assert_eq!(store.branch_head(&repo(), "feature").unwrap(), head);
    }

    #[tokio::test]
    async fn create_branch_twice_conflicts() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        create_branch(&store, &repo(), "feature", None).await.unwrap();
        let err = create_branch(&store, &repo(), "feature", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn check_connection_reports_login() {
        let store = MockStore::new();
        let account = check_connection(&store).await.unwrap();
        assert_eq!(account.login, "mock-user");
    }
}
