//! ops::resolve
//!
//! Branch resolution: turn an optional branch name into a concrete branch
//! with its current head.

use tracing::debug;

use crate::store::{Branch, ObjectStore, RepoRef, StoreError};

/// Resolve `branch` to a [`Branch`] with a freshly read head SHA.
///
/// `None` means the repository's configured default branch, looked up at
/// call time rather than assumed; repositories can change their default, and
/// a stale guess would commit to the wrong line of history.
///
/// # Errors
///
/// `NotFound` if the repository does not exist, or if the named (or default)
/// branch is absent.
pub async fn resolve_branch(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    branch: Option<&str>,
) -> Result<Branch, StoreError> {
    let name = match branch {
        Some(name) => name.to_string(),
        None => {
            let meta = store.get_repository(repo).await?;
            debug!(repo = %repo, default_branch = %meta.default_branch, "resolved default branch");
            meta.default_branch
        }
    };
    store.get_branch(repo, &name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "demo")
    }

    #[tokio::test]
    async fn explicit_branch_skips_repository_lookup() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        let head = store.seed_file(&repo(), "main", "a.txt", b"1");

        let branch = resolve_branch(&store, &repo(), Some("main")).await.unwrap();
        assert_eq!(branch.name, "main");
        assert_eq!(branch.head, head);
        // One call: no repository metadata fetch.
        assert_eq!(store.operations().len(), 1);
    }

    #[tokio::test]
    async fn none_resolves_the_default_branch() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "trunk");

        let branch = resolve_branch(&store, &repo(), None).await.unwrap();
        assert_eq!(branch.name, "trunk");
    }

    #[tokio::test]
    async fn default_branch_is_reread_each_call() {
        let store = MockStore::new();
        let head = store.add_repo("octo", "demo", "main");
        store.create_branch(&repo(), "develop", &head).await.unwrap();

        assert_eq!(
            resolve_branch(&store, &repo(), None).await.unwrap().name,
            "main"
        );
        store.set_default_branch(&repo(), "develop");
        assert_eq!(
            resolve_branch(&store, &repo(), None).await.unwrap().name,
            "develop"
        );
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let store = MockStore::new();
        store.add_repo("octo", "demo", "main");
        let err = resolve_branch(&store, &repo(), Some("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
