//! ops::guard
//!
//! Optimistic-concurrency token acquisition for single-file mutations.
//!
//! A mutation needs the current content fingerprint as its precondition.
//! Callers who read the file earlier supply the fingerprint they saw, and it
//! is used as-is even if the file has changed since; the point of optimistic
//! concurrency is that a stale token fails the write with `Conflict` rather
//! than being silently refreshed. Only when the caller supplies nothing is
//! one fresh read performed, immediately before the mutating call.

use std::future::Future;

use crate::store::{ObjectStore, RepoRef, StoreError};

/// Obtain the precondition token for a mutation.
///
/// Returns the caller's token unchanged when supplied; otherwise invokes
/// `read_current` exactly once. `Ok(None)` means the file does not currently
/// exist (the create case).
pub async fn optimistic_token<F, Fut>(
    supplied: Option<String>,
    read_current: F,
) -> Result<Option<String>, StoreError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<String>, StoreError>>,
{
    match supplied {
        Some(token) => Ok(Some(token)),
        None => read_current().await,
    }
}

/// Read the current fingerprint of `path` on `reference`.
///
/// Absence is not an error here: `Ok(None)` lets the caller distinguish
/// "create" from "update" (or refuse to delete).
pub async fn current_file_sha(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    path: &str,
    reference: &str,
) -> Result<Option<String>, StoreError> {
    match store.get_file(repo, path, reference).await {
        Ok(file) => Ok(Some(file.sha)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn supplied_token_wins_without_reading() {
        let read = AtomicBool::new(false);
        let token = optimistic_token(Some("abc".to_string()), || async {
            read.store(true, Ordering::SeqCst);
            Ok(Some("fresh".to_string()))
        })
        .await
        .unwrap();
        assert_eq!(token.as_deref(), Some("abc"));
        assert!(!read.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_token_reads_once() {
        let token = optimistic_token(None, || async { Ok(Some("fresh".to_string())) })
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn read_errors_propagate() {
        let err = optimistic_token(None, || async {
            Err(StoreError::Network("timeout".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));
    }

    #[tokio::test]
    async fn current_file_sha_maps_absence_to_none() {
        let store = MockStore::new();
        let repo = RepoRef::new("octo", "demo");
        store.add_repo("octo", "demo", "main");
        store.seed_file(&repo, "main", "a.txt", b"1");

        let present = current_file_sha(&store, &repo, "a.txt", "main")
            .await
            .unwrap();
        assert!(present.is_some());

        let absent = current_file_sha(&store, &repo, "missing.txt", "main")
            .await
            .unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn current_file_sha_keeps_other_errors() {
        let store = MockStore::new();
        let repo = RepoRef::new("octo", "demo");
        // Repository itself is absent, which is also NotFound; use a
        // directory path to provoke a different error class instead.
        store.add_repo("octo", "demo", "main");
        store.seed_file(&repo, "main", "docs/a.md", b"1");
        let err = current_file_sha(&store, &repo, "docs", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
