//! ops::file
//!
//! Single-file create, update, and delete through the contents API.
//!
//! Each mutation is one server-side commit. The precondition token comes
//! from [`guard::optimistic_token`]: the caller's earlier read if they have
//! one, otherwise a single fresh read directly before the mutating call.
//! Between that read and the write a concurrent writer can still slip in;
//! the store's own precondition check closes the gap by failing the write
//! with `Conflict`.

use tracing::info;

use super::{guard, resolve::resolve_branch, validate_path};
use crate::store::{ObjectStore, RepoRef, StoreError};
use serde::Serialize;

/// Outcome of a single-file write.
#[derive(Debug, Clone, Serialize)]
pub struct FileWritten {
    /// Branch the commit landed on
    pub branch: String,
    /// Path written
    pub path: String,
    /// New content fingerprint
    pub content_sha: Option<String>,
    /// SHA of the commit the store created
    pub commit_sha: String,
    /// True when the file did not exist before
    pub created: bool,
}

/// Outcome of a single-file delete.
#[derive(Debug, Clone, Serialize)]
pub struct FileDeleted {
    /// Branch the commit landed on
    pub branch: String,
    /// Path removed
    pub path: String,
    /// SHA of the commit the store created
    pub commit_sha: String,
}

/// Create or update one file.
///
/// `expected` is the fingerprint from the caller's earlier read, if any.
/// Without it, the current fingerprint is read once; an absent file becomes
/// a create.
///
/// # Errors
///
/// `Validation` for a bad path or empty message; `Conflict` when the
/// fingerprint is stale, or when the file exists but the establishing read
/// raced with its creation.
pub async fn put_file(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    path: &str,
    content: &[u8],
    message: &str,
    branch: Option<&str>,
    expected: Option<String>,
) -> Result<FileWritten, StoreError> {
    validate_path(path)?;
    validate_message(message)?;
    let branch = resolve_branch(store, repo, branch).await?;
    let token = guard::optimistic_token(expected, || {
        guard::current_file_sha(store, repo, path, &branch.name)
    })
    .await?;
    let created = token.is_none();
    let result = store
        .put_file(repo, path, content, message, &branch.name, token.as_deref())
        .await?;
    info!(
        repo = %repo,
        branch = %branch.name,
        path,
        commit = %result.commit_sha,
        created,
        "file written"
    );
    Ok(FileWritten {
        branch: branch.name,
        path: path.to_string(),
        content_sha: result.content_sha,
        commit_sha: result.commit_sha,
        created,
    })
}

/// Delete one file.
///
/// The fingerprint precondition is mandatory for deletes; when no token can
/// be established the file does not exist and the delete fails with
/// `NotFound` rather than succeeding vacuously.
pub async fn delete_file(
    store: &dyn ObjectStore,
    repo: &RepoRef,
    path: &str,
    message: &str,
    branch: Option<&str>,
    expected: Option<String>,
) -> Result<FileDeleted, StoreError> {
    validate_path(path)?;
    validate_message(message)?;
    let branch = resolve_branch(store, repo, branch).await?;
    let token = guard::optimistic_token(expected, || {
        guard::current_file_sha(store, repo, path, &branch.name)
    })
    .await?;
    let Some(sha) = token else {
        return Err(StoreError::NotFound(format!(
            "file '{}' does not exist on '{}'",
            path, branch.name
        )));
    };
    let result = store
        .delete_file(repo, path, message, &branch.name, &sha)
        .await?;
    info!(
        repo = %repo,
        branch = %branch.name,
        path,
        commit = %result.commit_sha,
        "file deleted"
    );
    Ok(FileDeleted {
        branch: branch.name,
        path: path.to_string(),
        commit_sha: result.commit_sha,
    })
}

fn validate_message(message: &str) -> Result<(), StoreError> {
    if message.trim().is_empty() {
        return Err(StoreError::Validation(
            "commit message must not be empty".into(),
        ));
    }
    Ok(())
}
