//! ops
//!
//! The protocol layer: composes [`ObjectStore`] primitives into the
//! operations callers actually run.
//!
//! # Architecture
//!
//! Every operation here follows the same shape:
//!
//! 1. Validate inputs locally; bad input never reaches the network.
//! 2. Resolve the target branch (explicit name, or the repository's
//!    configured default, re-read per operation).
//! 3. Drive the store primitives in protocol order.
//!
//! No operation retries; a `Conflict` is surfaced to the caller, who decides
//! whether to re-read and try again.
//!
//! # Modules
//!
//! - [`resolve`]: branch resolution
//! - [`guard`]: optimistic-concurrency token acquisition
//! - [`commit`]: the atomic multi-file commit
//! - [`file`]: single-file create/update/delete
//! - [`reads`]: read paths and auxiliary calls
//!
//! [`ObjectStore`]: crate::store::ObjectStore

pub mod commit;
pub mod file;
pub mod guard;
pub mod reads;
pub mod resolve;

pub use commit::{commit_files, CommitOutcome};
pub use file::{delete_file, put_file, FileDeleted, FileWritten};
pub use reads::{check_connection, create_branch, list_dir, read_file};
pub use resolve::resolve_branch;

use crate::store::StoreError;

/// Validate a repository-relative path: non-empty, relative, no empty
/// segments.
pub(crate) fn validate_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::Validation("path must not be empty".into()));
    }
    if path.starts_with('/') {
        return Err(StoreError::Validation(format!(
            "path '{}' must be relative (no leading '/')",
            path
        )));
    }
    if path.ends_with('/') || path.split('/').any(|seg| seg.is_empty()) {
        return Err(StoreError::Validation(format!(
            "path '{}' contains an empty segment",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_path_accepts_relative_paths() {
        assert!(validate_path("README.md").is_ok());
        assert!(validate_path("docs/guide/intro.md").is_ok());
    }

    #[test]
    fn validate_path_rejects_bad_shapes() {
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs.txt").is_err());
        assert!(validate_path("dir/").is_err());
        assert!(validate_path("a//b").is_err());
    }
}
