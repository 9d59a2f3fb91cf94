//! store::traits
//!
//! The `ObjectStore` trait: a typed boundary over a remote Git hosting
//! service's content and Git data APIs.
//!
//! # Design
//!
//! The trait is async because every operation is a network round-trip. All
//! methods return `Result` with a classified [`StoreError`]; nothing here
//! retries automatically. The protocol layer in [`crate::ops`] drives these
//! primitives and owns ordering and atomicity; implementations only perform
//! single calls.
//!
//! Two implementations exist: [`github`] for the real service and [`mock`]
//! for deterministic tests.
//!
//! [`github`]: crate::store::github
//! [`mock`]: crate::store::mock

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from object store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested repository, branch, or path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A compare-and-swap precondition failed: the branch head moved or a
    /// content fingerprint no longer matches.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or missing input, detected before any remote call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),
}

/// Caller-facing classification of a failure.
///
/// Every [`StoreError`] projects onto exactly one of these kinds; the kind
/// determines retry eligibility and is what the CLI envelope reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Repository, branch, or path absent. Not retryable without new input.
    NotFound,
    /// Stale branch head or fingerprint mismatch. Retryable only after
    /// re-reading current state.
    Conflict,
    /// Bad input, rejected before any remote call.
    Validation,
    /// Transport or availability failure. Retryable with identical inputs.
    Remote,
}

impl StoreError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::AuthRequired
            | StoreError::AuthFailed(_)
            | StoreError::RateLimited
            | StoreError::ApiError { .. }
            | StoreError::Network(_) => ErrorKind::Remote,
        }
    }

    /// Whether retrying with identical inputs is sound.
    ///
    /// Only `Remote` failures qualify: none of the store primitives leave
    /// state behind that makes a repeat unsafe, and a repeated ref CAS
    /// against an unchanged head is a no-op.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Remote
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Remote => write!(f, "remote"),
        }
    }
}

/// A repository coordinate: owner plus name.
///
/// Opaque identifiers supplied by the caller on every call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a repository reference from owner and name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(StoreError::Validation(format!(
                "expected repository as 'owner/name', got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A branch with its current head commit.
///
/// The head is read lazily and never cached across operations; each protocol
/// run re-reads it at its own start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// Branch name
    pub name: String,
    /// SHA of the commit the branch currently points at
    pub head: String,
}

/// Repository metadata from a listing or lookup.
#[derive(Debug, Clone, Serialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    /// Configured default branch name
    pub default_branch: String,
    /// Whether the repository is private
    pub private: bool,
    /// Free-form description, if any
    pub description: Option<String>,
    /// Last update timestamp as reported by the store
    pub updated_at: Option<String>,
}

/// The authenticated account, from the connection probe.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Login name
    pub login: String,
    /// Display name, if set
    pub name: Option<String>,
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symlink, submodule, or anything else the store reports
    Other,
}

/// One entry in a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct DirEntry {
    /// Entry name (last path component)
    pub name: String,
    /// Full slash-separated path
    pub path: String,
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes, for files
    pub size: Option<u64>,
    /// Content fingerprint
    pub sha: String,
}

/// File content plus its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Slash-separated path
    pub path: String,
    /// Content fingerprint (the optimistic-concurrency token)
    pub sha: String,
    /// Size in bytes
    pub size: u64,
    /// Opaque byte content, decoded from the store's transport encoding
    pub content: Vec<u8>,
}

/// One logical file change in a multi-file commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Slash-separated relative path; must be non-empty and must not begin
    /// with `/`
    pub path: String,
    /// New content, opaque bytes
    pub content: Vec<u8>,
    /// Prior content fingerprint, if the caller read the file earlier.
    /// Consulted only by the single-file mutation flow; the multi-file
    /// commit relies on the ref CAS instead.
    pub expected: Option<String>,
}

impl FileChange {
    /// Create an unconditional change.
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            expected: None,
        }
    }
}

/// One entry for a tree creation: a regular file at `path` with `content`.
///
/// Produced 1:1 from [`FileChange`]; paths must be unique within one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Slash-separated relative path
    pub path: String,
    /// Opaque byte content
    pub content: Vec<u8>,
}

/// A commit object's identity and tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit SHA
    pub sha: String,
    /// SHA of the tree the commit points at
    pub tree: String,
}

/// Result of a single-file write or delete through the contents API.
#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    /// SHA of the commit the store created
    pub commit_sha: String,
    /// New content fingerprint; `None` after a delete
    pub content_sha: Option<String>,
}

/// Request to open a pull request.
#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Branch with the changes
    pub head: String,
    /// Branch to merge into
    pub base: String,
}

/// An open pull request, as returned by the store.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL
    pub url: String,
    /// PR title
    pub title: String,
    /// State string as reported by the store
    pub state: String,
}

/// Typed wrapper over the remote object store's primitive operations.
///
/// # Contract
///
/// Each method is a single remote call. The only operation with side effects
/// that are not idempotent-by-inspection is [`update_ref`], and it is guarded
/// by the store's fast-forward compare-and-swap: it must succeed only if the
/// branch's current head (as observed by the store at the moment of the
/// call) is an ancestor of the new commit. Force updates are never issued.
///
/// Content is opaque bytes everywhere; implementations own the transport
/// encoding and must round-trip exactly.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the protocol layer may be driven
/// from many tasks concurrently, each with request-scoped values.
///
/// [`update_ref`]: ObjectStore::update_ref
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store name for diagnostics (e.g. "github", "mock").
    fn name(&self) -> &'static str;

    /// Probe the credential: who is authenticated?
    async fn authenticated_user(&self) -> Result<Account, StoreError>;

    /// List repositories of the authenticated user, or of `owner` when given,
    /// most recently updated first.
    async fn list_repositories(&self, owner: Option<&str>) -> Result<Vec<Repository>, StoreError>;

    /// Fetch repository metadata, including its default branch name.
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, StoreError>;

    /// List branches with their head SHAs.
    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<Branch>, StoreError>;

    /// Read one branch ref.
    ///
    /// # Errors
    ///
    /// `NotFound` if the repository or branch does not exist.
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, StoreError>;

    /// Create a branch pointing at `from_sha`.
    ///
    /// # Errors
    ///
    /// `Conflict` if a branch with that name already exists.
    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), StoreError>;

    /// List a directory at `reference` (a branch name or commit SHA).
    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, StoreError>;

    /// Read a file at `reference`, decoding the transport encoding.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path is absent; `Validation` if it names a
    /// directory.
    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<FileContent, StoreError>;

    /// Create or update one file on `branch` via the contents API.
    ///
    /// `expected` carries the prior fingerprint for an update; `None` means
    /// create. The store enforces the precondition:
    ///
    /// # Errors
    ///
    /// `Conflict` if `expected` is stale, or if `expected` is `None` and the
    /// file already exists.
    async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<WriteResult, StoreError>;

    /// Delete one file on `branch`. The current fingerprint is mandatory.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file is absent; `Conflict` if `sha` is stale.
    async fn delete_file(
        &self,
        repo: &RepoRef,
        path: &str,
        message: &str,
        branch: &str,
        sha: &str,
    ) -> Result<WriteResult, StoreError>;

    /// Read a commit object (for its tree SHA).
    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, StoreError>;

    /// Create a tree that is `base_tree` with `entries` overlaid (upsert by
    /// path); paths not mentioned are inherited unchanged. Returns the new
    /// tree SHA. Pure object creation; nothing becomes reachable.
    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, StoreError>;

    /// Create a commit object with a single parent. Pure object creation;
    /// no branch moves.
    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        parent: &str,
        tree: &str,
    ) -> Result<String, StoreError>;

    /// Fast-forward `branch` to `sha`.
    ///
    /// This is the sole synchronization primitive of the whole protocol.
    ///
    /// # Errors
    ///
    /// `Conflict` if the branch's current head is not an ancestor of `sha`
    /// (a concurrent writer won the race).
    async fn update_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<(), StoreError>;

    /// Open a pull request.
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, StoreError>;
}
