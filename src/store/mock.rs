//! store::mock
//!
//! Mock object store for deterministic testing.
//!
//! # Design
//!
//! `MockStore` keeps a real (if miniature) content-addressed object model in
//! memory: blobs, flat trees, commits with parent links, and branch refs.
//! Because the model is real, the protocol properties that matter — the
//! fast-forward CAS on ref updates and the fingerprint preconditions on
//! single-file writes — are actually enforced, not stubbed.
//!
//! Failure scenarios are injected per call site via [`fail_on`], and every
//! trait call is recorded for verification, mirroring the recording mock
//! pattern used throughout the test suites.
//!
//! [`fail_on`]: MockStore::fail_on
//!
//! # Example
//!
//! ```
//! use treetop::store::mock::MockStore;
//! use treetop::store::{ObjectStore, RepoRef};
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new();
//! let repo = RepoRef::new("octo", "demo");
//! store.add_repo("octo", "demo", "main");
//! store.seed_file(&repo, "main", "README.md", b"hello");
//!
//! let file = store.get_file(&repo, "README.md", "main").await.unwrap();
//! assert_eq!(file.content, b"hello");
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use super::traits::{
    Account, Branch, CommitInfo, CreatePullRequest, DirEntry, EntryKind, FileContent, ObjectStore,
    PullRequest, RepoRef, Repository, StoreError, TreeEntry, WriteResult,
};

/// Identifies one trait call site, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    AuthenticatedUser,
    ListRepositories,
    GetRepository,
    ListBranches,
    GetBranch,
    CreateBranch,
    ListDir,
    GetFile,
    PutFile,
    DeleteFile,
    GetCommit,
    CreateTree,
    CreateCommit,
    UpdateRef,
    CreatePullRequest,
}

/// Recorded trait call, for test verification.
#[derive(Debug, Clone)]
pub enum MockOperation {
    AuthenticatedUser,
    ListRepositories {
        owner: Option<String>,
    },
    GetRepository {
        repo: String,
    },
    ListBranches {
        repo: String,
    },
    GetBranch {
        repo: String,
        name: String,
    },
    CreateBranch {
        repo: String,
        name: String,
        from_sha: String,
    },
    ListDir {
        repo: String,
        path: String,
        reference: String,
    },
    GetFile {
        repo: String,
        path: String,
        reference: String,
    },
    PutFile {
        repo: String,
        path: String,
        branch: String,
        expected: Option<String>,
    },
    DeleteFile {
        repo: String,
        path: String,
        branch: String,
        sha: String,
    },
    GetCommit {
        repo: String,
        sha: String,
    },
    CreateTree {
        repo: String,
        base_tree: String,
        paths: Vec<String>,
    },
    CreateCommit {
        repo: String,
        parent: String,
        message: String,
    },
    UpdateRef {
        repo: String,
        branch: String,
        sha: String,
    },
    CreatePullRequest {
        repo: String,
        head: String,
        base: String,
    },
}

/// Mock object store. Thread-safe; clones share state.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    login: String,
    repos: BTreeMap<String, RepoState>,
    fail_on: Option<(StoreCall, StoreError)>,
    operations: Vec<MockOperation>,
    /// Makes commit SHAs unique even for identical message/tree/parent.
    commit_counter: u64,
}

#[derive(Debug)]
struct RepoState {
    owner: String,
    name: String,
    default_branch: String,
    branches: BTreeMap<String, String>,
    commits: HashMap<String, MockCommit>,
    /// Flat trees: full path -> blob SHA.
    trees: HashMap<String, BTreeMap<String, String>>,
    blobs: HashMap<String, Vec<u8>>,
    pulls: Vec<PullRequest>,
}

#[derive(Debug)]
struct MockCommit {
    parent: Option<String>,
    tree: String,
    #[allow(dead_code)]
    message: String,
}

fn object_sha(kind: &str, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"\0");
    hasher.update(payload);
    let digest = hasher.finalize();
    hex::encode(digest)[..40].to_string()
}

fn blob_sha(content: &[u8]) -> String {
    object_sha("blob", content)
}

fn tree_sha(entries: &BTreeMap<String, String>) -> String {
    let mut payload = Vec::new();
    for (path, sha) in entries {
        payload.extend_from_slice(path.as_bytes());
        payload.push(0);
        payload.extend_from_slice(sha.as_bytes());
        payload.push(0);
    }
    object_sha("tree", &payload)
}

impl RepoState {
    fn new(owner: &str, name: &str, default_branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: default_branch.to_string(),
            branches: BTreeMap::new(),
            commits: HashMap::new(),
            trees: HashMap::new(),
            blobs: HashMap::new(),
            pulls: Vec::new(),
        }
    }

    fn insert_blob(&mut self, content: &[u8]) -> String {
        let sha = blob_sha(content);
        self.blobs.insert(sha.clone(), content.to_vec());
        sha
    }

    fn insert_tree(&mut self, entries: BTreeMap<String, String>) -> String {
        let sha = tree_sha(&entries);
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn insert_commit(
        &mut self,
        parent: Option<String>,
        tree: String,
        message: &str,
        counter: u64,
    ) -> String {
        let payload = format!(
            "{}\0{}\0{}\0{}",
            message,
            parent.as_deref().unwrap_or(""),
            tree,
            counter
        );
        let sha = object_sha("commit", payload.as_bytes());
        self.commits.insert(
            sha.clone(),
            MockCommit {
                parent,
                tree,
                message: message.to_string(),
            },
        );
        sha
    }

    /// Resolve a branch name or commit SHA to its tree.
    fn tree_for(&self, reference: &str) -> Result<&BTreeMap<String, String>, StoreError> {
        let commit_sha = match self.branches.get(reference) {
            Some(head) => head.as_str(),
            None => reference,
        };
        let commit = self
            .commits
            .get(commit_sha)
            .ok_or_else(|| StoreError::NotFound(format!("no commit or branch '{}'", reference)))?;
        self.trees
            .get(&commit.tree)
            .ok_or_else(|| StoreError::NotFound(format!("tree for '{}' missing", reference)))
    }

    /// True when `ancestor` is reachable from `descendant` (or equal).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut cursor = Some(descendant.to_string());
        while let Some(sha) = cursor {
            if sha == ancestor {
                return true;
            }
            cursor = self.commits.get(&sha).and_then(|c| c.parent.clone());
        }
        false
    }

    /// Server-side overlay commit: how the contents API applies a
    /// single-file write or delete. Advances the branch head directly.
    fn overlay_commit(
        &mut self,
        branch: &str,
        message: &str,
        path: &str,
        blob: Option<String>,
        counter: u64,
    ) -> Result<String, StoreError> {
        let head = self
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("branch '{}' not found", branch)))?;
        let base_tree = self
            .commits
            .get(&head)
            .map(|c| c.tree.clone())
            .ok_or_else(|| StoreError::NotFound(format!("head commit of '{}' missing", branch)))?;
        let mut entries = self
            .trees
            .get(&base_tree)
            .cloned()
            .unwrap_or_default();
        match blob {
            Some(sha) => {
                entries.insert(path.to_string(), sha);
            }
            None => {
                entries.remove(path);
            }
        }
        let tree = self.insert_tree(entries);
        let commit = self.insert_commit(Some(head), tree, message, counter);
        self.branches.insert(branch.to_string(), commit.clone());
        Ok(commit)
    }
}

impl Inner {
    fn repo(&self, repo: &RepoRef) -> Result<&RepoState, StoreError> {
        self.repos
            .get(&repo.to_string())
            .ok_or_else(|| StoreError::NotFound(format!("repository '{}' not found", repo)))
    }

    fn repo_mut(&mut self, repo: &RepoRef) -> Result<&mut RepoState, StoreError> {
        self.repos
            .get_mut(&repo.to_string())
            .ok_or_else(|| StoreError::NotFound(format!("repository '{}' not found", repo)))
    }

    fn next_counter(&mut self) -> u64 {
        self.commit_counter += 1;
        self.commit_counter
    }

    fn check_fail(&self, call: StoreCall) -> Result<(), StoreError> {
        match &self.fail_on {
            Some((failing, error)) if *failing == call => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

impl MockStore {
    /// Create a new empty mock store, authenticated as `mock-user`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                login: "mock-user".to_string(),
                repos: BTreeMap::new(),
                fail_on: None,
                operations: Vec::new(),
                commit_counter: 0,
            })),
        }
    }

    /// Add a repository with an initial empty commit on `default_branch`.
    ///
    /// Returns the initial head SHA.
    pub fn add_repo(&self, owner: &str, name: &str, default_branch: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        let counter = inner.next_counter();
        let mut state = RepoState::new(owner, name, default_branch);
        let tree = state.insert_tree(BTreeMap::new());
        let head = state.insert_commit(None, tree, "initial commit", counter);
        state.branches.insert(default_branch.to_string(), head.clone());
        inner.repos.insert(format!("{}/{}", owner, name), state);
        head
    }

    /// Commit one file directly to `branch`, bypassing recording.
    ///
    /// Test setup helper; also doubles as the "concurrent writer" in race
    /// tests. Returns the new head SHA.
    pub fn seed_file(&self, repo: &RepoRef, branch: &str, path: &str, content: &[u8]) -> String {
        let mut inner = self.inner.lock().unwrap();
        let counter = inner.next_counter();
        let state = inner
            .repo_mut(repo)
            .expect("seed_file: repository must exist");
        let blob = state.insert_blob(content);
        state
            .overlay_commit(branch, "seed", path, Some(blob), counter)
            .expect("seed_file: branch must exist")
    }

    /// Change a repository's configured default branch (the branch must exist).
    pub fn set_default_branch(&self, repo: &RepoRef, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .repo_mut(repo)
            .expect("set_default_branch: repository must exist");
        assert!(
            state.branches.contains_key(name),
            "set_default_branch: branch must exist"
        );
        state.default_branch = name.to_string();
    }

    /// Configure one call site to fail with the given error.
    pub fn fail_on(self, call: StoreCall, error: StoreError) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some((call, error));
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// All recorded trait calls, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Clear recorded trait calls.
    pub fn clear_operations(&self) {
        self.inner.lock().unwrap().operations.clear();
    }

    /// Current head of a branch, for verification.
    pub fn branch_head(&self, repo: &RepoRef, branch: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.repo(repo).ok()?.branches.get(branch).cloned()
    }

    /// Bytes of a file at a branch head, for verification.
    pub fn file_bytes(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let state = inner.repo(repo).ok()?;
        let tree = state.tree_for(branch).ok()?;
        let blob = tree.get(path)?;
        state.blobs.get(blob).cloned()
    }

    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn authenticated_user(&self) -> Result<Account, StoreError> {
        self.record(MockOperation::AuthenticatedUser);
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::AuthenticatedUser)?;
        Ok(Account {
            login: inner.login.clone(),
            name: None,
        })
    }

    async fn list_repositories(&self, owner: Option<&str>) -> Result<Vec<Repository>, StoreError> {
        self.record(MockOperation::ListRepositories {
            owner: owner.map(String::from),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::ListRepositories)?;
        Ok(inner
            .repos
            .values()
            .filter(|state| owner.map_or(true, |o| state.owner == o))
            .map(|state| Repository {
                name: state.name.clone(),
                full_name: format!("{}/{}", state.owner, state.name),
                default_branch: state.default_branch.clone(),
                private: false,
                description: None,
                updated_at: None,
            })
            .collect())
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, StoreError> {
        self.record(MockOperation::GetRepository {
            repo: repo.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::GetRepository)?;
        let state = inner.repo(repo)?;
        Ok(Repository {
            name: state.name.clone(),
            full_name: repo.to_string(),
            default_branch: state.default_branch.clone(),
            private: false,
            description: None,
            updated_at: None,
        })
    }

    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<Branch>, StoreError> {
        self.record(MockOperation::ListBranches {
            repo: repo.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::ListBranches)?;
        let state = inner.repo(repo)?;
        Ok(state
            .branches
            .iter()
            .map(|(name, head)| Branch {
                name: name.clone(),
                head: head.clone(),
            })
            .collect())
    }

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, StoreError> {
        self.record(MockOperation::GetBranch {
            repo: repo.to_string(),
            name: name.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::GetBranch)?;
        let state = inner.repo(repo)?;
        let head = state
            .branches
            .get(name)
            .ok_or_else(|| StoreError::NotFound(format!("branch '{}' not found", name)))?;
        Ok(Branch {
            name: name.to_string(),
            head: head.clone(),
        })
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), StoreError> {
        self.record(MockOperation::CreateBranch {
            repo: repo.to_string(),
            name: name.to_string(),
            from_sha: from_sha.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::CreateBranch)?;
        let state = inner.repo_mut(repo)?;
        if state.branches.contains_key(name) {
            return Err(StoreError::Conflict(format!(
                "branch '{}' already exists",
                name
            )));
        }
        if !state.commits.contains_key(from_sha) {
            return Err(StoreError::NotFound(format!("no commit '{}'", from_sha)));
        }
        state.branches.insert(name.to_string(), from_sha.to_string());
        Ok(())
    }

    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, StoreError> {
        self.record(MockOperation::ListDir {
            repo: repo.to_string(),
            path: path.to_string(),
            reference: reference.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::ListDir)?;
        let state = inner.repo(repo)?;
        let tree = state.tree_for(reference)?;

        let path = path.trim_matches('/');
        // An exact file path lists as that single file.
        if let Some(blob) = tree.get(path) {
            let size = state.blobs.get(blob).map(|b| b.len() as u64);
            return Ok(vec![DirEntry {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                path: path.to_string(),
                kind: EntryKind::File,
                size,
                sha: blob.clone(),
            }]);
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };
        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        for (entry_path, blob) in tree {
            let Some(rest) = entry_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => {
                    let size = state.blobs.get(blob).map(|b| b.len() as u64);
                    files.push(DirEntry {
                        name: rest.to_string(),
                        path: entry_path.clone(),
                        kind: EntryKind::File,
                        size,
                        sha: blob.clone(),
                    });
                }
            }
        }
        if files.is_empty() && dirs.is_empty() && !path.is_empty() {
            return Err(StoreError::NotFound(format!("path '{}' not found", path)));
        }
        let mut entries: Vec<DirEntry> = dirs
            .into_iter()
            .map(|dir| DirEntry {
                sha: object_sha("dir", format!("{}{}", prefix, dir).as_bytes()),
                path: format!("{}{}", prefix, dir),
                name: dir,
                kind: EntryKind::Dir,
                size: None,
            })
            .collect();
        entries.extend(files);
        Ok(entries)
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<FileContent, StoreError> {
        self.record(MockOperation::GetFile {
            repo: repo.to_string(),
            path: path.to_string(),
            reference: reference.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::GetFile)?;
        let state = inner.repo(repo)?;
        let tree = state.tree_for(reference)?;
        let path = path.trim_matches('/');
        let blob = tree.get(path).ok_or_else(|| {
            // Distinguish a directory path from a missing one.
            let dir_prefix = format!("{}/", path);
            if tree.keys().any(|p| p.starts_with(&dir_prefix)) {
                StoreError::Validation(format!("'{}' is a directory, not a file", path))
            } else {
                StoreError::NotFound(format!("file '{}' not found at '{}'", path, reference))
            }
        })?;
        let content = state.blobs.get(blob).cloned().unwrap_or_default();
        Ok(FileContent {
            path: path.to_string(),
            sha: blob.clone(),
            size: content.len() as u64,
            content,
        })
    }

    async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<WriteResult, StoreError> {
        self.record(MockOperation::PutFile {
            repo: repo.to_string(),
            path: path.to_string(),
            branch: branch.to_string(),
            expected: expected.map(String::from),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::PutFile)?;
        let counter = inner.next_counter();
        let state = inner.repo_mut(repo)?;
        let current = state.tree_for(branch)?.get(path).cloned();
        match (expected, current.as_deref()) {
            (None, Some(_)) => {
                return Err(StoreError::Conflict(format!(
                    "file '{}' already exists; its fingerprint is required to update",
                    path
                )))
            }
            (Some(_), None) => {
                return Err(StoreError::NotFound(format!(
                    "file '{}' does not exist on '{}'",
                    path, branch
                )))
            }
            (Some(exp), Some(cur)) if exp != cur => {
                return Err(StoreError::Conflict(format!(
                    "fingerprint for '{}' does not match current content",
                    path
                )))
            }
            _ => {}
        }
        let blob = state.insert_blob(content);
        let commit = state.overlay_commit(branch, message, path, Some(blob.clone()), counter)?;
        Ok(WriteResult {
            commit_sha: commit,
            content_sha: Some(blob),
        })
    }

    async fn delete_file(
        &self,
        repo: &RepoRef,
        path: &str,
        message: &str,
        branch: &str,
        sha: &str,
    ) -> Result<WriteResult, StoreError> {
        self.record(MockOperation::DeleteFile {
            repo: repo.to_string(),
            path: path.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::DeleteFile)?;
        let counter = inner.next_counter();
        let state = inner.repo_mut(repo)?;
        let current = state.tree_for(branch)?.get(path).cloned();
        match current {
            None => {
                return Err(StoreError::NotFound(format!(
                    "file '{}' does not exist on '{}'",
                    path, branch
                )))
            }
            Some(cur) if cur != sha => {
                return Err(StoreError::Conflict(format!(
                    "fingerprint for '{}' does not match current content",
                    path
                )))
            }
            Some(_) => {}
        }
        let commit = state.overlay_commit(branch, message, path, None, counter)?;
        Ok(WriteResult {
            commit_sha: commit,
            content_sha: None,
        })
    }

    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, StoreError> {
        self.record(MockOperation::GetCommit {
            repo: repo.to_string(),
            sha: sha.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::GetCommit)?;
        let state = inner.repo(repo)?;
        let commit = state
            .commits
            .get(sha)
            .ok_or_else(|| StoreError::NotFound(format!("no commit '{}'", sha)))?;
        Ok(CommitInfo {
            sha: sha.to_string(),
            tree: commit.tree.clone(),
        })
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, StoreError> {
        self.record(MockOperation::CreateTree {
            repo: repo.to_string(),
            base_tree: base_tree.to_string(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::CreateTree)?;
        let state = inner.repo_mut(repo)?;
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("no tree '{}'", base_tree)))?;
        for entry in entries {
            let blob = state.insert_blob(&entry.content);
            tree.insert(entry.path.clone(), blob);
        }
        Ok(state.insert_tree(tree))
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        parent: &str,
        tree: &str,
    ) -> Result<String, StoreError> {
        self.record(MockOperation::CreateCommit {
            repo: repo.to_string(),
            parent: parent.to_string(),
            message: message.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::CreateCommit)?;
        let counter = inner.next_counter();
        let state = inner.repo_mut(repo)?;
        if !state.commits.contains_key(parent) {
            return Err(StoreError::NotFound(format!("no commit '{}'", parent)));
        }
        if !state.trees.contains_key(tree) {
            return Err(StoreError::NotFound(format!("no tree '{}'", tree)));
        }
        Ok(state.insert_commit(Some(parent.to_string()), tree.to_string(), message, counter))
    }

    async fn update_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<(), StoreError> {
        self.record(MockOperation::UpdateRef {
            repo: repo.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::UpdateRef)?;
        let state = inner.repo_mut(repo)?;
        let head = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("branch '{}' not found", branch)))?;
        if !state.commits.contains_key(sha) {
            return Err(StoreError::NotFound(format!("no commit '{}'", sha)));
        }
        // The compare-and-swap: refuse anything but a fast forward.
        if !state.is_ancestor(&head, sha) {
            return Err(StoreError::Conflict(format!(
                "update of '{}' is not a fast forward",
                branch
            )));
        }
        state.branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, StoreError> {
        self.record(MockOperation::CreatePullRequest {
            repo: repo.to_string(),
            head: request.head.clone(),
            base: request.base.clone(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.check_fail(StoreCall::CreatePullRequest)?;
        let full_name = repo.to_string();
        let state = inner.repo_mut(repo)?;
        for branch in [&request.head, &request.base] {
            if !state.branches.contains_key(branch.as_str()) {
                return Err(StoreError::NotFound(format!(
                    "branch '{}' not found",
                    branch
                )));
            }
        }
        let number = state.pulls.len() as u64 + 1;
        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/pull/{}", full_name, number),
            title: request.title,
            state: "open".to_string(),
        };
        state.pulls.push(pr.clone());
        Ok(pr)
    }
}
