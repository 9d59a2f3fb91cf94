//! store::github
//!
//! GitHub implementation of the [`ObjectStore`] trait over the REST API.
//!
//! # Design
//!
//! Each trait method maps to one REST call:
//!
//! - contents API (`/repos/{o}/{r}/contents/...`) for directory listings,
//!   file reads, and single-file writes/deletes
//! - Git data API (`/repos/{o}/{r}/git/...`) for refs, commits, trees, and
//!   blobs — the primitives the commit builder orchestrates
//!
//! # Content encoding
//!
//! File content is opaque bytes. The REST transport carries it as base64:
//! reads decode, writes encode, and nothing in between reinterprets the
//! bytes. Tree entries whose content is valid UTF-8 travel inline in the
//! tree-creation body; anything else goes through an explicit blob creation
//! and is referenced by SHA.
//!
//! # Error classification
//!
//! 401/403 map to auth failures, 404 to `NotFound`, 409 to `Conflict`,
//! 429 to `RateLimited`. 422 is `Conflict` only when the response message
//! indicates a failed fast-forward or fingerprint precondition; other 422s
//! stay `ApiError`. No call is retried here — retry policy belongs to the
//! caller (see [`StoreError::is_retryable`]).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    Account, Branch, CommitInfo, CreatePullRequest, DirEntry, EntryKind, FileContent, ObjectStore,
    PullRequest, RepoRef, Repository, StoreError, TreeEntry, WriteResult,
};
use crate::config::Config;

/// Mode string for a regular (non-executable) file tree entry.
const REGULAR_FILE_MODE: &str = "100644";

/// GitHub object store client.
///
/// Holds the HTTP client and an explicit [`Config`]; there is no process-wide
/// credential state, so tests can construct one store per case.
pub struct GitHubStore {
    /// HTTP client for making requests
    client: Client,
    /// Explicit configuration (token, API base, user agent)
    config: Config,
}

// Custom Debug to avoid exposing the token.
impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("api_base", &self.config.api_base)
            .field("user_agent", &self.config.user_agent)
            .finish()
    }
}

impl GitHubStore {
    /// Create a store from an explicit configuration.
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.config.token))
            .map_err(|_| StoreError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let ua = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|_| StoreError::Validation("user agent contains invalid characters".into()))?;
        headers.insert(USER_AGENT, ua);
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_base, repo.owner, repo.name, path
        )
    }

    /// Issue a request with no body and parse the JSON response.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: &str,
    ) -> Result<T, StoreError> {
        debug!(%method, %url, "store request");
        let response = self
            .client
            .request(method, url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Issue a request with a JSON body and parse the JSON response.
    async fn request_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, StoreError> {
        debug!(%method, %url, "store request");
        let response = self
            .client
            .request(method, url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Handle an API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, StoreError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| StoreError::ApiError {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            })
        } else {
            Err(self.classify_error(response, status).await)
        }
    }

    /// Map an error response onto the [`StoreError`] taxonomy.
    async fn classify_error(&self, response: Response, status: StatusCode) -> StoreError {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => StoreError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => StoreError::AuthFailed(format!("permission denied: {}", message)),
            StatusCode::NOT_FOUND => StoreError::NotFound(message),
            StatusCode::CONFLICT => StoreError::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY => {
                // The Git data API reports failed preconditions as 422:
                // a non-fast-forward ref update, or a contents write whose
                // fingerprint expectation does not hold.
                let lowered = message.to_lowercase();
                if lowered.contains("fast forward")
                    || lowered.contains("does not match")
                    || lowered.contains("sha")
                {
                    StoreError::Conflict(message)
                } else {
                    StoreError::ApiError {
                        status: status.as_u16(),
                        message,
                    }
                }
            }
            StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited,
            _ if status.is_server_error() => StoreError::ApiError {
                status: status.as_u16(),
                message: format!("server error: {}", message),
            },
            _ => StoreError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Create a blob from raw bytes, returning its SHA.
    async fn create_blob(&self, repo: &RepoRef, content: &[u8]) -> Result<String, StoreError> {
        let url = self.repo_url(repo, "git/blobs");
        let body = CreateBlobBody {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let created: ShaObject = self.request_json(Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    /// Fetch a blob's bytes by SHA (used when the contents API truncates).
    async fn get_blob(&self, repo: &RepoRef, sha: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.repo_url(repo, &format!("git/blobs/{}", sha));
        let blob: BlobResponse = self.request(Method::GET, &url).await?;
        decode_base64_content(&blob.content)
    }
}

/// Decode base64 content as returned by the API (with embedded newlines).
fn decode_base64_content(raw: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact.as_bytes()).map_err(|e| StoreError::ApiError {
        status: 0,
        message: format!("invalid base64 content in response: {}", e),
    })
}

#[async_trait]
impl ObjectStore for GitHubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn authenticated_user(&self) -> Result<Account, StoreError> {
        let url = format!("{}/user", self.config.api_base);
        let user: UserResponse = self.request(Method::GET, &url).await?;
        Ok(Account {
            login: user.login,
            name: user.name,
        })
    }

    async fn list_repositories(&self, owner: Option<&str>) -> Result<Vec<Repository>, StoreError> {
        let url = match owner {
            Some(owner) => format!("{}/users/{}/repos", self.config.api_base, owner),
            None => format!("{}/user/repos", self.config.api_base),
        };
        let url = format!("{}?sort=updated&direction=desc&per_page=100", url);
        let repos: Vec<RepositoryResponse> = self.request(Method::GET, &url).await?;
        Ok(repos.into_iter().map(Into::into).collect())
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, StoreError> {
        let url = format!("{}/repos/{}/{}", self.config.api_base, repo.owner, repo.name);
        let found: RepositoryResponse = self.request(Method::GET, &url).await?;
        Ok(found.into())
    }

    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<Branch>, StoreError> {
        let url = self.repo_url(repo, "branches?per_page=100");
        let branches: Vec<BranchResponse> = self.request(Method::GET, &url).await?;
        Ok(branches
            .into_iter()
            .map(|b| Branch {
                name: b.name,
                head: b.commit.sha,
            })
            .collect())
    }

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, StoreError> {
        let url = self.repo_url(repo, &format!("git/ref/heads/{}", name));
        let found: RefResponse = self.request(Method::GET, &url).await?;
        Ok(Branch {
            name: name.to_string(),
            head: found.object.sha,
        })
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), StoreError> {
        let url = self.repo_url(repo, "git/refs");
        let body = CreateRefBody {
            r#ref: format!("refs/heads/{}", name),
            sha: from_sha,
        };
        let _: RefResponse = self.request_json(Method::POST, &url, &body).await?;
        Ok(())
    }

    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, StoreError> {
        let url = self.repo_url(
            repo,
            &format!("contents/{}?ref={}", path.trim_start_matches('/'), reference),
        );
        // A directory comes back as an array, a single file as an object.
        let value: serde_json::Value = self.request(Method::GET, &url).await?;
        let items: Vec<ContentsEntry> = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|item| vec![item])
        }
        .map_err(|e| StoreError::ApiError {
            status: 0,
            message: format!("failed to parse contents listing: {}", e),
        })?;

        Ok(items
            .into_iter()
            .map(|item| {
                let kind = match item.kind.as_str() {
                    "file" => EntryKind::File,
                    "dir" => EntryKind::Dir,
                    _ => EntryKind::Other,
                };
                DirEntry {
                    name: item.name,
                    path: item.path,
                    size: (kind == EntryKind::File).then_some(item.size),
                    kind,
                    sha: item.sha,
                }
            })
            .collect())
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<FileContent, StoreError> {
        let url = self.repo_url(
            repo,
            &format!("contents/{}?ref={}", path.trim_start_matches('/'), reference),
        );
        let value: serde_json::Value = self.request(Method::GET, &url).await?;
        if value.is_array() {
            return Err(StoreError::Validation(format!(
                "'{}' is a directory, not a file",
                path
            )));
        }
        let file: FileResponse = serde_json::from_value(value).map_err(|e| StoreError::ApiError {
            status: 0,
            message: format!("failed to parse file response: {}", e),
        })?;
        if file.kind != "file" {
            return Err(StoreError::Validation(format!(
                "'{}' is a {}, not a file",
                path, file.kind
            )));
        }

        // Large files come back with encoding "none" and empty content;
        // fall back to the blob endpoint, which always serves base64.
        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(raw)) => decode_base64_content(raw)?,
            _ => self.get_blob(repo, &file.sha).await?,
        };

        Ok(FileContent {
            path: file.path,
            sha: file.sha,
            size: file.size,
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
        let url = self.repo_url(repo, &format!("contents/{}", path.trim_start_matches('/')));
        let body = PutContentsBody {
            message,
            content: BASE64.encode(content),
            branch,
            sha: expected,
        };
        let written: ContentsWriteResponse = self.request_json(Method::PUT, &url, &body).await?;
        Ok(WriteResult {
            commit_sha: written.commit.sha,
            content_sha: written.content.map(|c| c.sha),
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
        let url = self.repo_url(repo, &format!("contents/{}", path.trim_start_matches('/')));
        let body = DeleteContentsBody {
            message,
            branch,
            sha,
        };
        let written: ContentsWriteResponse =
            self.request_json(Method::DELETE, &url, &body).await?;
        Ok(WriteResult {
            commit_sha: written.commit.sha,
            content_sha: None,
        })
    }

    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, StoreError> {
        let url = self.repo_url(repo, &format!("git/commits/{}", sha));
        let commit: CommitResponse = self.request(Method::GET, &url).await?;
        Ok(CommitInfo {
            sha: commit.sha,
            tree: commit.tree.sha,
        })
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, StoreError> {
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let item = match std::str::from_utf8(&entry.content) {
                Ok(text) => TreeItemBody {
                    path: &entry.path,
                    mode: REGULAR_FILE_MODE,
                    kind: "blob",
                    content: Some(text.to_string()),
                    sha: None,
                },
                // Binary content cannot travel inline in the JSON tree body;
                // create a blob and reference it by SHA instead.
                Err(_) => {
                    let blob_sha = self.create_blob(repo, &entry.content).await?;
                    TreeItemBody {
                        path: &entry.path,
                        mode: REGULAR_FILE_MODE,
                        kind: "blob",
                        content: None,
                        sha: Some(blob_sha),
                    }
                }
            };
            items.push(item);
        }

        let url = self.repo_url(repo, "git/trees");
        let body = CreateTreeBody {
            base_tree,
            tree: items,
        };
        let created: ShaObject = self.request_json(Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        parent: &str,
        tree: &str,
    ) -> Result<String, StoreError> {
        let url = self.repo_url(repo, "git/commits");
        let body = CreateCommitBody {
            message,
            tree,
            parents: vec![parent],
        };
        let created: ShaObject = self.request_json(Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<(), StoreError> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{}", branch));
        // force is always false: the CAS check is the whole point.
        let body = UpdateRefBody { sha, force: false };
        let _: RefResponse = self.request_json(Method::PATCH, &url, &body).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, StoreError> {
        let url = self.repo_url(repo, "pulls");
        let body = CreatePullBody {
            title: &request.title,
            body: request.body.as_deref(),
            head: &request.head,
            base: &request.base,
        };
        let pr: PullResponse = self.request_json(Method::POST, &url, &body).await?;
        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url,
            title: pr.title,
            state: pr.state,
        })
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    name: String,
    full_name: String,
    default_branch: String,
    private: bool,
    description: Option<String>,
    updated_at: Option<String>,
}

impl From<RepositoryResponse> for Repository {
    fn from(r: RepositoryResponse) -> Self {
        Repository {
            name: r.name,
            full_name: r.full_name,
            default_branch: r.default_branch,
            private: r.private,
            description: r.description,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct BranchResponse {
    name: String,
    commit: ShaObject,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaObject,
}

#[derive(Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct FileResponse {
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
}

#[derive(Deserialize)]
struct ContentsWriteResponse {
    content: Option<ShaObject>,
    commit: ShaObject,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    title: String,
    state: String,
}

/// Request body for creating/updating a file via the contents API.
#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for deleting a file via the contents API.
#[derive(Serialize)]
struct DeleteContentsBody<'a> {
    message: &'a str,
    branch: &'a str,
    sha: &'a str,
}

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: String,
    encoding: &'a str,
}

/// One entry in a tree-creation body.
#[derive(Serialize)]
struct TreeItemBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// Request body for creating a tree on a base tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeItemBody<'a>>,
}

/// Request body for creating a commit object.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

/// Request body for a conditional ref update.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    r#ref: String,
    sha: &'a str,
}

/// Request body for opening a pull request.
#[derive(Serialize)]
struct CreatePullBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    head: &'a str,
    base: &'a str,
}
