//! cli::commands
//!
//! Command handlers: translate parsed arguments into [`crate::ops`] calls
//! and print the outcome.
//!
//! Every command (except `cat`, which streams raw bytes) prints one JSON
//! envelope to stdout: `{"ok": true, ...}` on success, or
//! `{"ok": false, "kind": ..., "message": ...}` on failure, where `kind` is
//! the [`ErrorKind`] classification. Logs go to stderr; stdout stays
//! machine-readable.
//!
//! [`ErrorKind`]: crate::store::ErrorKind

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde_json::{json, Value};

use super::args::Command;
use crate::ops;
use crate::store::{CreatePullRequest, FileChange, ObjectStore, RepoRef, StoreError};

#[derive(Debug)]
enum Output {
    /// A JSON envelope body (merged under `"ok": true`).
    Json(Value),
    /// Raw bytes for stdout, no envelope.
    Raw(Vec<u8>),
}

/// Execute a command against the store and print the result.
pub async fn dispatch(command: Command, store: &dyn ObjectStore) -> ExitCode {
    match run(command, store).await {
        Ok(Output::Json(body)) => {
            println!("{}", envelope(true, body));
            ExitCode::SUCCESS
        }
        Ok(Output::Raw(bytes)) => {
            let mut stdout = std::io::stdout().lock();
            if stdout.write_all(&bytes).and_then(|_| stdout.flush()).is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!(
                "{}",
                envelope(
                    false,
                    json!({
                        "kind": err.kind(),
                        "message": err.to_string(),
                    })
                )
            );
            ExitCode::FAILURE
        }
    }
}

fn envelope(ok: bool, body: Value) -> String {
    let mut map = serde_json::Map::new();
    map.insert("ok".to_string(), Value::Bool(ok));
    if let Value::Object(extra) = body {
        map.extend(extra);
    }
    serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_else(|_| String::from("{}"))
}

async fn run(command: Command, store: &dyn ObjectStore) -> Result<Output, StoreError> {
    match command {
        Command::Whoami => {
            let account = ops::check_connection(store).await?;
            Ok(Output::Json(json!({ "account": account })))
        }

        Command::Repos { owner } => {
            let repos = store.list_repositories(owner.as_deref()).await?;
            Ok(Output::Json(json!({
                "count": repos.len(),
                "repositories": repos,
            })))
        }

        Command::Branches { repo } => {
            let repo = RepoRef::parse(&repo)?;
            let branches = store.list_branches(&repo).await?;
            Ok(Output::Json(json!({ "branches": branches })))
        }

        Command::Ls { repo, path, branch } => {
            let repo = RepoRef::parse(&repo)?;
            let entries = ops::list_dir(store, &repo, &path, branch.as_deref()).await?;
            Ok(Output::Json(json!({ "entries": entries })))
        }

        Command::Cat { repo, path, branch } => {
            let repo = RepoRef::parse(&repo)?;
            let file = ops::read_file(store, &repo, &path, branch.as_deref()).await?;
            Ok(Output::Raw(file.content))
        }

        Command::Put {
            repo,
            path,
            file,
            message,
            branch,
            sha,
        } => {
            let repo = RepoRef::parse(&repo)?;
            let content = read_local(&file)?;
            let written = ops::put_file(
                store,
                &repo,
                &path,
                &content,
                &message,
                branch.as_deref(),
                sha,
            )
            .await?;
            Ok(Output::Json(to_body(&written)?))
        }

        Command::Rm {
            repo,
            path,
            message,
            branch,
            sha,
        } => {
            let repo = RepoRef::parse(&repo)?;
            let deleted =
                ops::delete_file(store, &repo, &path, &message, branch.as_deref(), sha).await?;
            Ok(Output::Json(to_body(&deleted)?))
        }

        Command::Commit {
            repo,
            message,
            branch,
            files,
        } => {
            let repo = RepoRef::parse(&repo)?;
            let mut changes = Vec::with_capacity(files.len());
            for spec in &files {
                let (path, local) = parse_change_spec(spec)?;
                changes.push(FileChange::new(path, read_local(&local)?));
            }
            let outcome =
                ops::commit_files(store, &repo, &message, branch.as_deref(), &changes).await?;
            Ok(Output::Json(to_body(&outcome)?))
        }

        Command::Branch { repo, name, from } => {
            let repo = RepoRef::parse(&repo)?;
            let branch = ops::create_branch(store, &repo, &name, from.as_deref()).await?;
            Ok(Output::Json(json!({ "branch": branch })))
        }

        Command::Pr {
            repo,
            title,
            body,
            head,
            base,
        } => {
            let repo = RepoRef::parse(&repo)?;
            let base = match base {
                Some(base) => base,
                None => ops::resolve_branch(store, &repo, None).await?.name,
            };
            let pr = store
                .create_pull_request(
                    &repo,
                    CreatePullRequest {
                        title,
                        body,
                        head,
                        base,
                    },
                )
                .await?;
            Ok(Output::Json(json!({ "pull_request": pr })))
        }
    }
}

/// Parse a `REPO_PATH=LOCAL_PATH` change specification.
fn parse_change_spec(spec: &str) -> Result<(String, PathBuf), StoreError> {
    match spec.split_once('=') {
        Some((path, local)) if !path.is_empty() && !local.is_empty() => {
            Ok((path.to_string(), PathBuf::from(local)))
        }
        _ => Err(StoreError::Validation(format!(
            "expected file as 'REPO_PATH=LOCAL_PATH', got '{}'",
            spec
        ))),
    }
}

fn read_local(path: &Path) -> Result<Vec<u8>, StoreError> {
    std::fs::read(path)
        .map_err(|err| StoreError::Validation(format!("cannot read '{}': {}", path.display(), err)))
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|err| StoreError::Validation(format!("cannot encode result: {}", err)))
}
