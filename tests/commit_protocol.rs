//! Protocol properties of the multi-file commit and single-file mutation,
//! exercised end to end over the in-memory store.

use treetop::ops;
use treetop::store::mock::{MockOperation, MockStore};
use treetop::store::{FileChange, ObjectStore, RepoRef, StoreError, TreeEntry};

fn repo() -> RepoRef {
    RepoRef::new("octo", "demo")
}

fn store_with_repo() -> MockStore {
    let store = MockStore::new();
    store.add_repo("octo", "demo", "main");
    store
}

fn change(path: &str, content: &[u8]) -> FileChange {
    FileChange::new(path, content.to_vec())
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn all_files_land_in_one_commit() {
        let store = store_with_repo();
        store.seed_file(&repo(), "main", "unrelated.txt", b"old");

        let outcome = ops::commit_files(
            &store,
            &repo(),
            "three files",
            Some("main"),
            &[
                change("a.txt", b"A"),
                change("docs/b.md", b"B"),
                change("docs/deep/c.md", b"C"),
            ],
        )
        .await
        .unwrap();

        // One head advance; every path readable at it; unrelated file intact.
        assert_eq!(store.branch_head(&repo(), "main").unwrap(), outcome.commit_sha);
        for (path, content) in [
            ("a.txt", b"A".as_slice()),
            ("docs/b.md", b"B"),
            ("docs/deep/c.md", b"C"),
            ("unrelated.txt", b"old"),
        ] {
            assert_eq!(store.file_bytes(&repo(), "main", path).unwrap(), content);
        }
    }

    #[tokio::test]
    async fn protocol_issues_exactly_one_tree_commit_and_ref_update() {
        let store = store_with_repo();
        ops::commit_files(
            &store,
            &repo(),
            "msg",
            Some("main"),
            &[change("a.txt", b"A"), change("b.txt", b"B")],
        )
        .await
        .unwrap();

        let ops_log = store.operations();
        let count = |pred: fn(&MockOperation) -> bool| ops_log.iter().filter(|op| pred(op)).count();
        assert_eq!(
            count(|op| matches!(op, MockOperation::CreateTree { .. })),
            1
        );
        assert_eq!(
            count(|op| matches!(op, MockOperation::CreateCommit { .. })),
            1
        );
        assert_eq!(
            count(|op| matches!(op, MockOperation::UpdateRef { .. })),
            1
        );
        // The ref update is the last call: nothing becomes reachable before it.
        assert!(matches!(
            ops_log.last().unwrap(),
            MockOperation::UpdateRef { .. }
        ));
    }

    #[tokio::test]
    async fn tree_overlays_the_observed_base() {
        let store = store_with_repo();
        store.seed_file(&repo(), "main", "a.txt", b"v1");

        ops::commit_files(&store, &repo(), "msg", Some("main"), &[change("a.txt", b"v2")])
            .await
            .unwrap();
        assert_eq!(store.file_bytes(&repo(), "main", "a.txt").unwrap(), b"v2");

        let base_tree_used = store.operations().iter().find_map(|op| match op {
            MockOperation::CreateTree { base_tree, .. } => Some(base_tree.clone()),
            _ => None,
        });
        assert!(base_tree_used.is_some());
    }
}

mod concurrency {
    use super::*;

    /// A writer that based its commit on head H0 loses once another writer
    /// advances the branch to H1; the branch stays at the winner.
    #[tokio::test]
    async fn stale_commit_loses_the_ref_race() {
        let store = store_with_repo();
        let h0 = store.branch_head(&repo(), "main").unwrap();

        // Slow writer reads its base at H0...
        let base = store.get_commit(&repo(), &h0).await.unwrap();

        // ...the fast writer lands first...
        let h1 = store.seed_file(&repo(), "main", "winner.txt", b"won");

        // ...and the slow writer finishes building on the stale base.
        let tree = store
            .create_tree(
                &repo(),
                &base.tree,
                &[TreeEntry {
                    path: "loser.txt".into(),
                    content: b"lost".to_vec(),
                }],
            )
            .await
            .unwrap();
        let stale = store
            .create_commit(&repo(), "stale", &h0, &tree)
            .await
            .unwrap();

        let err = store.update_ref(&repo(), "main", &stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The winner's state is untouched and the loser's file never appears.
        assert_eq!(store.branch_head(&repo(), "main").unwrap(), h1);
        assert!(store.file_bytes(&repo(), "main", "loser.txt").is_none());
        assert_eq!(store.file_bytes(&repo(), "main", "winner.txt").unwrap(), b"won");
    }

    /// Objects created by a losing attempt stay in the store, unreachable
    /// from any ref; no cleanup call exists or is needed.
    #[tokio::test]
    async fn losing_attempt_leaves_orphaned_objects_behind() {
        let store = store_with_repo();
        let h0 = store.branch_head(&repo(), "main").unwrap();
        let base = store.get_commit(&repo(), &h0).await.unwrap();
        store.seed_file(&repo(), "main", "winner.txt", b"won");

        let tree = store
            .create_tree(
                &repo(),
                &base.tree,
                &[TreeEntry {
                    path: "loser.txt".into(),
                    content: b"lost".to_vec(),
                }],
            )
            .await
            .unwrap();
        let stale = store
            .create_commit(&repo(), "stale", &h0, &tree)
            .await
            .unwrap();
        store.update_ref(&repo(), "main", &stale).await.unwrap_err();

        // The commit object still exists; it just is not reachable.
        let orphan = store.get_commit(&repo(), &stale).await.unwrap();
        assert_eq!(orphan.tree, tree);
    }

    #[tokio::test]
    async fn retry_after_conflict_succeeds_on_fresh_head() {
        let store = store_with_repo();
        let store_conflicted = store.clone().fail_on(
            treetop::store::mock::StoreCall::UpdateRef,
            StoreError::Conflict("update of 'main' is not a fast forward".into()),
        );
        let err = ops::commit_files(
            &store_conflicted,
            &repo(),
            "msg",
            Some("main"),
            &[change("a.txt", b"A")],
        )
        .await
        .unwrap_err();
        assert!(err.kind() == treetop::store::ErrorKind::Conflict);
        assert!(!err.is_retryable());

        // The caller's retry re-runs the whole protocol against the new head.
        store.clear_fail_on();
        let outcome = ops::commit_files(
            &store,
            &repo(),
            "msg",
            Some("main"),
            &[change("a.txt", b"A")],
        )
        .await
        .unwrap();
        assert_eq!(store.branch_head(&repo(), "main").unwrap(), outcome.commit_sha);
    }
}

mod optimistic_concurrency {
    use super::*;

    #[tokio::test]
    async fn supplied_stale_fingerprint_fails_even_if_refreshable() {
        let store = store_with_repo();
        store.seed_file(&repo(), "main", "a.txt", b"v1");
        let stale = store.get_file(&repo(), "a.txt", "main").await.unwrap().sha;
        store.seed_file(&repo(), "main", "a.txt", b"v2");

        // The supplied token is used as-is; no silent refresh.
        let err = ops::put_file(&store, &repo(), "a.txt", b"v3", "edit", None, Some(stale))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.file_bytes(&repo(), "main", "a.txt").unwrap(), b"v2");
    }

    #[tokio::test]
    async fn unsupplied_fingerprint_is_read_exactly_once() {
        let store = store_with_repo();
        store.seed_file(&repo(), "main", "a.txt", b"v1");
        store.clear_operations();

        ops::put_file(&store, &repo(), "a.txt", b"v2", "edit", Some("main"), None)
            .await
            .unwrap();

        let reads = store
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::GetFile { .. }))
            .count();
        assert_eq!(reads, 1);
    }

    #[tokio::test]
    async fn delete_without_establishable_fingerprint_is_not_found() {
        let store = store_with_repo();
        let err = ops::delete_file(&store, &repo(), "ghost.txt", "rm", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_where_file_appeared_concurrently_conflicts() {
        let store = store_with_repo();
        // The establishing read saw nothing, but the file exists by the time
        // the create reaches the store: the store-side precondition catches it.
        store
            .put_file(&repo(), "a.txt", b"mine", "add", "main", None)
            .await
            .unwrap();
        let result = store
            .put_file(&repo(), "a.txt", b"theirs", "add again", "main", None)
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn empty_change_set_never_reaches_the_store() {
        let store = store_with_repo();
        let err = ops::commit_files(&store, &repo(), "msg", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn duplicate_and_malformed_paths_never_reach_the_store() {
        let store = store_with_repo();
        for changes in [
            vec![change("a.txt", b"1"), change("a.txt", b"2")],
            vec![change("/abs.txt", b"1")],
            vec![change("", b"1")],
        ] {
            let err = ops::commit_files(&store, &repo(), "msg", None, &changes)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert!(store.operations().is_empty());
    }
}

mod branch_resolution {
    use super::*;

    #[tokio::test]
    async fn default_branch_change_redirects_subsequent_commits() {
        let store = store_with_repo();
        let head = store.branch_head(&repo(), "main").unwrap();
        store.create_branch(&repo(), "develop", &head).await.unwrap();

        ops::commit_files(&store, &repo(), "on default", None, &[change("a.txt", b"1")])
            .await
            .unwrap();
        assert!(store.file_bytes(&repo(), "main", "a.txt").is_some());

        store.set_default_branch(&repo(), "develop");
        ops::commit_files(&store, &repo(), "on new default", None, &[change("b.txt", b"2")])
            .await
            .unwrap();
        assert!(store.file_bytes(&repo(), "develop", "b.txt").is_some());
        assert!(store.file_bytes(&repo(), "main", "b.txt").is_none());
    }

    #[tokio::test]
    async fn commits_on_a_feature_branch_leave_the_default_alone() {
        let store = store_with_repo();
        let feature = ops::create_branch(&store, &repo(), "feature", None)
            .await
            .unwrap();
        assert_eq!(feature.name, "feature");

        ops::commit_files(
            &store,
            &repo(),
            "msg",
            Some("feature"),
            &[change("f.txt", b"F")],
        )
        .await
        .unwrap();
        assert!(store.file_bytes(&repo(), "feature", "f.txt").is_some());
        assert!(store.file_bytes(&repo(), "main", "f.txt").is_none());
    }
}

mod content_fidelity {
    use super::*;

    #[tokio::test]
    async fn binary_content_round_trips_exactly() {
        let store = store_with_repo();
        let payload: Vec<u8> = vec![0x00, 0xFF, 0x7F, 0x80, 0x0A, 0x00, 0xC3, 0x28];

        ops::commit_files(
            &store,
            &repo(),
            "binary",
            Some("main"),
            &[change("blob.bin", &payload)],
        )
        .await
        .unwrap();

        let read = ops::read_file(&store, &repo(), "blob.bin", Some("main"))
            .await
            .unwrap();
        assert_eq!(read.content, payload);
        assert_eq!(read.size, payload.len() as u64);
    }

    #[tokio::test]
    async fn single_file_put_round_trips_binary() {
        let store = store_with_repo();
        let payload = vec![0u8, 159, 146, 150];
        ops::put_file(&store, &repo(), "b.bin", &payload, "add", None, None)
            .await
            .unwrap();
        let read = ops::read_file(&store, &repo(), "b.bin", None).await.unwrap();
        assert_eq!(read.content, payload);
    }
}
