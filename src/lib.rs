//! Treetop - atomic multi-file commits against GitHub-hosted repositories
//!
//! Treetop is a client for remote Git hosting APIs built around one idea:
//! a multi-file change should land as exactly one commit, atomically, or not
//! at all. It composes the host's Git data API (trees, commits, refs) so the
//! only mutation is a guarded fast-forward ref update, and layers simple
//! optimistic concurrency over single-file edits.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, prints envelopes)
//! - [`ops`] - Protocol layer: branch resolution, the commit protocol,
//!   optimistic single-file mutation
//! - [`store`] - The `ObjectStore` boundary with GitHub and mock
//!   implementations
//! - [`config`] - Explicit client configuration
//!
//! # Correctness Invariants
//!
//! 1. Multi-file commits are all-or-nothing: one tree, one commit, one
//!    fast-forward ref update
//! 2. Ref updates never force; a moved head fails with `Conflict`
//! 3. Input validation happens before any remote call
//! 4. File content is opaque bytes end to end

pub mod cli;
pub mod config;
pub mod ops;
pub mod store;
