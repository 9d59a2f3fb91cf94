//! store
//!
//! Abstraction over the remote object store (GitHub today).
//!
//! # Architecture
//!
//! The [`ObjectStore`] trait is the only boundary the rest of the crate
//! talks to. It exposes the Git data API primitives (blobs, trees, commits,
//! refs) plus the contents and repository surfaces built on them. Callers in
//! [`crate::ops`] compose those primitives into the commit protocol; they
//! never see HTTP.
//!
//! # Modules
//!
//! - `traits`: the `ObjectStore` trait, domain types, and [`StoreError`]
//! - [`github`]: REST implementation backed by reqwest
//! - [`mock`]: in-memory implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
