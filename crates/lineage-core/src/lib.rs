//! Core types and the relationship graph engine for Lineage.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Relationships are typed edges over persons; kinship and both layouts are
//! derived from a fresh snapshot on every call and never cached.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod kinship;
pub mod layout;
pub mod memory;
pub mod partnership;
pub mod pedigree;
pub mod person;
pub mod relationship;
pub mod service;
pub mod store;

pub use error::{Error, ErrorCode, Result};
