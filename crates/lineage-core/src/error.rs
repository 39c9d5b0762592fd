//! Error types for `lineage-core`.
//!
//! Only the relationship service produces the user-facing kinds. Kinship
//! derivation and both layouts are total; they can fail only when the
//! underlying store does.

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;
use uuid::Uuid;

use crate::relationship::RelationshipType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(String),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  #[error("a {kind} relationship already exists between {person_a} and {person_b}")]
  Conflict {
    person_a: Uuid,
    person_b: Uuid,
    kind:     RelationshipType,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Stable machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  ValidationError,
  NotFound,
  Conflict,
  InternalError,
}

impl Error {
  pub fn code(&self) -> ErrorCode {
    match self {
      Self::Validation(_) => ErrorCode::ValidationError,
      Self::PersonNotFound(_) | Self::RelationshipNotFound(_) => ErrorCode::NotFound,
      Self::Conflict { .. } => ErrorCode::Conflict,
      Self::Store(_) => ErrorCode::InternalError,
    }
  }

  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
