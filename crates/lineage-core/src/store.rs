//! The `FamilyStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `lineage-store-sqlite`
//! and [`crate::memory::MemoryStore`]). The graph engine only needs set-based
//! bulk reads and single-row writes; it never issues one query per node.

use std::future::Future;

use uuid::Uuid;

use crate::{
  person::{NewPerson, Person},
  relationship::{NewRelationship, Relationship, RelationshipType},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`FamilyStore::find_relationships`].
///
/// Every non-empty filter must hold (AND). Empty filters are ignored, so the
/// default query matches every non-deleted relationship.
#[derive(Debug, Clone, Default)]
pub struct RelationshipQuery {
  /// Either endpoint is in this set.
  pub touching:        Vec<Uuid>,
  /// `person_a_id` (the parent, for parent-child types) is in this set.
  pub parents:         Vec<Uuid>,
  /// `person_b_id` (the child, for parent-child types) is in this set.
  pub children:        Vec<Uuid>,
  /// The edge joins this unordered pair.
  pub between:         Option<(Uuid, Uuid)>,
  pub types:           Vec<RelationshipType>,
  pub include_deleted: bool,
}

impl RelationshipQuery {
  pub fn touching(ids: impl IntoIterator<Item = Uuid>) -> Self {
    Self { touching: ids.into_iter().collect(), ..Self::default() }
  }

  pub fn between(a: Uuid, b: Uuid) -> Self {
    Self { between: Some((a, b)), ..Self::default() }
  }

  pub fn with_types(mut self, types: impl IntoIterator<Item = RelationshipType>) -> Self {
    self.types = types.into_iter().collect();
    self
  }

  /// The reference predicate. Backends that filter natively must agree with
  /// it.
  pub fn matches(&self, rel: &Relationship) -> bool {
    if rel.is_deleted() && !self.include_deleted {
      return false;
    }
    if !self.touching.is_empty()
      && !self.touching.contains(&rel.person_a_id)
      && !self.touching.contains(&rel.person_b_id)
    {
      return false;
    }
    if !self.parents.is_empty() && !self.parents.contains(&rel.person_a_id) {
      return false;
    }
    if !self.children.is_empty() && !self.children.contains(&rel.person_b_id) {
      return false;
    }
    if let Some((a, b)) = self.between
      && !rel.joins(a, b)
    {
      return false;
    }
    self.types.is_empty() || self.types.contains(&rel.kind)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a family-tree store backend.
///
/// Writes are not validated here; the relationship service enforces every
/// invariant before calling in. Rows are never hard-deleted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FamilyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Persons ───────────────────────────────────────────────────────────

  /// Create and persist a new person.
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Retrieve a person by UUID, including soft-deleted rows. Returns `None`
  /// if no such row exists.
  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Bulk-resolve persons. Soft-deleted and unknown ids are silently absent.
  fn get_persons(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// All non-deleted persons in insertion order.
  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Soft-delete a person. Returns `false` if the person was missing or
  /// already deleted.
  fn delete_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  /// Persist a new relationship. The store assigns id and timestamps.
  fn add_relationship(
    &self,
    input: NewRelationship,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  /// Retrieve a relationship by UUID, including soft-deleted rows.
  fn get_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  /// A page of non-deleted relationships plus the total non-deleted count.
  fn list_relationships(
    &self,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<(Vec<Relationship>, usize), Self::Error>> + Send + '_;

  /// Persist the mutable fields of `rel` (type, dates, place, notes) and
  /// bump `updated_at`. Returns the stored row.
  fn update_relationship(
    &self,
    rel: Relationship,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  /// Soft-delete a relationship. Returns `false` if it was missing or already
  /// deleted.
  fn delete_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All relationships matching `query`, in insertion order.
  fn find_relationships(
    &self,
    query: RelationshipQuery,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;
}
