//! [`RelationshipService`]: the only write path for relationship edges.
//!
//! Every invariant on the edge set (no self-edges, one live edge per
//! unordered pair and type, live endpoints) is enforced here rather than by
//! the backend.

use std::{
  collections::{BTreeMap, HashSet},
  sync::Arc,
};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  person::Person,
  relationship::{
    NewRelationship, QUALIFYING_PARENT_TYPES, Relationship, RelationshipPatch,
    RelationshipType,
  },
  store::{FamilyStore, RelationshipQuery},
};

/// Largest page size accepted by [`RelationshipService::list`].
pub const MAX_PAGE_LIMIT: usize = 500;

/// One page of relationships.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// 1-based page number.
  pub page:  usize,
  pub limit: usize,
  pub total: usize,
}

/// Result of [`RelationshipService::create_with_inference`].
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRelationship {
  pub relationship:          Relationship,
  /// Partner edges synthesised between the new parent and existing co-parents.
  pub inferred_partnerships: Vec<Relationship>,
}

pub struct RelationshipService<S> {
  store: Arc<S>,
}

impl<S> Clone for RelationshipService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: FamilyStore> RelationshipService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Validate and persist a single edge.
  ///
  /// Fails with [`Error::Validation`] for a self-relationship or inverted
  /// dates, [`Error::PersonNotFound`] if either endpoint is missing or
  /// soft-deleted, and [`Error::Conflict`] if a live edge of the same type
  /// already joins the pair in either direction.
  pub async fn create(&self, input: NewRelationship) -> Result<Relationship> {
    if input.person_a_id == input.person_b_id {
      return Err(Error::Validation(
        "a person cannot have a relationship with themselves".into(),
      ));
    }
    check_dates(input.start_date, input.end_date)?;

    self.require_person(input.person_a_id).await?;
    self.require_person(input.person_b_id).await?;

    let existing = self
      .store
      .find_relationships(
        RelationshipQuery::between(input.person_a_id, input.person_b_id)
          .with_types([input.kind]),
      )
      .await
      .map_err(Error::store)?;
    if !existing.is_empty() {
      return Err(Error::Conflict {
        person_a: input.person_a_id,
        person_b: input.person_b_id,
        kind:     input.kind,
      });
    }

    let rel = self
      .store
      .add_relationship(input)
      .await
      .map_err(Error::store)?;
    debug!(
      relationship_id = %rel.relationship_id,
      kind = %rel.kind,
      person_a = %rel.person_a_id,
      person_b = %rel.person_b_id,
      "relationship created"
    );
    Ok(rel)
  }

  /// Create an edge, then run auto-partnership inference on it.
  pub async fn create_with_inference(
    &self,
    input: NewRelationship,
  ) -> Result<CreatedRelationship> {
    let relationship = self.create(input).await?;
    let inferred_partnerships = self.infer_partnerships(&relationship).await?;
    Ok(CreatedRelationship { relationship, inferred_partnerships })
  }

  /// Fetch a live relationship.
  pub async fn get(&self, id: Uuid) -> Result<Relationship> {
    self
      .store
      .get_relationship(id)
      .await
      .map_err(Error::store)?
      .filter(|r| !r.is_deleted())
      .ok_or(Error::RelationshipNotFound(id))
  }

  pub async fn list(&self, page: usize, limit: usize) -> Result<Page<Relationship>> {
    if page == 0 {
      return Err(Error::Validation("page numbers start at 1".into()));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
      return Err(Error::Validation(format!(
        "limit must be between 1 and {MAX_PAGE_LIMIT}"
      )));
    }
    let offset = (page - 1).saturating_mul(limit);
    let (items, total) = self
      .store
      .list_relationships(limit, offset)
      .await
      .map_err(Error::store)?;
    Ok(Page { items, page, limit, total })
  }

  /// Apply a field-level edit. Both endpoints must still be live, and a type
  /// change is re-checked for uniqueness against the same unordered pair.
  pub async fn update(&self, id: Uuid, patch: RelationshipPatch) -> Result<Relationship> {
    let mut rel = self.get(id).await?;
    self.require_person(rel.person_a_id).await?;
    self.require_person(rel.person_b_id).await?;
    let old_kind = rel.kind;
    patch.apply(&mut rel);
    check_dates(rel.start_date, rel.end_date)?;

    if rel.kind != old_kind {
      let clash = self
        .store
        .find_relationships(
          RelationshipQuery::between(rel.person_a_id, rel.person_b_id)
            .with_types([rel.kind]),
        )
        .await
        .map_err(Error::store)?
        .into_iter()
        .any(|other| other.relationship_id != id);
      if clash {
        return Err(Error::Conflict {
          person_a: rel.person_a_id,
          person_b: rel.person_b_id,
          kind:     rel.kind,
        });
      }
    }

    let rel = self
      .store
      .update_relationship(rel)
      .await
      .map_err(Error::store)?;
    debug!(relationship_id = %id, kind = %rel.kind, "relationship updated");
    Ok(rel)
  }

  /// Soft-delete a relationship.
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .delete_relationship(id)
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::RelationshipNotFound(id));
    }
    debug!(relationship_id = %id, "relationship deleted");
    Ok(())
  }

  /// All live edges touching `person_id` whose other endpoint is also live,
  /// grouped by type.
  pub async fn get_for_person(
    &self,
    person_id: Uuid,
  ) -> Result<BTreeMap<RelationshipType, Vec<Relationship>>> {
    self.require_person(person_id).await?;
    let rels = self
      .store
      .find_relationships(RelationshipQuery::touching([person_id]))
      .await
      .map_err(Error::store)?;
    let live = self
      .live_ids(rels.iter().filter_map(|r| r.other(person_id)).collect())
      .await?;

    let mut grouped: BTreeMap<RelationshipType, Vec<Relationship>> = BTreeMap::new();
    for rel in rels {
      if rel.other(person_id).is_some_and(|other| live.contains(&other)) {
        grouped.entry(rel.kind).or_default().push(rel);
      }
    }
    Ok(grouped)
  }

  /// Ids of everyone live who shares at least one live qualifying parent
  /// with `person_id`, excluding the person themselves.
  pub async fn get_siblings(&self, person_id: Uuid) -> Result<Vec<Uuid>> {
    self.require_person(person_id).await?;

    let parent_edges = self
      .store
      .find_relationships(RelationshipQuery {
        children: vec![person_id],
        types: QUALIFYING_PARENT_TYPES.to_vec(),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;
    let mut parents: Vec<Uuid> = Vec::new();
    for rel in parent_edges {
      if !parents.contains(&rel.person_a_id) {
        parents.push(rel.person_a_id);
      }
    }
    if parents.is_empty() {
      return Ok(Vec::new());
    }

    let child_edges = self
      .store
      .find_relationships(RelationshipQuery {
        parents: parents.clone(),
        types: QUALIFYING_PARENT_TYPES.to_vec(),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    let mut wanted = parents;
    wanted.extend(child_edges.iter().map(|r| r.person_b_id));
    let live = self.live_ids(wanted).await?;

    let mut siblings: Vec<Uuid> = Vec::new();
    for rel in child_edges {
      let child = rel.person_b_id;
      if child != person_id
        && live.contains(&rel.person_a_id)
        && live.contains(&child)
        && !siblings.contains(&child)
      {
        siblings.push(child);
      }
    }
    Ok(siblings)
  }

  /// The subset of `ids` naming live persons, in one bulk read.
  async fn live_ids(&self, mut ids: Vec<Uuid>) -> Result<HashSet<Uuid>> {
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
      return Ok(HashSet::new());
    }
    let persons = self.store.get_persons(ids).await.map_err(Error::store)?;
    Ok(persons.into_iter().map(|p| p.person_id).collect())
  }

  /// Fetch a live person or fail with [`Error::PersonNotFound`].
  pub(crate) async fn require_person(&self, person_id: Uuid) -> Result<Person> {
    self
      .store
      .get_person(person_id)
      .await
      .map_err(Error::store)?
      .filter(|p| !p.is_deleted())
      .ok_or(Error::PersonNotFound(person_id))
  }
}

fn check_dates(
  start: Option<chrono::NaiveDate>,
  end: Option<chrono::NaiveDate>,
) -> Result<()> {
  if let (Some(start), Some(end)) = (start, end)
    && end < start
  {
    return Err(Error::Validation(format!(
      "end date {end} is before start date {start}"
    )));
  }
  Ok(())
}
