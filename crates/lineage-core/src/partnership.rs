//! Auto-partnership inference.
//!
//! Recording a second qualifying parent for a child is taken as evidence that
//! the two parents are partners. The hook runs once per newly created
//! parent-child edge and returns the partner edges it actually created, so
//! the write path stays visible and testable.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  relationship::{
    NewRelationship, PARTNER_TYPES, QUALIFYING_PARENT_TYPES, Relationship,
    RelationshipType,
  },
  service::RelationshipService,
  store::{FamilyStore, RelationshipQuery},
};

/// The partner type given to inferred partnerships.
pub const INFERRED_PARTNER_TYPE: RelationshipType = RelationshipType::Marriage;

impl<S: FamilyStore> RelationshipService<S> {
  /// Pair the parent of `created` with every other qualifying parent of the
  /// same child.
  ///
  /// Candidates already joined by a partner edge of any type are skipped, as
  /// are candidates the service rejects with a conflict or a missing person.
  /// Only store failures are returned as errors.
  pub async fn infer_partnerships(&self, created: &Relationship) -> Result<Vec<Relationship>> {
    if !created.kind.is_qualifying_parent() {
      return Ok(Vec::new());
    }
    let new_parent = created.person_a_id;
    let child = created.person_b_id;

    let co_parent_edges = self
      .store()
      .find_relationships(RelationshipQuery {
        children: vec![child],
        types: QUALIFYING_PARENT_TYPES.to_vec(),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    let mut others: Vec<Uuid> = Vec::new();
    for rel in co_parent_edges {
      let parent = rel.person_a_id;
      if parent != new_parent && !others.contains(&parent) {
        others.push(parent);
      }
    }

    let mut inferred = Vec::new();
    for other in others {
      if self.already_partnered(new_parent, other).await? {
        continue;
      }
      match self
        .create(NewRelationship::new(new_parent, other, INFERRED_PARTNER_TYPE))
        .await
      {
        Ok(rel) => {
          info!(
            relationship_id = %rel.relationship_id,
            %new_parent,
            co_parent = %other,
            %child,
            "inferred partnership between co-parents"
          );
          inferred.push(rel);
        }
        Err(Error::Conflict { .. }) => {}
        Err(Error::PersonNotFound(missing)) => {
          warn!(%missing, %child, "skipping partnership inference for missing co-parent");
        }
        Err(e) => return Err(e),
      }
    }
    Ok(inferred)
  }

  async fn already_partnered(&self, a: Uuid, b: Uuid) -> Result<bool> {
    let existing = self
      .store()
      .find_relationships(RelationshipQuery::between(a, b).with_types(PARTNER_TYPES))
      .await
      .map_err(Error::store)?;
    Ok(!existing.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    memory::MemoryStore,
    person::{NewPerson, Sex},
    relationship::RelationshipType::*,
  };

  fn service() -> RelationshipService<MemoryStore> {
    RelationshipService::new(Arc::new(MemoryStore::new()))
  }

  async fn person(svc: &RelationshipService<MemoryStore>, name: &str) -> Uuid {
    svc
      .store()
      .add_person(NewPerson::named(name, "Test", Sex::Unknown))
      .await
      .unwrap()
      .person_id
  }

  fn endpoints(rel: &Relationship) -> [Uuid; 2] {
    let mut ids = [rel.person_a_id, rel.person_b_id];
    ids.sort();
    ids
  }

  fn pair(a: Uuid, b: Uuid) -> [Uuid; 2] {
    let mut ids = [a, b];
    ids.sort();
    ids
  }

  #[tokio::test]
  async fn first_parent_infers_nothing() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let kid = person(&svc, "Kid").await;

    let out = svc
      .create_with_inference(NewRelationship::new(mum, kid, BiologicalParent))
      .await
      .unwrap();
    assert!(out.inferred_partnerships.is_empty());
  }

  #[tokio::test]
  async fn second_parent_infers_one_marriage() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let dad = person(&svc, "Dad").await;
    let kid = person(&svc, "Kid").await;

    svc
      .create_with_inference(NewRelationship::new(mum, kid, BiologicalParent))
      .await
      .unwrap();
    let out = svc
      .create_with_inference(NewRelationship::new(dad, kid, AdoptiveParent))
      .await
      .unwrap();

    assert_eq!(out.inferred_partnerships.len(), 1);
    let marriage = &out.inferred_partnerships[0];
    assert_eq!(marriage.kind, Marriage);
    assert_eq!(endpoints(marriage), pair(mum, dad));
  }

  #[tokio::test]
  async fn third_parent_pairs_with_each_existing_parent() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let dad = person(&svc, "Dad").await;
    let step = person(&svc, "Step").await;
    let kid = person(&svc, "Kid").await;

    for parent in [mum, dad] {
      svc
        .create_with_inference(NewRelationship::new(parent, kid, BiologicalParent))
        .await
        .unwrap();
    }
    let out = svc
      .create_with_inference(NewRelationship::new(step, kid, StepParent))
      .await
      .unwrap();

    let pairs: Vec<_> = out.inferred_partnerships.iter().map(endpoints).collect();
    assert_eq!(pairs, vec![pair(step, mum), pair(step, dad)]);
  }

  #[tokio::test]
  async fn existing_partner_edge_of_any_type_suppresses_inference() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let dad = person(&svc, "Dad").await;
    let step = person(&svc, "Step").await;
    let kid = person(&svc, "Kid").await;

    svc.create(NewRelationship::new(dad, step, Cohabitation)).await.unwrap();
    for parent in [mum, dad] {
      svc
        .create_with_inference(NewRelationship::new(parent, kid, BiologicalParent))
        .await
        .unwrap();
    }
    let out = svc
      .create_with_inference(NewRelationship::new(step, kid, StepParent))
      .await
      .unwrap();

    let pairs: Vec<_> = out.inferred_partnerships.iter().map(endpoints).collect();
    assert_eq!(pairs, vec![pair(step, mum)]);
  }

  #[tokio::test]
  async fn godparent_and_guardian_never_trigger_inference() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let god = person(&svc, "God").await;
    let guardian = person(&svc, "Guardian").await;
    let kid = person(&svc, "Kid").await;

    svc
      .create_with_inference(NewRelationship::new(mum, kid, BiologicalParent))
      .await
      .unwrap();
    let out = svc
      .create_with_inference(NewRelationship::new(god, kid, Godparent))
      .await
      .unwrap();
    assert!(out.inferred_partnerships.is_empty());
    let out = svc
      .create_with_inference(NewRelationship::new(guardian, kid, Guardian))
      .await
      .unwrap();
    assert!(out.inferred_partnerships.is_empty());

    // A later qualifying parent does not pair with the godparent either.
    let dad = person(&svc, "Dad").await;
    let out = svc
      .create_with_inference(NewRelationship::new(dad, kid, BiologicalParent))
      .await
      .unwrap();
    let pairs: Vec<_> = out.inferred_partnerships.iter().map(endpoints).collect();
    assert_eq!(pairs, vec![pair(dad, mum)]);
  }

  #[tokio::test]
  async fn deleted_co_parent_is_skipped() {
    let svc = service();
    let mum = person(&svc, "Mum").await;
    let dad = person(&svc, "Dad").await;
    let kid = person(&svc, "Kid").await;

    svc
      .create(NewRelationship::new(mum, kid, BiologicalParent))
      .await
      .unwrap();
    svc.store().delete_person(mum).await.unwrap();

    let out = svc
      .create_with_inference(NewRelationship::new(dad, kid, BiologicalParent))
      .await
      .unwrap();
    assert!(out.inferred_partnerships.is_empty());
  }
}
