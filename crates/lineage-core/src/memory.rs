//! [`MemoryStore`]: a [`FamilyStore`] held entirely in process memory.
//!
//! Suitable for tests and for embedders that load a snapshot from elsewhere.

use std::{
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  person::{NewPerson, Person},
  relationship::{NewRelationship, Relationship},
  store::{FamilyStore, RelationshipQuery},
};

#[derive(Debug, Default)]
struct Tables {
  persons:       Vec<Person>,
  relationships: Vec<Relationship>,
}

/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn tables(&self) -> MutexGuard<'_, Tables> {
    // Every write is a single push or field update, so poisoned tables are
    // still consistent.
    self.tables.lock().unwrap_or_else(|p| p.into_inner())
  }
}

impl FamilyStore for MemoryStore {
  type Error = Infallible;

  async fn add_person(&self, input: NewPerson) -> Result<Person, Infallible> {
    let now = Utc::now();
    let person = Person {
      person_id:   Uuid::new_v4(),
      given_names: input.given_names,
      surname:     input.surname,
      sex:         input.sex,
      privacy:     input.privacy,
      birth_date:  input.birth_date,
      death_date:  input.death_date,
      created_at:  now,
      updated_at:  now,
      deleted_at:  None,
    };
    self.tables().persons.push(person.clone());
    Ok(person)
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>, Infallible> {
    Ok(self.tables().persons.iter().find(|p| p.person_id == id).cloned())
  }

  async fn get_persons(&self, ids: Vec<Uuid>) -> Result<Vec<Person>, Infallible> {
    Ok(
      self
        .tables()
        .persons
        .iter()
        .filter(|p| !p.is_deleted() && ids.contains(&p.person_id))
        .cloned()
        .collect(),
    )
  }

  async fn list_persons(&self) -> Result<Vec<Person>, Infallible> {
    Ok(
      self
        .tables()
        .persons
        .iter()
        .filter(|p| !p.is_deleted())
        .cloned()
        .collect(),
    )
  }

  async fn delete_person(&self, id: Uuid) -> Result<bool, Infallible> {
    let mut tables = self.tables();
    match tables
      .persons
      .iter_mut()
      .find(|p| p.person_id == id && !p.is_deleted())
    {
      Some(p) => {
        let now = Utc::now();
        p.deleted_at = Some(now);
        p.updated_at = now;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn add_relationship(
    &self,
    input: NewRelationship,
  ) -> Result<Relationship, Infallible> {
    let now = Utc::now();
    let rel = Relationship {
      relationship_id: Uuid::new_v4(),
      person_a_id:     input.person_a_id,
      person_b_id:     input.person_b_id,
      kind:            input.kind,
      start_date:      input.start_date,
      end_date:        input.end_date,
      place:           input.place,
      notes:           input.notes,
      created_at:      now,
      updated_at:      now,
      deleted_at:      None,
    };
    self.tables().relationships.push(rel.clone());
    Ok(rel)
  }

  async fn get_relationship(&self, id: Uuid) -> Result<Option<Relationship>, Infallible> {
    Ok(
      self
        .tables()
        .relationships
        .iter()
        .find(|r| r.relationship_id == id)
        .cloned(),
    )
  }

  async fn list_relationships(
    &self,
    limit: usize,
    offset: usize,
  ) -> Result<(Vec<Relationship>, usize), Infallible> {
    let tables = self.tables();
    let live = tables.relationships.iter().filter(|r| !r.is_deleted());
    let total = live.clone().count();
    Ok((live.skip(offset).take(limit).cloned().collect(), total))
  }

  async fn update_relationship(&self, rel: Relationship) -> Result<Relationship, Infallible> {
    let mut tables = self.tables();
    let Some(stored) = tables
      .relationships
      .iter_mut()
      .find(|r| r.relationship_id == rel.relationship_id)
    else {
      return Ok(rel);
    };
    stored.kind = rel.kind;
    stored.start_date = rel.start_date;
    stored.end_date = rel.end_date;
    stored.place = rel.place;
    stored.notes = rel.notes;
    stored.updated_at = Utc::now();
    Ok(stored.clone())
  }

  async fn delete_relationship(&self, id: Uuid) -> Result<bool, Infallible> {
    let mut tables = self.tables();
    match tables
      .relationships
      .iter_mut()
      .find(|r| r.relationship_id == id && !r.is_deleted())
    {
      Some(r) => {
        let now = Utc::now();
        r.deleted_at = Some(now);
        r.updated_at = now;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn find_relationships(
    &self,
    query: RelationshipQuery,
  ) -> Result<Vec<Relationship>, Infallible> {
    Ok(
      self
        .tables()
        .relationships
        .iter()
        .filter(|r| query.matches(r))
        .cloned()
        .collect(),
    )
  }
}
