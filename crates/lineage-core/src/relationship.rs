//! Relationship: a typed edge between two persons.
//!
//! Parent-child types are directional: `person_a` is the parent and
//! `person_b` the child. Partner types are symmetric and the storage order of
//! the endpoints carries no meaning.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipType {
  // ── Parent-child ─────────────────────────────────────────────────────────
  BiologicalParent,
  AdoptiveParent,
  StepParent,
  FosterParent,
  Guardian,
  Godparent,

  // ── Partner ──────────────────────────────────────────────────────────────
  Marriage,
  CivilPartnership,
  DomesticPartnership,
  Cohabitation,
  Engagement,
  Custom,
}

/// Parent-child types that count toward kinship derivation and
/// auto-partnership. Guardian and godparent edges are real but excluded.
pub const QUALIFYING_PARENT_TYPES: [RelationshipType; 4] = [
  RelationshipType::BiologicalParent,
  RelationshipType::AdoptiveParent,
  RelationshipType::StepParent,
  RelationshipType::FosterParent,
];

pub const PARTNER_TYPES: [RelationshipType; 6] = [
  RelationshipType::Marriage,
  RelationshipType::CivilPartnership,
  RelationshipType::DomesticPartnership,
  RelationshipType::Cohabitation,
  RelationshipType::Engagement,
  RelationshipType::Custom,
];

impl RelationshipType {
  pub fn is_partner(self) -> bool { PARTNER_TYPES.contains(&self) }

  pub fn is_parent_child(self) -> bool { !self.is_partner() }

  pub fn is_qualifying_parent(self) -> bool {
    QUALIFYING_PARENT_TYPES.contains(&self)
  }

  /// Rank used to pick the two pedigree parents when a child has more than
  /// two qualifying parents. Lower wins; non-qualifying types have no rank.
  pub fn pedigree_rank(self) -> Option<usize> {
    QUALIFYING_PARENT_TYPES.iter().position(|t| *t == self)
  }
}

// ─── Relationship ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id: Uuid,
  /// The parent for parent-child types.
  pub person_a_id:     Uuid,
  /// The child for parent-child types.
  pub person_b_id:     Uuid,
  #[serde(rename = "type")]
  pub kind:            RelationshipType,
  pub start_date:      Option<NaiveDate>,
  pub end_date:        Option<NaiveDate>,
  pub place:           Option<String>,
  pub notes:           Option<String>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  pub deleted_at:      Option<DateTime<Utc>>,
}

impl Relationship {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  pub fn touches(&self, person_id: Uuid) -> bool {
    self.person_a_id == person_id || self.person_b_id == person_id
  }

  /// True if this edge joins `a` and `b` in either direction.
  pub fn joins(&self, a: Uuid, b: Uuid) -> bool {
    (self.person_a_id == a && self.person_b_id == b)
      || (self.person_a_id == b && self.person_b_id == a)
  }

  /// The endpoint that is not `person_id`, if `person_id` is an endpoint.
  pub fn other(&self, person_id: Uuid) -> Option<Uuid> {
    if self.person_a_id == person_id {
      Some(self.person_b_id)
    } else if self.person_b_id == person_id {
      Some(self.person_a_id)
    } else {
      None
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to the relationship service's `create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelationship {
  pub person_a_id: Uuid,
  pub person_b_id: Uuid,
  #[serde(rename = "type")]
  pub kind:        RelationshipType,
  #[serde(default)]
  pub start_date:  Option<NaiveDate>,
  #[serde(default)]
  pub end_date:    Option<NaiveDate>,
  #[serde(default)]
  pub place:       Option<String>,
  #[serde(default)]
  pub notes:       Option<String>,
}

impl NewRelationship {
  /// Convenience constructor with all optional fields unset.
  pub fn new(person_a_id: Uuid, person_b_id: Uuid, kind: RelationshipType) -> Self {
    Self {
      person_a_id,
      person_b_id,
      kind,
      start_date: None,
      end_date: None,
      place: None,
      notes: None,
    }
  }
}

/// Field-level edit of an existing relationship. Absent fields are left
/// unchanged and an explicit `null` clears an optional field; endpoints cannot
/// be edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipPatch {
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind:       Option<RelationshipType>,
  #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
  pub start_date: Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
  pub end_date:   Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
  pub place:      Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
  pub notes:      Option<Option<String>>,
}

/// A present field, `null` included, deserialises to `Some`; `default`
/// covers the absent case.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  D: serde::Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

impl RelationshipPatch {
  pub fn apply(self, rel: &mut Relationship) {
    if let Some(kind) = self.kind {
      rel.kind = kind;
    }
    if let Some(d) = self.start_date {
      rel.start_date = d;
    }
    if let Some(d) = self.end_date {
      rel.end_date = d;
    }
    if let Some(p) = self.place {
      rel.place = p;
    }
    if let Some(n) = self.notes {
      rel.notes = n;
    }
  }
}
