//! Extended kinship derivation.
//!
//! Nothing here is materialised. Each request extracts a bounded
//! neighbourhood around the target person, then derives every kinship bucket
//! as a fixed composition of four single-hop steps over that subgraph.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  person::{Person, Sex},
  relationship::{Relationship, RelationshipType},
  store::{FamilyStore, RelationshipQuery},
};

/// Hops explored outward from the target. Five reaches both
/// great-grandparent → sibling → child and child → partner → parent.
pub const NEIGHBORHOOD_DEPTH: usize = 5;

// ─── Neighbourhood extraction ────────────────────────────────────────────────

/// How an edge was crossed during extraction, relative to `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopRole {
  /// `to` is a parent of `from`.
  Parent,
  /// `to` is a child of `from`.
  Child,
  /// `to` is a partner of `from`.
  Partner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Hop {
  pub from: Uuid,
  pub to:   Uuid,
  pub kind: RelationshipType,
  pub role: HopRole,
}

/// Classify `rel` as seen from `from`, which must be one of its endpoints.
fn hop_from(rel: &Relationship, from: Uuid) -> Option<Hop> {
  let to = rel.other(from)?;
  let role = if rel.kind.is_partner() {
    HopRole::Partner
  } else if rel.person_a_id == from {
    HopRole::Child
  } else {
    HopRole::Parent
  };
  Some(Hop { from, to, kind: rel.kind, role })
}

/// Breadth-first expansion from `origin`, `depth` layers deep. Each layer
/// costs one relationship query plus one person lookup for the endpoints it
/// reaches; hops into deleted persons are dropped and never expanded. Hops
/// are deduplicated by `(from, to, kind, role)`.
pub async fn extract_neighborhood<S: FamilyStore>(
  store: &S,
  origin: Uuid,
  depth: usize,
) -> Result<Vec<Hop>> {
  let mut visited: HashSet<Uuid> = HashSet::from([origin]);
  let mut live: HashSet<Uuid> = HashSet::from([origin]);
  let mut dead: HashSet<Uuid> = HashSet::new();
  let mut layer = vec![origin];
  let mut seen: HashSet<Hop> = HashSet::new();
  let mut hops = Vec::new();

  for _ in 0..depth {
    if layer.is_empty() {
      break;
    }
    let in_layer: HashSet<Uuid> = layer.iter().copied().collect();
    let rels = store
      .find_relationships(RelationshipQuery::touching(layer.iter().copied()))
      .await
      .map_err(Error::store)?;

    let mut candidates = Vec::new();
    for rel in &rels {
      for from in [rel.person_a_id, rel.person_b_id] {
        if !in_layer.contains(&from) {
          continue;
        }
        if let Some(hop) = hop_from(rel, from) {
          candidates.push(hop);
        }
      }
    }

    let mut unresolved: Vec<Uuid> = candidates
      .iter()
      .map(|hop| hop.to)
      .filter(|id| !live.contains(id) && !dead.contains(id))
      .collect();
    unresolved.sort();
    unresolved.dedup();
    if !unresolved.is_empty() {
      let found = store
        .get_persons(unresolved.clone())
        .await
        .map_err(Error::store)?;
      live.extend(found.into_iter().map(|p| p.person_id));
      dead.extend(unresolved.into_iter().filter(|id| !live.contains(id)));
    }

    let mut next = Vec::new();
    for hop in candidates {
      if !live.contains(&hop.to) {
        continue;
      }
      if seen.insert(hop) {
        hops.push(hop);
      }
      if visited.insert(hop.to) {
        next.push(hop.to);
      }
    }
    layer = next;
  }
  Ok(hops)
}

// ─── Relation algebra ────────────────────────────────────────────────────────

/// A single-hop traversal over a [`KinGraph`].
pub type Step = fn(&KinGraph, Uuid) -> Vec<Uuid>;

/// Adjacency over an extracted neighbourhood. Parent and child links come
/// only from qualifying parent types; partner links from any partner type.
#[derive(Debug, Clone, Default)]
pub struct KinGraph {
  origin:   Uuid,
  parents:  HashMap<Uuid, Vec<Uuid>>,
  children: HashMap<Uuid, Vec<Uuid>>,
  partners: HashMap<Uuid, Vec<Uuid>>,
}

fn link(map: &mut HashMap<Uuid, Vec<Uuid>>, from: Uuid, to: Uuid) {
  let entry = map.entry(from).or_default();
  if !entry.contains(&to) {
    entry.push(to);
  }
}

impl KinGraph {
  pub fn from_hops(origin: Uuid, hops: &[Hop]) -> Self {
    let mut graph = Self { origin, ..Self::default() };
    for hop in hops {
      match hop.role {
        HopRole::Partner => {
          link(&mut graph.partners, hop.from, hop.to);
          link(&mut graph.partners, hop.to, hop.from);
        }
        _ if !hop.kind.is_qualifying_parent() => {}
        HopRole::Child => {
          link(&mut graph.children, hop.from, hop.to);
          link(&mut graph.parents, hop.to, hop.from);
        }
        HopRole::Parent => {
          link(&mut graph.parents, hop.from, hop.to);
          link(&mut graph.children, hop.to, hop.from);
        }
      }
    }
    graph
  }

  /// Build directly from relationship rows, ignoring soft-deleted ones.
  pub fn from_relationships(origin: Uuid, rels: &[Relationship]) -> Self {
    let hops: Vec<Hop> = rels
      .iter()
      .filter(|r| !r.is_deleted())
      .filter_map(|r| hop_from(r, r.person_a_id))
      .collect();
    Self::from_hops(origin, &hops)
  }

  pub fn origin(&self) -> Uuid { self.origin }

  pub fn parents_of(&self, id: Uuid) -> Vec<Uuid> {
    self.parents.get(&id).cloned().unwrap_or_default()
  }

  pub fn children_of(&self, id: Uuid) -> Vec<Uuid> {
    self.children.get(&id).cloned().unwrap_or_default()
  }

  pub fn partners_of(&self, id: Uuid) -> Vec<Uuid> {
    self.partners.get(&id).cloned().unwrap_or_default()
  }

  /// Children of `id`'s parents, excluding `id`.
  pub fn siblings_of(&self, id: Uuid) -> Vec<Uuid> {
    let mut out = Vec::new();
    for parent in self.parents_of(id) {
      for child in self.children_of(parent) {
        if child != id && !out.contains(&child) {
          out.push(child);
        }
      }
    }
    out
  }

  /// Apply `steps` left to right starting from `start`, flattening and
  /// deduplicating after every step. The origin person never appears in the
  /// result.
  pub fn walk(&self, start: &[Uuid], steps: &[Step]) -> Vec<Uuid> {
    let mut current: Vec<Uuid> = start.to_vec();
    for step in steps {
      let mut next = Vec::new();
      let mut seen = HashSet::new();
      for id in &current {
        for found in step(self, *id) {
          if seen.insert(found) {
            next.push(found);
          }
        }
      }
      current = next;
    }
    current.retain(|id| *id != self.origin);
    current
  }

  /// Derive every kinship bucket as plain id lists.
  pub fn derive(&self) -> KinIds {
    let me = [self.origin];
    let grandparents = self.walk(&me, &[Self::parents_of, Self::parents_of]);
    let great_grandparents = self.walk(&grandparents, &[Self::parents_of]);
    let uncles_aunts = self.walk(&me, &[Self::parents_of, Self::siblings_of]);
    let great_uncles_aunts = self.walk(&grandparents, &[Self::siblings_of]);
    let cousins = self.walk(&me, &[
      Self::parents_of,
      Self::siblings_of,
      Self::children_of,
    ]);
    let nephews_nieces = self.walk(&me, &[Self::siblings_of, Self::children_of]);

    let mut siblings_in_law = self.walk(&me, &[Self::partners_of, Self::siblings_of]);
    for id in self.walk(&me, &[Self::siblings_of, Self::partners_of]) {
      if !siblings_in_law.contains(&id) {
        siblings_in_law.push(id);
      }
    }

    let parents_in_law = self.walk(&me, &[Self::partners_of, Self::parents_of]);
    let children_in_law = self.walk(&me, &[Self::children_of, Self::partners_of]);

    // A child-in-law's parents, minus the origin's own partners: those are
    // co-parents of the origin's child, not in-laws.
    let own_partners = self.partners_of(self.origin);
    let mut co_parents_in_law = self.walk(&children_in_law, &[Self::parents_of]);
    co_parents_in_law.retain(|id| !own_partners.contains(id));

    KinIds {
      grandparents,
      great_grandparents,
      uncles_aunts,
      great_uncles_aunts,
      cousins,
      nephews_nieces,
      siblings_in_law,
      parents_in_law,
      children_in_law,
      co_parents_in_law,
    }
  }
}

// ─── Buckets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KinRelation {
  Grandparent,
  GreatGrandparent,
  UncleAunt,
  GreatUncleAunt,
  Cousin,
  NephewNiece,
  SiblingInLaw,
  ParentInLaw,
  ChildInLaw,
  CoParentInLaw,
}

impl KinRelation {
  /// Human label for a person of the given sex in this relation.
  pub fn label(self, sex: Sex) -> &'static str {
    use KinRelation::*;
    match (self, sex) {
      (Grandparent, Sex::Male) => "grandfather",
      (Grandparent, Sex::Female) => "grandmother",
      (Grandparent, Sex::Unknown) => "grandparent",
      (GreatGrandparent, Sex::Male) => "great-grandfather",
      (GreatGrandparent, Sex::Female) => "great-grandmother",
      (GreatGrandparent, Sex::Unknown) => "great-grandparent",
      (UncleAunt, Sex::Male) => "uncle",
      (UncleAunt, Sex::Female) => "aunt",
      (UncleAunt, Sex::Unknown) => "parent's sibling",
      (GreatUncleAunt, Sex::Male) => "great-uncle",
      (GreatUncleAunt, Sex::Female) => "great-aunt",
      (GreatUncleAunt, Sex::Unknown) => "grandparent's sibling",
      (Cousin, _) => "cousin",
      (NephewNiece, Sex::Male) => "nephew",
      (NephewNiece, Sex::Female) => "niece",
      (NephewNiece, Sex::Unknown) => "sibling's child",
      (SiblingInLaw, Sex::Male) => "brother-in-law",
      (SiblingInLaw, Sex::Female) => "sister-in-law",
      (SiblingInLaw, Sex::Unknown) => "sibling-in-law",
      (ParentInLaw, Sex::Male) => "father-in-law",
      (ParentInLaw, Sex::Female) => "mother-in-law",
      (ParentInLaw, Sex::Unknown) => "parent-in-law",
      (ChildInLaw, Sex::Male) => "son-in-law",
      (ChildInLaw, Sex::Female) => "daughter-in-law",
      (ChildInLaw, Sex::Unknown) => "child-in-law",
      (CoParentInLaw, Sex::Male) => "co-father-in-law",
      (CoParentInLaw, Sex::Female) => "co-mother-in-law",
      (CoParentInLaw, Sex::Unknown) => "co-parent-in-law",
    }
  }
}

/// Id-level buckets produced by [`KinGraph::derive`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KinIds {
  pub grandparents:       Vec<Uuid>,
  pub great_grandparents: Vec<Uuid>,
  pub uncles_aunts:       Vec<Uuid>,
  pub great_uncles_aunts: Vec<Uuid>,
  pub cousins:            Vec<Uuid>,
  pub nephews_nieces:     Vec<Uuid>,
  pub siblings_in_law:    Vec<Uuid>,
  pub parents_in_law:     Vec<Uuid>,
  pub children_in_law:    Vec<Uuid>,
  pub co_parents_in_law:  Vec<Uuid>,
}

impl KinIds {
  fn buckets(&self) -> [(KinRelation, &Vec<Uuid>); 10] {
    [
      (KinRelation::Grandparent, &self.grandparents),
      (KinRelation::GreatGrandparent, &self.great_grandparents),
      (KinRelation::UncleAunt, &self.uncles_aunts),
      (KinRelation::GreatUncleAunt, &self.great_uncles_aunts),
      (KinRelation::Cousin, &self.cousins),
      (KinRelation::NephewNiece, &self.nephews_nieces),
      (KinRelation::SiblingInLaw, &self.siblings_in_law),
      (KinRelation::ParentInLaw, &self.parents_in_law),
      (KinRelation::ChildInLaw, &self.children_in_law),
      (KinRelation::CoParentInLaw, &self.co_parents_in_law),
    ]
  }

  /// Every id across all buckets, first occurrence first.
  pub fn all_ids(&self) -> Vec<Uuid> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (_, ids) in self.buckets() {
      for id in ids {
        if seen.insert(*id) {
          out.push(*id);
        }
      }
    }
    out
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct KinEntry {
  pub person:   Person,
  pub relation: KinRelation,
  pub label:    &'static str,
}

/// Resolved kinship buckets for one person.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtendedFamily {
  pub grandparents:       Vec<KinEntry>,
  pub great_grandparents: Vec<KinEntry>,
  pub uncles_aunts:       Vec<KinEntry>,
  pub great_uncles_aunts: Vec<KinEntry>,
  pub cousins:            Vec<KinEntry>,
  pub nephews_nieces:     Vec<KinEntry>,
  pub siblings_in_law:    Vec<KinEntry>,
  pub parents_in_law:     Vec<KinEntry>,
  pub children_in_law:    Vec<KinEntry>,
  pub co_parents_in_law:  Vec<KinEntry>,
}

impl ExtendedFamily {
  fn bucket_mut(&mut self, relation: KinRelation) -> &mut Vec<KinEntry> {
    match relation {
      KinRelation::Grandparent => &mut self.grandparents,
      KinRelation::GreatGrandparent => &mut self.great_grandparents,
      KinRelation::UncleAunt => &mut self.uncles_aunts,
      KinRelation::GreatUncleAunt => &mut self.great_uncles_aunts,
      KinRelation::Cousin => &mut self.cousins,
      KinRelation::NephewNiece => &mut self.nephews_nieces,
      KinRelation::SiblingInLaw => &mut self.siblings_in_law,
      KinRelation::ParentInLaw => &mut self.parents_in_law,
      KinRelation::ChildInLaw => &mut self.children_in_law,
      KinRelation::CoParentInLaw => &mut self.co_parents_in_law,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.grandparents.is_empty()
      && self.great_grandparents.is_empty()
      && self.uncles_aunts.is_empty()
      && self.great_uncles_aunts.is_empty()
      && self.cousins.is_empty()
      && self.nephews_nieces.is_empty()
      && self.siblings_in_law.is_empty()
      && self.parents_in_law.is_empty()
      && self.children_in_law.is_empty()
      && self.co_parents_in_law.is_empty()
  }

  /// Distribute resolved persons into labelled buckets. Ids that did not
  /// resolve (deleted or unknown) are dropped.
  pub fn resolve(ids: &KinIds, persons: &[Person]) -> Self {
    let by_id: HashMap<Uuid, &Person> =
      persons.iter().map(|p| (p.person_id, p)).collect();
    let mut family = Self::default();
    for (relation, bucket) in ids.buckets() {
      let entries = family.bucket_mut(relation);
      for id in bucket {
        if let Some(person) = by_id.get(id) {
          entries.push(KinEntry {
            person: (*person).clone(),
            relation,
            label: relation.label(person.sex),
          });
        }
      }
    }
    family
  }
}

/// Derive the extended family of `person_id`.
///
/// Never fails for missing or disconnected data: an unknown or deleted person
/// simply yields empty buckets. Only store failures are errors.
#[instrument(skip(store))]
pub async fn extended_family<S: FamilyStore>(
  store: &S,
  person_id: Uuid,
) -> Result<ExtendedFamily> {
  let exists = store
    .get_person(person_id)
    .await
    .map_err(Error::store)?
    .is_some_and(|p| !p.is_deleted());
  if !exists {
    return Ok(ExtendedFamily::default());
  }

  let hops = extract_neighborhood(store, person_id, NEIGHBORHOOD_DEPTH).await?;
  let ids = KinGraph::from_hops(person_id, &hops).derive();

  let wanted = ids.all_ids();
  if wanted.is_empty() {
    return Ok(ExtendedFamily::default());
  }
  let persons = store.get_persons(wanted).await.map_err(Error::store)?;
  Ok(ExtendedFamily::resolve(&ids, &persons))
}
