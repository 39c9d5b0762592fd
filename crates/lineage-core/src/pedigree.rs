//! Ancestor pedigree: building a binary ancestor tree and laying it out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  person::Person,
  relationship::QUALIFYING_PARENT_TYPES,
  store::{FamilyStore, RelationshipQuery},
};

/// Upper bound on `max_generations`, root included.
pub const MAX_ANCESTOR_GENERATIONS: usize = 12;

/// A person and up to two parent subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorNode {
  pub person:  Person,
  #[serde(default)]
  pub parents: Vec<AncestorNode>,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Walk qualifying parent edges upward from `root_id`, one generation per
/// bulk read. `max_generations` counts the root as the first generation.
///
/// Returns `None` if the root is missing or soft-deleted.
#[instrument(skip(store))]
pub async fn build_ancestor_tree<S: FamilyStore>(
  store: &S,
  root_id: Uuid,
  max_generations: usize,
) -> Result<Option<AncestorNode>> {
  let generations = max_generations.clamp(1, MAX_ANCESTOR_GENERATIONS);
  let Some(root) = store
    .get_person(root_id)
    .await
    .map_err(Error::store)?
    .filter(|p| !p.is_deleted())
  else {
    return Ok(None);
  };

  let mut persons: HashMap<Uuid, Person> = HashMap::from([(root_id, root)]);
  let mut parents_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
  let mut layer = vec![root_id];

  for _ in 1..generations {
    if layer.is_empty() {
      break;
    }
    let mut edges = store
      .find_relationships(RelationshipQuery {
        children: layer.clone(),
        types: QUALIFYING_PARENT_TYPES.to_vec(),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;
    // Stable sort keeps insertion order among equally ranked types.
    edges.sort_by_key(|r| r.kind.pedigree_rank());

    let mut wanted = Vec::new();
    for rel in &edges {
      let chosen = parents_of.entry(rel.person_b_id).or_default();
      if chosen.len() < 2 && !chosen.contains(&rel.person_a_id) {
        chosen.push(rel.person_a_id);
        if !persons.contains_key(&rel.person_a_id) && !wanted.contains(&rel.person_a_id) {
          wanted.push(rel.person_a_id);
        }
      }
    }
    if wanted.is_empty() {
      break;
    }

    let found = store.get_persons(wanted).await.map_err(Error::store)?;
    layer = found.iter().map(|p| p.person_id).collect();
    persons.extend(found.into_iter().map(|p| (p.person_id, p)));
  }

  Ok(assemble(root_id, &persons, &parents_of, generations))
}

fn assemble(
  id: Uuid,
  persons: &HashMap<Uuid, Person>,
  parents_of: &HashMap<Uuid, Vec<Uuid>>,
  remaining: usize,
) -> Option<AncestorNode> {
  let person = persons.get(&id)?.clone();
  let parents = if remaining > 1 {
    parents_of
      .get(&id)
      .into_iter()
      .flatten()
      .filter_map(|p| assemble(*p, persons, parents_of, remaining - 1))
      .collect()
  } else {
    Vec::new()
  };
  Some(AncestorNode { person, parents })
}

// ─── Layout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedigreeOptions {
  /// Width shared by every generation; slots halve in width per generation.
  pub total_width:       f64,
  pub generation_height: f64,
}

impl Default for PedigreeOptions {
  fn default() -> Self {
    Self { total_width: 1600.0, generation_height: 160.0 }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedAncestor {
  pub person:     Person,
  pub x:          f64,
  /// Negative for ancestors: they render above the root.
  pub y:          f64,
  pub generation: usize,
  pub parent_ids: Vec<Uuid>,
}

/// Position every node of `tree` as a binary pedigree. Pure: the same tree
/// always yields the same coordinates.
pub fn layout_ancestor_tree(
  tree: Option<&AncestorNode>,
  options: &PedigreeOptions,
) -> Vec<PositionedAncestor> {
  let mut out = Vec::new();
  if let Some(root) = tree {
    place(root, 0, 0, 1, options, &mut out);
  }
  out
}

fn place(
  node: &AncestorNode,
  depth: usize,
  slot: usize,
  max_slots: usize,
  options: &PedigreeOptions,
  out: &mut Vec<PositionedAncestor>,
) {
  let slot_width = options.total_width / max_slots as f64;
  let x = (slot as f64 - (max_slots as f64 - 1.0) / 2.0) * slot_width;
  let y = -(depth as f64) * options.generation_height;

  out.push(PositionedAncestor {
    person: node.person.clone(),
    x,
    y,
    generation: depth,
    parent_ids: node.parents.iter().take(2).map(|p| p.person.person_id).collect(),
  });

  for (index, parent) in node.parents.iter().take(2).enumerate() {
    place(parent, depth + 1, slot * 2 + index, max_slots * 2, options, out);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::Utc;

  use super::*;
  use crate::{
    memory::MemoryStore,
    person::{NewPerson, Sex},
    relationship::{NewRelationship, RelationshipType},
    service::RelationshipService,
  };

  fn person(name: &str) -> Person {
    let now = Utc::now();
    Person {
      person_id:   Uuid::new_v4(),
      given_names: Some(name.into()),
      surname:     None,
      sex:         Sex::Unknown,
      privacy:     Default::default(),
      birth_date:  None,
      death_date:  None,
      created_at:  now,
      updated_at:  now,
      deleted_at:  None,
    }
  }

  fn leaf(name: &str) -> AncestorNode {
    AncestorNode { person: person(name), parents: Vec::new() }
  }

  // ─── Layout ──────────────────────────────────────────────────────────────

  #[test]
  fn no_tree_means_no_nodes() {
    assert!(layout_ancestor_tree(None, &PedigreeOptions::default()).is_empty());
  }

  #[test]
  fn root_sits_at_origin() {
    let root = leaf("Root");
    let nodes = layout_ancestor_tree(Some(&root), &PedigreeOptions::default());
    assert_eq!(nodes.len(), 1);
    assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    assert!(nodes[0].parent_ids.is_empty());
  }

  #[test]
  fn two_parents_sit_above_and_apart() {
    let root = AncestorNode {
      person:  person("Root"),
      parents: vec![leaf("Father"), leaf("Mother")],
    };
    let opts = PedigreeOptions { total_width: 800.0, generation_height: 100.0 };
    let nodes = layout_ancestor_tree(Some(&root), &opts);

    assert_eq!(nodes.len(), 3);
    let (father, mother) = (&nodes[1], &nodes[2]);
    assert_eq!(father.y, -100.0);
    assert_eq!(mother.y, father.y);
    assert_eq!(father.x, -200.0);
    assert_eq!(mother.x, 200.0);
    assert_eq!(
      nodes[0].parent_ids,
      vec![father.person.person_id, mother.person.person_id]
    );
  }

  #[test]
  fn extra_parents_are_neither_placed_nor_linked() {
    let root = AncestorNode {
      person:  person("Root"),
      parents: vec![leaf("A"), leaf("B"), leaf("C")],
    };
    let nodes = layout_ancestor_tree(Some(&root), &PedigreeOptions::default());

    assert_eq!(nodes.len(), 3);
    assert_eq!(
      nodes[0].parent_ids,
      vec![root.parents[0].person.person_id, root.parents[1].person.person_id]
    );
    let placed: Vec<Uuid> = nodes.iter().map(|n| n.person.person_id).collect();
    assert!(!placed.contains(&root.parents[2].person.person_id));
  }

  #[test]
  fn slots_double_per_generation() {
    let root = AncestorNode {
      person:  person("Root"),
      parents: vec![
        AncestorNode { person: person("F"), parents: vec![leaf("FF"), leaf("FM")] },
        AncestorNode { person: person("M"), parents: vec![leaf("MF")] },
      ],
    };
    let opts = PedigreeOptions { total_width: 800.0, generation_height: 100.0 };
    let nodes = layout_ancestor_tree(Some(&root), &opts);
    let xs: Vec<f64> = nodes.iter().filter(|n| n.generation == 2).map(|n| n.x).collect();
    // Four slots of width 200 centred on zero: -300, -100, 100, (300 unused).
    assert_eq!(xs, vec![-300.0, -100.0, 100.0]);
    assert!(nodes.iter().filter(|n| n.generation == 2).all(|n| n.y == -200.0));

    let again = layout_ancestor_tree(Some(&root), &opts);
    assert_eq!(nodes, again);
  }

  // ─── Builder ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn builder_prefers_biological_and_caps_generations() {
    let svc = RelationshipService::new(Arc::new(MemoryStore::new()));
    let add = |name: &'static str| {
      let svc = svc.clone();
      async move {
        svc
          .store()
          .add_person(NewPerson::named(name, "Tree", Sex::Unknown))
          .await
          .unwrap()
          .person_id
      }
    };
    let root = add("Root").await;
    let step = add("Step").await;
    let father = add("Father").await;
    let mother = add("Mother").await;
    let godparent = add("God").await;
    let grandfather = add("Grandfather").await;
    let great = add("Great").await;

    for (parent, child, kind) in [
      (step, root, RelationshipType::StepParent),
      (father, root, RelationshipType::BiologicalParent),
      (godparent, root, RelationshipType::Godparent),
      (mother, root, RelationshipType::BiologicalParent),
      (grandfather, father, RelationshipType::AdoptiveParent),
      (great, grandfather, RelationshipType::BiologicalParent),
    ] {
      svc.create(NewRelationship::new(parent, child, kind)).await.unwrap();
    }

    let tree = build_ancestor_tree(svc.store(), root, 3).await.unwrap().unwrap();
    let parent_ids: Vec<Uuid> = tree.parents.iter().map(|n| n.person.person_id).collect();
    assert_eq!(parent_ids, vec![father, mother]);
    assert_eq!(tree.parents[0].parents[0].person.person_id, grandfather);
    assert!(tree.parents[0].parents[0].parents.is_empty());

    let only_root = build_ancestor_tree(svc.store(), root, 0).await.unwrap().unwrap();
    assert!(only_root.parents.is_empty());

    assert!(build_ancestor_tree(svc.store(), Uuid::new_v4(), 4).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn builder_terminates_on_cycles() {
    let store = MemoryStore::new();
    let a = store.add_person(NewPerson::default()).await.unwrap().person_id;
    let b = store.add_person(NewPerson::default()).await.unwrap().person_id;
    store
      .add_relationship(NewRelationship::new(a, b, RelationshipType::BiologicalParent))
      .await
      .unwrap();
    store
      .add_relationship(NewRelationship::new(b, a, RelationshipType::BiologicalParent))
      .await
      .unwrap();

    let tree = build_ancestor_tree(&store, a, MAX_ANCESTOR_GENERATIONS + 5)
      .await
      .unwrap()
      .unwrap();
    let mut depth = 0;
    let mut node = &tree;
    while let Some(parent) = node.parents.first() {
      depth += 1;
      node = parent;
    }
    assert_eq!(depth, MAX_ANCESTOR_GENERATIONS - 1);
  }
}
