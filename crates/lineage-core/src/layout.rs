//! Generational layout for an arbitrary family graph.
//!
//! Unlike the pedigree, the input here need not be tree-shaped: multiple
//! partners, remarriage and disconnected components are all allowed. Rows are
//! generations; parents always sit strictly above their children.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{person::Person, relationship::Relationship};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyLayoutOptions {
  pub horizontal_spacing: f64,
  pub vertical_spacing:   f64,
  /// Used to attach parent-child connectors to node edges.
  pub node_height:        f64,
}

impl Default for FamilyLayoutOptions {
  fn default() -> Self {
    Self { horizontal_spacing: 220.0, vertical_spacing: 160.0, node_height: 80.0 }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
  pub person:     Person,
  pub generation: i64,
  pub x:          f64,
  pub y:          f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
  ParentChild,
  Partner,
}

/// A line segment for the renderer. For parent-child connectors `from` is the
/// child and `to` the parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
  pub kind:     ConnectorKind,
  pub from:     Uuid,
  pub to:       Uuid,
  pub x1:       f64,
  pub y1:       f64,
  pub x2:       f64,
  pub y2:       f64,
  /// Partner connectors only: true when the partnership was inferred from a
  /// shared child rather than recorded.
  pub inferred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FamilyLayout {
  pub nodes:       Vec<LayoutNode>,
  pub connections: Vec<Connector>,
}

// ─── Adjacency ───────────────────────────────────────────────────────────────

/// Index-based adjacency in supply order.
struct Graph<'a> {
  persons:  Vec<&'a Person>,
  parents:  Vec<Vec<usize>>,
  children: Vec<Vec<usize>>,
  /// `(partner, inferred)`
  partners: Vec<Vec<(usize, bool)>>,
}

fn push_unique<T: PartialEq>(v: &mut Vec<T>, item: T) {
  if !v.contains(&item) {
    v.push(item);
  }
}

impl<'a> Graph<'a> {
  fn build(persons: &'a [Person], edges: &[Relationship]) -> Self {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut kept: Vec<&Person> = Vec::new();
    for p in persons.iter().filter(|p| !p.is_deleted()) {
      if !index.contains_key(&p.person_id) {
        index.insert(p.person_id, kept.len());
        kept.push(p);
      }
    }

    let n = kept.len();
    let mut graph = Self {
      persons:  kept,
      parents:  vec![Vec::new(); n],
      children: vec![Vec::new(); n],
      partners: vec![Vec::new(); n],
    };

    for rel in edges.iter().filter(|r| !r.is_deleted()) {
      let (Some(&a), Some(&b)) = (index.get(&rel.person_a_id), index.get(&rel.person_b_id))
      else {
        continue;
      };
      if a == b {
        continue;
      }
      if rel.kind.is_partner() {
        graph.link_partners(a, b, false);
      } else if rel.kind.is_qualifying_parent() {
        push_unique(&mut graph.parents[b], a);
        push_unique(&mut graph.children[a], b);
      }
    }

    // Co-parents without a recorded partnership still share a row.
    for child in 0..n {
      let parents = graph.parents[child].clone();
      for (i, &p) in parents.iter().enumerate() {
        for &q in &parents[i + 1..] {
          if !graph.partners[p].iter().any(|(other, _)| *other == q) {
            graph.link_partners(p, q, true);
          }
        }
      }
    }
    graph
  }

  fn link_partners(&mut self, a: usize, b: usize, inferred: bool) {
    if !self.partners[a].iter().any(|(o, _)| *o == b) {
      self.partners[a].push((b, inferred));
    }
    if !self.partners[b].iter().any(|(o, _)| *o == a) {
      self.partners[b].push((a, inferred));
    }
  }

  fn len(&self) -> usize { self.persons.len() }

  /// Longest-path generations from the roots, then relaxed to a fixed point.
  fn generations(&self) -> Vec<i64> {
    let n = self.len();
    let cap = n as i64;
    let mut generation = vec![0_i64; n];
    let mut reached = vec![false; n];
    let mut queue = VecDeque::new();

    for i in 0..n {
      if self.parents[i].is_empty() {
        reached[i] = true;
        queue.push_back(i);
      }
    }

    while let Some(i) = queue.pop_front() {
      let g = generation[i];
      for &(p, _) in &self.partners[i] {
        if !reached[p] || generation[p] < g {
          reached[p] = true;
          generation[p] = g;
          queue.push_back(p);
        }
      }
      let next = g + 1;
      if next > cap {
        continue;
      }
      for &c in &self.children[i] {
        if !reached[c] || generation[c] < next {
          reached[c] = true;
          generation[c] = next;
          queue.push_back(c);
        }
      }
    }

    self.correct(&mut generation);
    generation
  }

  /// Repair inconsistencies left by partner pulling. Every rule only ever
  /// increases a generation, so the loop either settles or runs into the cap.
  fn correct(&self, generation: &mut [i64]) {
    let n = self.len();
    let max_passes = 4 * n + 8;
    for _ in 0..max_passes {
      let mut changed = false;

      for i in 0..n {
        if let Some(min_child) = self.children[i].iter().map(|&c| generation[c]).min()
          && generation[i] < min_child - 1
        {
          generation[i] = min_child - 1;
          changed = true;
        }
      }

      for i in 0..n {
        for &p in &self.parents[i] {
          if generation[i] < generation[p] + 1 {
            generation[i] = generation[p] + 1;
            changed = true;
          }
        }
      }

      for i in 0..n {
        for &(p, _) in &self.partners[i] {
          if generation[i] < generation[p] {
            generation[i] = generation[p];
            changed = true;
          }
        }
      }

      if !changed {
        return;
      }
    }
    warn!(
      persons = n,
      passes = max_passes,
      "generation correction did not converge; family graph likely contains a cycle"
    );
  }
}

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Lay out `persons` and `edges` as generation rows.
///
/// Total and pure: soft-deleted rows, self-edges and edges that reference
/// persons not in `persons` are ignored, and the same input always produces
/// the same layout.
pub fn layout_family_graph(
  persons: &[Person],
  edges: &[Relationship],
  options: &FamilyLayoutOptions,
) -> FamilyLayout {
  let graph = Graph::build(persons, edges);
  let n = graph.len();
  if n == 0 {
    return FamilyLayout::default();
  }
  let generation = graph.generations();

  let mut rows: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
  for i in 0..n {
    rows.entry(generation[i]).or_default().push(i);
  }

  let mut position: Vec<(f64, f64)> = vec![(0.0, 0.0); n];
  let mut order: Vec<usize> = Vec::with_capacity(n);
  let mut placed = vec![false; n];
  for (g, members) in &rows {
    let mut row = Vec::with_capacity(members.len());
    for &i in members {
      if placed[i] {
        continue;
      }
      placed[i] = true;
      row.push(i);
      for &(p, _) in &graph.partners[i] {
        if !placed[p] && generation[p] == *g {
          placed[p] = true;
          row.push(p);
        }
      }
    }

    let centre = (row.len() as f64 - 1.0) / 2.0;
    let y = *g as f64 * options.vertical_spacing;
    for (k, &i) in row.iter().enumerate() {
      position[i] = ((k as f64 - centre) * options.horizontal_spacing, y);
    }
    order.extend(row);
  }

  let half = options.node_height / 2.0;
  let mut connections = Vec::new();
  let mut partner_pairs: Vec<(usize, usize)> = Vec::new();
  for &i in &order {
    let (x, y) = position[i];
    let id = graph.persons[i].person_id;
    for &p in &graph.parents[i] {
      let (px, py) = position[p];
      connections.push(Connector {
        kind: ConnectorKind::ParentChild,
        from: id,
        to: graph.persons[p].person_id,
        x1: x,
        y1: y - half,
        x2: px,
        y2: py + half,
        inferred: false,
      });
    }
    for &(p, inferred) in &graph.partners[i] {
      let pair = (i.min(p), i.max(p));
      if generation[p] != generation[i] || partner_pairs.contains(&pair) {
        continue;
      }
      partner_pairs.push(pair);
      let (px, py) = position[p];
      connections.push(Connector {
        kind: ConnectorKind::Partner,
        from: id,
        to: graph.persons[p].person_id,
        x1: x,
        y1: y,
        x2: px,
        y2: py,
        inferred,
      });
    }
  }

  let nodes = order
    .into_iter()
    .map(|i| LayoutNode {
      person:     graph.persons[i].clone(),
      generation: generation[i],
      x:          position[i].0,
      y:          position[i].1,
    })
    .collect();

  FamilyLayout { nodes, connections }
}
