//! Read-only derivation endpoints: extended kinship, the ancestor pedigree and
//! the generational family graph.
//!
//! None of these fail for missing or disconnected data. An unknown person
//! simply yields empty buckets or an empty pedigree.

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use lineage_core::{
  Error,
  kinship::{ExtendedFamily, extended_family},
  layout::{FamilyLayout, layout_family_graph},
  pedigree::{AncestorNode, PositionedAncestor, build_ancestor_tree, layout_ancestor_tree},
  person::Person,
  relationship::Relationship,
  store::{FamilyStore, RelationshipQuery},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Extended family ─────────────────────────────────────────────────────────

/// `GET /persons/{id}/extended-family`
pub async fn extended<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ExtendedFamily>, ApiError> {
  Ok(Json(extended_family(state.store.as_ref(), id).await?))
}

// ─── Ancestors ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AncestorParams {
  pub generations: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AncestorView {
  /// `None` when the root person is missing or deleted.
  pub tree:  Option<AncestorNode>,
  pub nodes: Vec<PositionedAncestor>,
}

/// `GET /persons/{id}/ancestors[?generations=<n>]`
pub async fn ancestors<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  params: Result<Query<AncestorParams>, QueryRejection>,
) -> Result<Json<AncestorView>, ApiError> {
  let Query(params) = params?;
  let generations = params.generations.unwrap_or(state.layout.default_generations);
  let tree = build_ancestor_tree(state.store.as_ref(), id, generations).await?;
  let nodes = layout_ancestor_tree(tree.as_ref(), &state.layout.pedigree);
  Ok(Json(AncestorView { tree, nodes }))
}

// ─── Family graph ────────────────────────────────────────────────────────────

/// `GET /family-graph`
///
/// Lays out every live person and relationship in the store.
pub async fn graph<S: FamilyStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<FamilyLayout>, ApiError> {
  let persons = state.store.list_persons().await.map_err(Error::store)?;
  let edges = state
    .store
    .find_relationships(RelationshipQuery::default())
    .await
    .map_err(Error::store)?;
  Ok(Json(layout_family_graph(&persons, &edges, &state.layout.family)))
}

/// A caller-supplied graph for [`layout_snapshot`].
#[derive(Debug, Deserialize)]
pub struct GraphSnapshot {
  pub persons:       Vec<Person>,
  #[serde(default)]
  pub relationships: Vec<Relationship>,
}

/// `POST /family-graph/layout`
pub async fn layout_snapshot<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  body: Result<Json<GraphSnapshot>, JsonRejection>,
) -> Result<Json<FamilyLayout>, ApiError> {
  let Json(snapshot) = body?;
  Ok(Json(layout_family_graph(
    &snapshot.persons,
    &snapshot.relationships,
    &state.layout.family,
  )))
}
