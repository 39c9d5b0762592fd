//! JSON REST API for Lineage.
//!
//! Exposes an axum [`Router`] backed by any [`lineage_core::store::FamilyStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lineage_api::api_router(store.clone(), LayoutSettings::default()))
//! ```

pub mod error;
pub mod family;
pub mod persons;
pub mod relationships;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use lineage_core::{
  layout::FamilyLayoutOptions, pedigree::PedigreeOptions, service::RelationshipService,
  store::FamilyStore,
};
use serde::{Deserialize, Serialize};

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Layout tuning shared by the derivation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
  pub pedigree:            PedigreeOptions,
  pub family:              FamilyLayoutOptions,
  /// Generations returned by `/persons/{id}/ancestors` when the query omits
  /// `generations`. Counts the root.
  pub default_generations: usize,
}

impl Default for LayoutSettings {
  fn default() -> Self {
    Self {
      pedigree:            PedigreeOptions::default(),
      family:              FamilyLayoutOptions::default(),
      default_generations: 4,
    }
  }
}

/// Shared state threaded through all axum handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub layout: Arc<LayoutSettings>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), layout: Arc::clone(&self.layout) }
  }
}

impl<S: FamilyStore> ApiState<S> {
  pub fn service(&self) -> RelationshipService<S> {
    RelationshipService::new(Arc::clone(&self.store))
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, layout: LayoutSettings) -> Router<()>
where
  S: FamilyStore + Clone + 'static,
{
  let state = ApiState { store, layout: Arc::new(layout) };
  Router::new()
    // Persons
    .route("/persons", get(persons::list::<S>).post(persons::create::<S>))
    .route("/persons/{id}", get(persons::get_one::<S>).delete(persons::delete_one::<S>))
    .route("/persons/{id}/relationships", get(persons::relationships::<S>))
    .route("/persons/{id}/siblings", get(persons::siblings::<S>))
    .route("/persons/{id}/extended-family", get(family::extended::<S>))
    .route("/persons/{id}/ancestors", get(family::ancestors::<S>))
    // Relationships
    .route(
      "/relationships",
      get(relationships::list::<S>).post(relationships::create::<S>),
    )
    .route(
      "/relationships/{id}",
      get(relationships::get_one::<S>)
        .patch(relationships::update_one::<S>)
        .delete(relationships::delete_one::<S>),
    )
    // Family graph
    .route("/family-graph", get(family::graph::<S>))
    .route("/family-graph/layout", post(family::layout_snapshot::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
