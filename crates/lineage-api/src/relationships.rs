//! Handlers for `/relationships` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/relationships` | `?page=1&limit=50`, limit at most 500 |
//! | `POST`   | `/relationships` | Body: [`NewRelationship`]; runs partnership inference |
//! | `GET`    | `/relationships/{id}` | 404 if missing or deleted |
//! | `PATCH`  | `/relationships/{id}` | Body: [`RelationshipPatch`] |
//! | `DELETE` | `/relationships/{id}` | Soft delete |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use lineage_core::{
  relationship::{NewRelationship, Relationship, RelationshipPatch},
  service::Page,
  store::FamilyStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

const DEFAULT_PAGE_LIMIT: usize = 50;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:  Option<usize>,
  pub limit: Option<usize>,
}

/// `GET /relationships[?page=<n>&limit=<n>]`
pub async fn list<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Relationship>>, ApiError> {
  let Query(params) = params?;
  let page = state
    .service()
    .list(params.page.unwrap_or(1), params.limit.unwrap_or(DEFAULT_PAGE_LIMIT))
    .await?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /relationships`
///
/// Responds with the created edge plus any partnerships inferred from it.
pub async fn create<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  body: Result<Json<NewRelationship>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(input) = body?;
  let created = state.service().create_with_inference(input).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Single edge ──────────────────────────────────────────────────────────────

/// `GET /relationships/{id}`
pub async fn get_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Relationship>, ApiError> {
  Ok(Json(state.service().get(id).await?))
}

/// `PATCH /relationships/{id}`
pub async fn update_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  body: Result<Json<RelationshipPatch>, JsonRejection>,
) -> Result<Json<Relationship>, ApiError> {
  let Json(patch) = body?;
  Ok(Json(state.service().update(id, patch).await?))
}

/// `DELETE /relationships/{id}`
pub async fn delete_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.service().delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
