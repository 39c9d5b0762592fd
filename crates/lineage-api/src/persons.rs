//! Handlers for `/persons` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/persons` | Live persons in insertion order |
//! | `POST`   | `/persons` | Body: [`NewPerson`] |
//! | `GET`    | `/persons/{id}` | 404 if missing or deleted |
//! | `DELETE` | `/persons/{id}` | Soft delete; 404 if missing or deleted |
//! | `GET`    | `/persons/{id}/relationships` | Live edges grouped by type |
//! | `GET`    | `/persons/{id}/siblings` | Ids sharing a qualifying parent |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use lineage_core::{
  Error,
  person::{NewPerson, Person},
  relationship::{Relationship, RelationshipType},
  store::FamilyStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /persons`
pub async fn list<S: FamilyStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Person>>, ApiError> {
  let persons = state.store.list_persons().await.map_err(Error::store)?;
  Ok(Json(persons))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /persons`
pub async fn create<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  body: Result<Json<NewPerson>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(input) = body?;
  if let (Some(birth), Some(death)) = (input.birth_date, input.death_date)
    && death < birth
  {
    return Err(Error::Validation("death_date must not precede birth_date".into()).into());
  }
  let person = state.store.add_person(input).await.map_err(Error::store)?;
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /persons/{id}`
pub async fn get_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .get_person(id)
    .await
    .map_err(Error::store)?
    .filter(|p| !p.is_deleted())
    .ok_or(Error::PersonNotFound(id))?;
  Ok(Json(person))
}

/// `DELETE /persons/{id}`
///
/// Relationship rows are left alone. Per-person views and every derivation
/// skip edges whose other endpoint is deleted.
pub async fn delete_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_person(id).await.map_err(Error::store)? {
    return Err(Error::PersonNotFound(id).into());
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Per-person relationship views ───────────────────────────────────────────

/// `GET /persons/{id}/relationships`
pub async fn relationships<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<BTreeMap<RelationshipType, Vec<Relationship>>>, ApiError> {
  Ok(Json(state.service().get_for_person(id).await?))
}

/// `GET /persons/{id}/siblings`
pub async fn siblings<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
  Ok(Json(state.service().get_siblings(id).await?))
}
