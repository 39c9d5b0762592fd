//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use lineage_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{LayoutSettings, api_router};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  api_router(Arc::new(store), LayoutSettings::default())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header("content-type", "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn add_person(app: &Router, given: &str, sex: &str) -> String {
  let (status, body) = call(
    app,
    "POST",
    "/persons",
    Some(json!({ "given_names": given, "surname": "Test", "sex": sex })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["person_id"].as_str().unwrap().to_owned()
}

async fn relate(app: &Router, a: &str, b: &str, kind: &str) -> (StatusCode, Value) {
  call(
    app,
    "POST",
    "/relationships",
    Some(json!({ "person_a_id": a, "person_b_id": b, "type": kind })),
  )
  .await
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn person_lifecycle() {
  let app = app().await;
  let id = add_person(&app, "Ada", "female").await;

  let (status, body) = call(&app, "GET", &format!("/persons/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["given_names"], "Ada");
  assert_eq!(body["sex"], "female");

  let (status, _) = call(&app, "DELETE", &format!("/persons/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = call(&app, "GET", &format!("/persons/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["code"], "NOT_FOUND");

  let (_, list) = call(&app, "GET", "/persons", None).await;
  assert_eq!(list, json!([]));
}

#[tokio::test]
async fn inverted_life_dates_are_rejected() {
  let app = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/persons",
    Some(json!({ "birth_date": "1900-01-01", "death_date": "1850-01-01" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ─── Relationships ───────────────────────────────────────────────────────────

#[tokio::test]
async fn second_parent_response_carries_inferred_marriage() {
  let app = app().await;
  let mum = add_person(&app, "Mum", "female").await;
  let dad = add_person(&app, "Dad", "male").await;
  let kid = add_person(&app, "Kid", "unknown").await;

  let (status, body) = relate(&app, &mum, &kid, "biological_parent").await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["inferred_partnerships"], json!([]));

  let (status, body) = relate(&app, &dad, &kid, "biological_parent").await;
  assert_eq!(status, StatusCode::CREATED);
  let inferred = body["inferred_partnerships"].as_array().unwrap();
  assert_eq!(inferred.len(), 1);
  assert_eq!(inferred[0]["type"], "marriage");
  assert_eq!(inferred[0]["person_a_id"], dad.as_str());
  assert_eq!(inferred[0]["person_b_id"], mum.as_str());

  let (_, page) = call(&app, "GET", "/relationships?page=1&limit=10", None).await;
  assert_eq!(page["total"], 3);
  assert_eq!(page["page"], 1);
  assert_eq!(page["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn error_codes_map_to_statuses() {
  let app = app().await;
  let a = add_person(&app, "A", "unknown").await;
  let b = add_person(&app, "B", "unknown").await;

  let (status, body) = relate(&app, &a, &a, "marriage").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "VALIDATION_ERROR");

  let missing = uuid::Uuid::new_v4().to_string();
  let (status, body) = relate(&app, &a, &missing, "marriage").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["code"], "NOT_FOUND");

  relate(&app, &a, &b, "marriage").await;
  let (status, body) = relate(&app, &b, &a, "marriage").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["code"], "CONFLICT");

  let (status, body) = relate(&app, &a, &b, "pen_pal").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "VALIDATION_ERROR");

  let (status, _) = call(&app, "GET", "/relationships?limit=501", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call(&app, "GET", "/relationships?page=0", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_and_delete_relationship() {
  let app = app().await;
  let a = add_person(&app, "A", "unknown").await;
  let b = add_person(&app, "B", "unknown").await;
  let (_, created) = relate(&app, &a, &b, "engagement").await;
  let id = created["relationship"]["relationship_id"].as_str().unwrap().to_owned();

  let (status, body) = call(
    &app,
    "PATCH",
    &format!("/relationships/{id}"),
    Some(json!({ "type": "marriage", "start_date": "1990-05-01" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["type"], "marriage");
  assert_eq!(body["start_date"], "1990-05-01");
  assert_eq!(body["person_a_id"], a.as_str());

  let (status, body) = call(
    &app,
    "PATCH",
    &format!("/relationships/{id}"),
    Some(json!({ "end_date": "1980-01-01" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "VALIDATION_ERROR");

  let (status, body) = call(
    &app,
    "PATCH",
    &format!("/relationships/{id}"),
    Some(json!({ "start_date": null, "place": "Bath" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["start_date"].is_null());
  assert_eq!(body["place"], "Bath");
  assert_eq!(body["type"], "marriage");

  let (status, _) = call(&app, "DELETE", &format!("/relationships/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, "DELETE", &format!("/relationships/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&app, "GET", &format!("/relationships/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Per-person views and derivations ────────────────────────────────────────

#[tokio::test]
async fn siblings_and_grouped_relationships() {
  let app = app().await;
  let mum = add_person(&app, "Mum", "female").await;
  let kid = add_person(&app, "Kid", "male").await;
  let sis = add_person(&app, "Sis", "female").await;
  relate(&app, &mum, &kid, "biological_parent").await;
  relate(&app, &mum, &sis, "adoptive_parent").await;

  let (status, body) = call(&app, "GET", &format!("/persons/{kid}/siblings"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([sis]));

  let (_, grouped) = call(&app, "GET", &format!("/persons/{mum}/relationships"), None).await;
  assert_eq!(grouped["biological_parent"].as_array().unwrap().len(), 1);
  assert_eq!(grouped["adoptive_parent"].as_array().unwrap().len(), 1);

  let missing = uuid::Uuid::new_v4();
  let (status, _) = call(&app, "GET", &format!("/persons/{missing}/siblings"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extended_family_labels_by_sex() {
  let app = app().await;
  let gran = add_person(&app, "Gran", "female").await;
  let mum = add_person(&app, "Mum", "female").await;
  let me = add_person(&app, "Me", "unknown").await;
  relate(&app, &gran, &mum, "biological_parent").await;
  relate(&app, &mum, &me, "biological_parent").await;

  let (status, body) = call(&app, "GET", &format!("/persons/{me}/extended-family"), None).await;
  assert_eq!(status, StatusCode::OK);
  let grandparents = body["grandparents"].as_array().unwrap();
  assert_eq!(grandparents.len(), 1);
  assert_eq!(grandparents[0]["label"], "grandmother");
  assert_eq!(grandparents[0]["person"]["person_id"], gran.as_str());

  // Unknown people degrade to empty buckets rather than an error.
  let missing = uuid::Uuid::new_v4();
  let (status, body) =
    call(&app, "GET", &format!("/persons/{missing}/extended-family"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["cousins"], json!([]));
}

#[tokio::test]
async fn ancestors_are_laid_out_above_the_root() {
  let app = app().await;
  let dad = add_person(&app, "Dad", "male").await;
  let mum = add_person(&app, "Mum", "female").await;
  let me = add_person(&app, "Me", "unknown").await;
  relate(&app, &dad, &me, "biological_parent").await;
  relate(&app, &mum, &me, "biological_parent").await;

  let (status, body) =
    call(&app, "GET", &format!("/persons/{me}/ancestors?generations=2"), None).await;
  assert_eq!(status, StatusCode::OK);
  let nodes = body["nodes"].as_array().unwrap();
  assert_eq!(nodes.len(), 3);
  assert_eq!(nodes[0]["person"]["person_id"], me.as_str());
  assert_eq!(nodes[0]["y"], 0.0);
  assert_eq!(nodes[1]["y"], -160.0);
  assert_eq!(nodes[1]["x"], -400.0);
  assert_eq!(nodes[2]["x"], 400.0);

  let (_, body) = call(&app, "GET", &format!("/persons/{me}/ancestors?generations=1"), None).await;
  assert_eq!(body["nodes"].as_array().unwrap().len(), 1);

  let missing = uuid::Uuid::new_v4();
  let (status, body) = call(&app, "GET", &format!("/persons/{missing}/ancestors"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["tree"], Value::Null);
  assert_eq!(body["nodes"], json!([]));
}

#[tokio::test]
async fn family_graph_places_children_below_parents() {
  let app = app().await;
  let mum = add_person(&app, "Mum", "female").await;
  let kid = add_person(&app, "Kid", "male").await;
  relate(&app, &mum, &kid, "biological_parent").await;

  let (status, body) = call(&app, "GET", "/family-graph", None).await;
  assert_eq!(status, StatusCode::OK);
  let nodes = body["nodes"].as_array().unwrap();
  let y_of = |id: &str| {
    nodes
      .iter()
      .find(|n| n["person"]["person_id"] == id)
      .and_then(|n| n["y"].as_f64())
      .unwrap()
  };
  assert!(y_of(&kid) > y_of(&mum));
  let connections = body["connections"].as_array().unwrap();
  assert_eq!(connections.len(), 1);
  assert_eq!(connections[0]["kind"], "parent-child");
}

#[tokio::test]
async fn layout_endpoint_accepts_a_snapshot() {
  let app = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/family-graph/layout",
    Some(json!({ "persons": [], "relationships": [] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "nodes": [], "connections": [] }));

  let (status, body) =
    call(&app, "POST", "/family-graph/layout", Some(json!({ "persons": 7 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "VALIDATION_ERROR");
}
