//! Lineage HTTP server: configuration loading and application assembly.
//!
//! The binary in `main.rs` is a thin wrapper: it parses flags, installs the
//! tracing subscriber and hands a store to [`app`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use lineage_api::{LayoutSettings, api_router};
use lineage_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Environment variables with this prefix override the config file, e.g.
/// `LINEAGE_PORT=9000` or `LINEAGE_LAYOUT__DEFAULT_GENERATIONS=6`.
pub const ENV_PREFIX: &str = "LINEAGE";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `lineage.toml` and the
/// environment. Every field has a default, so an empty config is valid.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub layout:     LayoutSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("lineage.db"),
      layout:     LayoutSettings::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional, TOML) under `LINEAGE_`-prefixed environment
  /// variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>, layout: LayoutSettings) -> Router {
  Router::new()
    .nest("/api", api_router(store, layout))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::FileFormat;
  use lineage_core::{layout::FamilyLayoutOptions, pedigree::PedigreeOptions};
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.layout.pedigree, PedigreeOptions::default());
    assert_eq!(cfg.layout.default_generations, 4);
  }

  #[test]
  fn partial_layout_table_keeps_other_defaults() {
    let cfg = parse(
      r#"
        port = 9090

        [layout]
        default_generations = 6

        [layout.family]
        horizontal_spacing = 300.0
      "#,
    );
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.layout.default_generations, 6);
    assert_eq!(cfg.layout.family.horizontal_spacing, 300.0);
    assert_eq!(
      cfg.layout.family.vertical_spacing,
      FamilyLayoutOptions::default().vertical_spacing
    );
  }

  #[test]
  fn missing_config_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/lineage.toml")).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("lineage.db"));
  }

  #[test]
  fn tilde_expands_only_as_a_prefix() {
    let plain = Path::new("data/~/lineage.db");
    assert_eq!(expand_tilde(plain), plain.to_path_buf());
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(Arc::new(store), LayoutSettings::default());

    let resp = app
      .clone()
      .oneshot(Request::builder().uri("/api/persons").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
      .oneshot(Request::builder().uri("/persons").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
