//! Person: the node type of the family graph.
//!
//! Persons are owned by the person service; the graph engine only reads them
//! and checks their existence and soft-delete state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Recorded sex of a person. Used for labels only, never for derivation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sex {
  Male,
  Female,
  #[default]
  Unknown,
}

/// Who may see a person record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Privacy {
  #[default]
  Public,
  Restricted,
  Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub person_id:   Uuid,
  pub given_names: Option<String>,
  pub surname:     Option<String>,
  pub sex:         Sex,
  pub privacy:     Privacy,
  pub birth_date:  Option<NaiveDate>,
  pub death_date:  Option<NaiveDate>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  /// Set when the person is soft-deleted. Deleted persons are invisible to
  /// every derivation.
  pub deleted_at:  Option<DateTime<Utc>>,
}

impl Person {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  /// Given names and surname joined, or `"Unknown"` when neither is known.
  pub fn display_name(&self) -> String {
    let parts: Vec<&str> = [self.given_names.as_deref(), self.surname.as_deref()]
      .into_iter()
      .flatten()
      .filter(|s| !s.is_empty())
      .collect();
    if parts.is_empty() {
      "Unknown".to_owned()
    } else {
      parts.join(" ")
    }
  }
}

/// Input to [`crate::store::FamilyStore::add_person`]. Ids and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
  pub given_names: Option<String>,
  pub surname:     Option<String>,
  #[serde(default)]
  pub sex:         Sex,
  #[serde(default)]
  pub privacy:     Privacy,
  pub birth_date:  Option<NaiveDate>,
  pub death_date:  Option<NaiveDate>,
}

impl NewPerson {
  pub fn named(given: &str, surname: &str, sex: Sex) -> Self {
    Self {
      given_names: Some(given.to_owned()),
      surname: Some(surname.to_owned()),
      sex,
      ..Self::default()
    }
  }
}
