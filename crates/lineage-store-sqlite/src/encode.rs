//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, enums are
//! their snake_case names and UUIDs are hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use lineage_core::{
  person::{Person, Privacy, Sex},
  relationship::{Relationship, RelationshipType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_sex(sex: Sex) -> &'static str { sex.into() }

pub fn encode_privacy(privacy: Privacy) -> &'static str { privacy.into() }

pub fn encode_kind(kind: RelationshipType) -> &'static str { kind.into() }

fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, given_names, surname, sex, privacy, \
   birth_date, death_date, created_at, updated_at, deleted_at";

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub person_id:   String,
  pub given_names: Option<String>,
  pub surname:     Option<String>,
  pub sex:         String,
  pub privacy:     String,
  pub birth_date:  Option<String>,
  pub death_date:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
  pub deleted_at:  Option<String>,
}

impl RawPerson {
  /// Map a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:   row.get(0)?,
      given_names: row.get(1)?,
      surname:     row.get(2)?,
      sex:         row.get(3)?,
      privacy:     row.get(4)?,
      birth_date:  row.get(5)?,
      death_date:  row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
      deleted_at:  row.get(9)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:   decode_uuid(&self.person_id)?,
      given_names: self.given_names,
      surname:     self.surname,
      sex:         decode_enum("sex", &self.sex)?,
      privacy:     decode_enum("privacy", &self.privacy)?,
      birth_date:  decode_opt_date(self.birth_date)?,
      death_date:  decode_opt_date(self.death_date)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      deleted_at:  decode_opt_dt(self.deleted_at)?,
    })
  }
}

pub const RELATIONSHIP_COLUMNS: &str = "relationship_id, person_a_id, person_b_id, \
   relationship_type, start_date, end_date, place, notes, created_at, updated_at, deleted_at";

/// Raw strings read directly from a `relationships` row.
pub struct RawRelationship {
  pub relationship_id:   String,
  pub person_a_id:       String,
  pub person_b_id:       String,
  pub relationship_type: String,
  pub start_date:        Option<String>,
  pub end_date:          Option<String>,
  pub place:             Option<String>,
  pub notes:             Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
  pub deleted_at:        Option<String>,
}

impl RawRelationship {
  /// Map a row selected with [`RELATIONSHIP_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id:   row.get(0)?,
      person_a_id:       row.get(1)?,
      person_b_id:       row.get(2)?,
      relationship_type: row.get(3)?,
      start_date:        row.get(4)?,
      end_date:          row.get(5)?,
      place:             row.get(6)?,
      notes:             row.get(7)?,
      created_at:        row.get(8)?,
      updated_at:        row.get(9)?,
      deleted_at:        row.get(10)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id: decode_uuid(&self.relationship_id)?,
      person_a_id:     decode_uuid(&self.person_a_id)?,
      person_b_id:     decode_uuid(&self.person_b_id)?,
      kind:            decode_enum("relationship_type", &self.relationship_type)?,
      start_date:      decode_opt_date(self.start_date)?,
      end_date:        decode_opt_date(self.end_date)?,
      place:           self.place,
      notes:           self.notes,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
      deleted_at:      decode_opt_dt(self.deleted_at)?,
    })
  }
}
