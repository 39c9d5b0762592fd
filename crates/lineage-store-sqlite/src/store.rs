//! [`SqliteStore`]: the SQLite implementation of [`FamilyStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use lineage_core::{
  person::{NewPerson, Person},
  relationship::{NewRelationship, Relationship},
  store::{FamilyStore, RelationshipQuery},
};

use crate::{
  Result,
  encode::{
    PERSON_COLUMNS, RELATIONSHIP_COLUMNS, RawPerson, RawRelationship, encode_date,
    encode_dt, encode_kind, encode_privacy, encode_sex, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lineage family-tree store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a relationship SELECT with positional text parameters.
  async fn select_relationships(
    &self,
    sql: String,
    params: Vec<String>,
  ) -> Result<Vec<Relationship>> {
    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }
}

/// `?, ?, ?` with `n` placeholders.
fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

/// Translate a [`RelationshipQuery`] into a WHERE clause and its parameters.
/// Must agree with [`RelationshipQuery::matches`].
fn where_clause(query: &RelationshipQuery) -> (String, Vec<String>) {
  let mut conds: Vec<String> = Vec::new();
  let mut params: Vec<String> = Vec::new();

  if !query.include_deleted {
    conds.push("deleted_at IS NULL".into());
  }
  if !query.touching.is_empty() {
    let ids: Vec<String> = query.touching.iter().copied().map(encode_uuid).collect();
    let list = placeholders(ids.len());
    conds.push(format!("(person_a_id IN ({list}) OR person_b_id IN ({list}))"));
    params.extend(ids.iter().cloned());
    params.extend(ids);
  }
  if !query.parents.is_empty() {
    conds.push(format!("person_a_id IN ({})", placeholders(query.parents.len())));
    params.extend(query.parents.iter().copied().map(encode_uuid));
  }
  if !query.children.is_empty() {
    conds.push(format!("person_b_id IN ({})", placeholders(query.children.len())));
    params.extend(query.children.iter().copied().map(encode_uuid));
  }
  if let Some((a, b)) = query.between {
    conds.push(
      "((person_a_id = ? AND person_b_id = ?) OR (person_a_id = ? AND person_b_id = ?))"
        .into(),
    );
    let (a, b) = (encode_uuid(a), encode_uuid(b));
    params.extend([a.clone(), b.clone(), b, a]);
  }
  if !query.types.is_empty() {
    conds.push(format!("relationship_type IN ({})", placeholders(query.types.len())));
    params.extend(query.types.iter().map(|k| encode_kind(*k).to_owned()));
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, params)
}

impl FamilyStore for SqliteStore {
  type Error = crate::Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn add_person(&self, input: NewPerson) -> Result<Person> {
    let now = Utc::now();
    let person = Person {
      person_id:   Uuid::new_v4(),
      given_names: input.given_names,
      surname:     input.surname,
      sex:         input.sex,
      privacy:     input.privacy,
      birth_date:  input.birth_date,
      death_date:  input.death_date,
      created_at:  now,
      updated_at:  now,
      deleted_at:  None,
    };

    let id_str      = encode_uuid(person.person_id);
    let given       = person.given_names.clone();
    let surname     = person.surname.clone();
    let sex_str     = encode_sex(person.sex);
    let privacy_str = encode_privacy(person.privacy);
    let birth_str   = person.birth_date.map(encode_date);
    let death_str   = person.death_date.map(encode_date);
    let now_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons
             (person_id, given_names, surname, sex, privacy, birth_date, death_date,
              created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            given,
            surname,
            sex_str,
            privacy_str,
            birth_str,
            death_str,
            now_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(person)
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
              rusqlite::params![id_str],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn get_persons(&self, ids: Vec<Uuid>) -> Result<Vec<Person>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!(
      "SELECT {PERSON_COLUMNS} FROM persons
       WHERE deleted_at IS NULL AND person_id IN ({})
       ORDER BY rowid",
      placeholders(ids.len())
    );
    let params: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn list_persons(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons WHERE deleted_at IS NULL ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn delete_person(&self, id: Uuid) -> Result<bool> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons SET deleted_at = ?1, updated_at = ?1
           WHERE person_id = ?2 AND deleted_at IS NULL",
          rusqlite::params![now_str, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn add_relationship(&self, input: NewRelationship) -> Result<Relationship> {
    let now = Utc::now();
    let rel = Relationship {
      relationship_id: Uuid::new_v4(),
      person_a_id:     input.person_a_id,
      person_b_id:     input.person_b_id,
      kind:            input.kind,
      start_date:      input.start_date,
      end_date:        input.end_date,
      place:           input.place,
      notes:           input.notes,
      created_at:      now,
      updated_at:      now,
      deleted_at:      None,
    };

    let id_str    = encode_uuid(rel.relationship_id);
    let a_str     = encode_uuid(rel.person_a_id);
    let b_str     = encode_uuid(rel.person_b_id);
    let kind_str  = encode_kind(rel.kind);
    let start_str = rel.start_date.map(encode_date);
    let end_str   = rel.end_date.map(encode_date);
    let place     = rel.place.clone();
    let notes     = rel.notes.clone();
    let now_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO relationships
             (relationship_id, person_a_id, person_b_id, relationship_type,
              start_date, end_date, place, notes, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str, a_str, b_str, kind_str, start_str, end_str, place, notes, now_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(rel)
  }

  async fn get_relationship(&self, id: Uuid) -> Result<Option<Relationship>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE relationship_id = ?1"
              ),
              rusqlite::params![id_str],
              RawRelationship::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn list_relationships(
    &self,
    limit: usize,
    offset: usize,
  ) -> Result<(Vec<Relationship>, usize)> {
    let limit_val  = limit as i64;
    let offset_val = offset as i64;

    let (raws, total): (Vec<RawRelationship>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM relationships WHERE deleted_at IS NULL",
          [],
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
           WHERE deleted_at IS NULL
           ORDER BY rowid
           LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawRelationship::into_relationship)
      .collect::<Result<Vec<_>>>()?;
    Ok((items, total as usize))
  }

  async fn update_relationship(&self, rel: Relationship) -> Result<Relationship> {
    let id_str    = encode_uuid(rel.relationship_id);
    let kind_str  = encode_kind(rel.kind);
    let start_str = rel.start_date.map(encode_date);
    let end_str   = rel.end_date.map(encode_date);
    let place     = rel.place.clone();
    let notes     = rel.notes.clone();
    let now_str   = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE relationships
           SET relationship_type = ?1, start_date = ?2, end_date = ?3,
               place = ?4, notes = ?5, updated_at = ?6
           WHERE relationship_id = ?7",
          rusqlite::params![kind_str, start_str, end_str, place, notes, now_str, id_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(self.get_relationship(rel.relationship_id).await?.unwrap_or(rel))
  }

  async fn delete_relationship(&self, id: Uuid) -> Result<bool> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE relationships SET deleted_at = ?1, updated_at = ?1
           WHERE relationship_id = ?2 AND deleted_at IS NULL",
          rusqlite::params![now_str, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn find_relationships(&self, query: RelationshipQuery) -> Result<Vec<Relationship>> {
    let (clause, params) = where_clause(&query);
    let sql = format!(
      "SELECT {RELATIONSHIP_COLUMNS} FROM relationships {clause} ORDER BY rowid"
    );
    self.select_relationships(sql, params).await
  }
}
