//! SQL schema for the Lineage SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Rows are soft-deleted via deleted_at; no DELETE is ever issued.
CREATE TABLE IF NOT EXISTS persons (
    person_id    TEXT PRIMARY KEY,
    given_names  TEXT,
    surname      TEXT,
    sex          TEXT NOT NULL DEFAULT 'unknown',  -- 'male' | 'female' | 'unknown'
    privacy      TEXT NOT NULL DEFAULT 'public',   -- 'public' | 'restricted' | 'private'
    birth_date   TEXT,                             -- YYYY-MM-DD
    death_date   TEXT,
    created_at   TEXT NOT NULL,                    -- ISO 8601 UTC
    updated_at   TEXT NOT NULL,
    deleted_at   TEXT
);

-- Typed edges. For parent-child types person_a is the parent.
-- Uniqueness per unordered pair and type is enforced by the service layer.
CREATE TABLE IF NOT EXISTS relationships (
    relationship_id   TEXT PRIMARY KEY,
    person_a_id       TEXT NOT NULL REFERENCES persons(person_id),
    person_b_id       TEXT NOT NULL REFERENCES persons(person_id),
    relationship_type TEXT NOT NULL,
    start_date        TEXT,
    end_date          TEXT,
    place             TEXT,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    deleted_at        TEXT,
    CHECK (person_a_id != person_b_id)
);

CREATE INDEX IF NOT EXISTS relationships_a_idx    ON relationships(person_a_id);
CREATE INDEX IF NOT EXISTS relationships_b_idx    ON relationships(person_b_id);
CREATE INDEX IF NOT EXISTS relationships_type_idx ON relationships(relationship_type);

PRAGMA user_version = 1;
";
