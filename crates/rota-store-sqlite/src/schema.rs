//! SQL schema for the Rota SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per restaurant. `document` is the full JSON document; the other
-- columns are projections of it used for filtering, ordering and uniqueness.
CREATE TABLE IF NOT EXISTS restaurants (
    id                   TEXT PRIMARY KEY,
    owner_identity       TEXT NOT NULL,
    name                 TEXT NOT NULL,
    tax_id               TEXT NOT NULL,
    status               TEXT NOT NULL,    -- 'active' | 'inactive'
    region               TEXT NOT NULL,
    municipality         TEXT NOT NULL,
    accepts_reservations INTEGER NOT NULL,
    has_queue            INTEGER NOT NULL,
    created_at           TEXT NOT NULL,    -- RFC 3339 UTC, microseconds
    updated_at           TEXT NOT NULL,    -- optimistic-concurrency token
    document             TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS restaurants_tax_id_idx
    ON restaurants(tax_id);
CREATE INDEX IF NOT EXISTS restaurants_browse_idx
    ON restaurants(status, created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS restaurants_name_idx
    ON restaurants(status, name, id);
CREATE INDEX IF NOT EXISTS restaurants_region_idx
    ON restaurants(region, municipality);

-- Public client profiles, keyed by identity.
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY,
    name_lower TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    document   TEXT NOT NULL
);

-- Private client records (person ID), keyed by the same identity.
CREATE TABLE IF NOT EXISTS users_private (
    id         TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    document   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS users_private_person_id_idx
    ON users_private(person_id);

PRAGMA user_version = 1;
";
