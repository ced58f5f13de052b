//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use rota_core::{
  client::{ClientPrivate, ClientProfile},
  query::{QueryMode, QueryPlan, prefix_upper_bound},
  restaurant::{Restaurant, RestaurantStatus},
  store::{DocumentStore, WriteOutcome},
};

use crate::{
  Result,
  encode::{
    PrivateRow, ProfileRow, RestaurantRow, decode_document, decode_uuid,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rota document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised on the connection thread, so each closure passed to
/// `call` runs atomically with respect to other store calls.
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

  /// Open an in-memory store, for tests.
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

  /// Fetch a single `document` column by key.
  async fn fetch_document(
    &self,
    sql: &'static str,
    key: String,
  ) -> Result<Option<String>> {
    let doc = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![key], |row| row.get(0))
            .optional()?,
        )
      })
      .await?;
    Ok(doc)
  }
}

/// Map a unique-constraint violation to [`WriteOutcome::Duplicate`].
fn written_or_duplicate(
  result: rusqlite::Result<usize>,
) -> rusqlite::Result<WriteOutcome> {
  match result {
    Ok(_) => Ok(WriteOutcome::Written),
    Err(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Ok(WriteOutcome::Duplicate)
    }
    Err(e) => Err(e),
  }
}

// ─── Query building ──────────────────────────────────────────────────────────

/// Translate a [`QueryPlan`] into SQL with positional parameters.
fn listing_sql(plan: &QueryPlan) -> (String, Vec<Value>) {
  let mut conds: Vec<&'static str> = vec!["status = ?"];
  let mut args: Vec<Value> =
    vec![Value::Text(RestaurantStatus::Active.as_ref().to_owned())];

  let f = &plan.filters;
  if let Some(region) = &f.region {
    conds.push("region = ?");
    args.push(Value::Text(region.clone()));
  }
  if let Some(municipality) = &f.municipality {
    conds.push("municipality = ?");
    args.push(Value::Text(municipality.clone()));
  }
  if let Some(flag) = f.accepts_reservations {
    conds.push("accepts_reservations = ?");
    args.push(Value::Integer(flag.into()));
  }
  if let Some(flag) = f.has_queue {
    conds.push("has_queue = ?");
    args.push(Value::Integer(flag.into()));
  }

  let order = match &plan.mode {
    QueryMode::Search { prefix, after_name } => {
      conds.push("name >= ?");
      args.push(Value::Text(prefix.clone()));
      conds.push("name < ?");
      args.push(Value::Text(prefix_upper_bound(prefix)));
      if let Some(after) = after_name {
        conds.push("name > ?");
        args.push(Value::Text(after.clone()));
      }
      "name ASC, id ASC"
    }
    QueryMode::Browse { after } => {
      if let Some(pos) = after {
        let at = encode_dt(pos.created_at);
        conds.push("(created_at < ? OR (created_at = ? AND id < ?))");
        args.push(Value::Text(at.clone()));
        args.push(Value::Text(at));
        args.push(Value::Text(encode_uuid(pos.id)));
      }
      "created_at DESC, id DESC"
    }
  };

  args.push(Value::Integer(plan.fetch_limit() as i64));
  let sql = format!(
    "SELECT document FROM restaurants WHERE {} ORDER BY {order} LIMIT ?",
    conds.join(" AND ")
  );
  (sql, args)
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = crate::Error;

  // ── Restaurants ───────────────────────────────────────────────────────────

  async fn insert_restaurant(&self, restaurant: Restaurant) -> Result<WriteOutcome> {
    let row = RestaurantRow::from_restaurant(&restaurant)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Check-then-insert inside one transaction; the unique index is the
        // backstop for writers on other connections.
        let taken = tx
          .query_row(
            "SELECT 1 FROM restaurants WHERE tax_id = ?1",
            rusqlite::params![row.tax_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(WriteOutcome::Duplicate);
        }

        let outcome = written_or_duplicate(tx.execute(
          "INSERT INTO restaurants (
             id, owner_identity, name, tax_id, status, region, municipality,
             accepts_reservations, has_queue, created_at, updated_at, document
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            row.id,
            row.owner_identity,
            row.name,
            row.tax_id,
            row.status,
            row.region,
            row.municipality,
            row.accepts_reservations,
            row.has_queue,
            row.created_at,
            row.updated_at,
            row.document,
          ],
        ))?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn find_restaurant_by_tax_id(&self, tax_id: &str) -> Result<Option<Uuid>> {
    let tax_id = tax_id.to_owned();

    let id: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id FROM restaurants WHERE tax_id = ?1",
              rusqlite::params![tax_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    id.as_deref().map(decode_uuid).transpose()
  }

  async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>> {
    self
      .fetch_document("SELECT document FROM restaurants WHERE id = ?1", encode_uuid(id))
      .await?
      .as_deref()
      .map(decode_document)
      .transpose()
  }

  async fn replace_restaurant(
    &self,
    restaurant: Restaurant,
    expected_updated_at: DateTime<Utc>,
  ) -> Result<WriteOutcome> {
    let row = RestaurantRow::from_restaurant(&restaurant)?;
    let expected = encode_dt(expected_updated_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "UPDATE restaurants SET
             owner_identity = ?2, name = ?3, tax_id = ?4, status = ?5,
             region = ?6, municipality = ?7, accepts_reservations = ?8,
             has_queue = ?9, created_at = ?10, updated_at = ?11, document = ?12
           WHERE id = ?1 AND updated_at = ?13",
          rusqlite::params![
            row.id,
            row.owner_identity,
            row.name,
            row.tax_id,
            row.status,
            row.region,
            row.municipality,
            row.accepts_reservations,
            row.has_queue,
            row.created_at,
            row.updated_at,
            row.document,
            expected,
          ],
        );

        match result {
          Ok(0) => {
            let exists = conn
              .query_row(
                "SELECT 1 FROM restaurants WHERE id = ?1",
                rusqlite::params![row.id],
                |_| Ok(()),
              )
              .optional()?
              .is_some();
            Ok(if exists { WriteOutcome::Stale } else { WriteOutcome::Missing })
          }
          other => Ok(written_or_duplicate(other)?),
        }
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_restaurant(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM restaurants WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn query_restaurants(&self, plan: &QueryPlan) -> Result<Vec<Restaurant>> {
    let (sql, args) = listing_sql(plan);

    let docs: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs.iter().map(|d| decode_document(d)).collect()
  }

  // ── Clients ───────────────────────────────────────────────────────────────

  async fn find_client_by_person_id(&self, person_id: &str) -> Result<Option<String>> {
    let person_id = person_id.to_owned();

    let id = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id FROM users_private WHERE person_id = ?1",
              rusqlite::params![person_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(id)
  }

  async fn get_client(&self, id: &str) -> Result<Option<ClientProfile>> {
    self
      .fetch_document("SELECT document FROM users WHERE id = ?1", id.to_owned())
      .await?
      .as_deref()
      .map(decode_document)
      .transpose()
  }

  async fn get_client_private(&self, id: &str) -> Result<Option<ClientPrivate>> {
    self
      .fetch_document("SELECT document FROM users_private WHERE id = ?1", id.to_owned())
      .await?
      .as_deref()
      .map(decode_document)
      .transpose()
  }

  async fn put_client(
    &self,
    profile: ClientProfile,
    private: ClientPrivate,
  ) -> Result<WriteOutcome> {
    let profile_row = ProfileRow::from_profile(&profile)?;
    let private_row = PrivateRow::from_private(&private)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let holder: Option<String> = tx
          .query_row(
            "SELECT id FROM users_private WHERE person_id = ?1",
            rusqlite::params![private_row.person_id],
            |row| row.get(0),
          )
          .optional()?;
        if holder.is_some_and(|h| h != private_row.id) {
          return Ok(WriteOutcome::Duplicate);
        }

        tx.execute(
          "INSERT INTO users (id, name_lower, updated_at, document)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(id) DO UPDATE SET
             name_lower = excluded.name_lower,
             updated_at = excluded.updated_at,
             document   = excluded.document",
          rusqlite::params![
            profile_row.id,
            profile_row.name_lower,
            profile_row.updated_at,
            profile_row.document,
          ],
        )?;

        let outcome = written_or_duplicate(tx.execute(
          "INSERT INTO users_private (id, person_id, updated_at, document)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(id) DO UPDATE SET
             person_id  = excluded.person_id,
             updated_at = excluded.updated_at,
             document   = excluded.document",
          rusqlite::params![
            private_row.id,
            private_row.person_id,
            private_row.updated_at,
            private_row.document,
          ],
        ))?;
        if outcome != WriteOutcome::Written {
          // Dropping the transaction rolls back the profile write too.
          return Ok(outcome);
        }

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_client(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let public = tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;
        let private =
          tx.execute("DELETE FROM users_private WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(public + private)
      })
      .await?;

    Ok(deleted > 0)
  }
}
