//! Encoding helpers between Rust domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond precision
//! so that text order equals time order. UUIDs are stored as hyphenated
//! lowercase strings. Documents are stored as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use rota_core::{
  client::{ClientPrivate, ClientProfile},
  restaurant::Restaurant,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_document<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for a `restaurants` row, owned so they can move into the
/// connection thread.
pub struct RestaurantRow {
  pub id:                   String,
  pub owner_identity:       String,
  pub name:                 String,
  pub tax_id:               String,
  pub status:               String,
  pub region:               String,
  pub municipality:         String,
  pub accepts_reservations: bool,
  pub has_queue:            bool,
  pub created_at:           String,
  pub updated_at:           String,
  pub document:             String,
}

impl RestaurantRow {
  pub fn from_restaurant(r: &Restaurant) -> Result<Self> {
    Ok(Self {
      id:                   encode_uuid(r.id),
      owner_identity:       r.owner_identity.clone(),
      name:                 r.name.clone(),
      tax_id:               r.tax_id.clone(),
      status:               r.status.as_ref().to_owned(),
      region:               r.address.region.clone(),
      municipality:         r.address.municipality.clone(),
      accepts_reservations: r.service_options.accepts_reservations,
      has_queue:            r.service_options.has_queue,
      created_at:           encode_dt(r.created_at),
      updated_at:           encode_dt(r.updated_at),
      document:             serde_json::to_string(r)?,
    })
  }
}

/// Column values for a `users` row.
pub struct ProfileRow {
  pub id:         String,
  pub name_lower: String,
  pub updated_at: String,
  pub document:   String,
}

impl ProfileRow {
  pub fn from_profile(p: &ClientProfile) -> Result<Self> {
    Ok(Self {
      id:         p.id.clone(),
      name_lower: p.name_lower.clone(),
      updated_at: encode_dt(p.updated_at),
      document:   serde_json::to_string(p)?,
    })
  }
}

/// Column values for a `users_private` row.
pub struct PrivateRow {
  pub id:         String,
  pub person_id:  String,
  pub updated_at: String,
  pub document:   String,
}

impl PrivateRow {
  pub fn from_private(p: &ClientPrivate) -> Result<Self> {
    Ok(Self {
      id:         p.id.clone(),
      person_id:  p.person_id.clone(),
      updated_at: encode_dt(p.updated_at),
      document:   serde_json::to_string(p)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let c = a + chrono::Duration::seconds(10);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(encode_dt(a), "2024-01-01T09:00:00.000000Z");
  }
}
