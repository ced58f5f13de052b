//! Restaurant: the denormalised document served by listings and mutated by
//! [`crate::mutation::RestaurantService`].
//!
//! Nested sub-objects each have their own patch type so an update can only
//! ever touch keys the model knows about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  address::{Address, AddressPatch},
  patch::{present, set},
  validate::normalize_digits,
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Only [`RestaurantStatus::Active`] restaurants are eligible for listing.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RestaurantStatus {
  #[default]
  Active,
  Inactive,
}

// ─── Sub-objects ─────────────────────────────────────────────────────────────

/// A named waiting line the restaurant runs (e.g. "balcão", "mesas").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
  pub name:   String,
  #[serde(default)]
  pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOptions {
  pub accepts_reservations: bool,
  pub has_queue:            bool,
  pub queues:               Vec<Queue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceOptionsPatch {
  pub accepts_reservations: Option<bool>,
  pub has_queue:            Option<bool>,
  pub queues:               Option<Vec<Queue>>,
}

/// Which weekdays the restaurant opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingDays {
  pub sun: bool,
  pub mon: bool,
  pub tue: bool,
  pub wed: bool,
  pub thu: bool,
  pub fri: bool,
  pub sat: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
  /// `HH:mm`, 24-hour.
  pub opens_at:       String,
  /// `HH:mm`, 24-hour.
  pub closes_at:      String,
  pub operating_days: OperatingDays,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchedulePatch {
  pub opens_at:       Option<String>,
  pub closes_at:      Option<String>,
  pub operating_days: Option<OperatingDays>,
}

/// Invariant for persisted documents: `min <= max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceRange {
  pub min: f64,
  pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceRangePatch {
  pub min: Option<f64>,
  pub max: Option<f64>,
}

/// Opaque pointer into the blob store; passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuReference {
  pub path: String,
  pub url:  String,
}

// ─── Restaurant ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
  pub id:              Uuid,
  /// Identity of the creating caller; never changes.
  pub owner_identity:  String,
  pub name:            String,
  /// 14 digits, unique across restaurants.
  pub tax_id:          String,
  pub phone:           Option<String>,
  pub address:         Address,
  pub service_options: ServiceOptions,
  pub schedule:        Schedule,
  pub price_range:     PriceRange,
  pub menu_reference:  Option<MenuReference>,
  pub average_rating:  f64,
  pub status:          RestaurantStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Restaurant {
  /// Build the document persisted by `create`. The payload must already be
  /// normalised and validated.
  pub fn from_new(
    input: NewRestaurant,
    id: Uuid,
    owner_identity: String,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id,
      owner_identity,
      name: input.name,
      tax_id: input.tax_id,
      phone: input.phone,
      address: input.address,
      service_options: input.service_options,
      schedule: input.schedule,
      price_range: input.price_range,
      menu_reference: input.menu_reference,
      average_rating: 0.0,
      status: RestaurantStatus::Active,
      created_at: now,
      updated_at: now,
    }
  }

  /// Merge `patch` into this document field by field. Nested sub-objects are
  /// merged key by key; absent keys are left untouched. Does not validate and
  /// does not touch `updated_at`.
  pub fn merge(&mut self, patch: RestaurantPatch) {
    set(&mut self.name, patch.name.map(|n| n.trim().to_owned()));
    set(&mut self.tax_id, patch.tax_id.map(|t| normalize_digits(&t)));
    set(&mut self.phone, patch.phone.map(normalize_phone));
    if let Some(address) = patch.address {
      address.apply_to(&mut self.address);
    }
    if let Some(options) = patch.service_options {
      set(&mut self.service_options.accepts_reservations, options.accepts_reservations);
      set(&mut self.service_options.has_queue, options.has_queue);
      set(&mut self.service_options.queues, options.queues);
    }
    if let Some(schedule) = patch.schedule {
      set(&mut self.schedule.opens_at, schedule.opens_at);
      set(&mut self.schedule.closes_at, schedule.closes_at);
      set(&mut self.schedule.operating_days, schedule.operating_days);
    }
    if let Some(price) = patch.price_range {
      set(&mut self.price_range.min, price.min);
      set(&mut self.price_range.max, price.max);
    }
    set(&mut self.menu_reference, patch.menu_reference);
    set(&mut self.status, patch.status);
  }
}

/// Reduce an optional phone to digits; an empty result clears it.
pub fn normalize_phone(phone: Option<String>) -> Option<String> {
  phone
    .map(|p| normalize_digits(&p))
    .filter(|p| !p.is_empty())
}

// ─── Create payload ──────────────────────────────────────────────────────────

/// Input to [`crate::mutation::RestaurantService::create`].
///
/// System fields (`id`, `owner_identity`, `average_rating`, `status`,
/// timestamps) are never accepted from callers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRestaurant {
  pub name:            String,
  pub tax_id:          String,
  pub phone:           Option<String>,
  pub address:         Address,
  pub service_options: ServiceOptions,
  pub schedule:        Schedule,
  pub price_range:     PriceRange,
  pub menu_reference:  Option<MenuReference>,
}

impl NewRestaurant {
  /// Trim text, reduce identifiers to digits, drop an empty phone.
  pub fn normalized(self) -> Self {
    Self {
      name: self.name.trim().to_owned(),
      tax_id: normalize_digits(&self.tax_id),
      phone: normalize_phone(self.phone),
      address: self.address.normalized(),
      ..self
    }
  }
}

// ─── Update patch ────────────────────────────────────────────────────────────

/// Input to [`crate::mutation::RestaurantService::update`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestaurantPatch {
  pub name:            Option<String>,
  pub tax_id:          Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub phone:           Option<Option<String>>,
  pub address:         Option<AddressPatch>,
  pub service_options: Option<ServiceOptionsPatch>,
  pub schedule:        Option<SchedulePatch>,
  pub price_range:     Option<PriceRangePatch>,
  #[serde(default, deserialize_with = "present")]
  pub menu_reference:  Option<Option<MenuReference>>,
  pub status:          Option<RestaurantStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Restaurant {
    let input = NewRestaurant {
      name: "Pizza X".into(),
      tax_id: "11222333000181".into(),
      phone: Some("1133334444".into()),
      address: Address {
        postal_code:  "01310100".into(),
        street:       "Av. Paulista".into(),
        number:       "1000".into(),
        district:     "Bela Vista".into(),
        municipality: "São Paulo".into(),
        region:       "SP".into(),
      },
      service_options: ServiceOptions {
        accepts_reservations: true,
        has_queue:            false,
        queues:               vec![],
      },
      schedule: Schedule {
        opens_at:       "08:00".into(),
        closes_at:      "22:00".into(),
        operating_days: OperatingDays { mon: true, ..Default::default() },
      },
      price_range: PriceRange { min: 20.0, max: 80.0 },
      menu_reference: None,
    };
    Restaurant::from_new(input, Uuid::new_v4(), "owner".into(), Utc::now())
  }

  #[test]
  fn new_restaurant_starts_active_with_zero_rating() {
    let r = sample();
    assert_eq!(r.status, RestaurantStatus::Active);
    assert_eq!(r.average_rating, 0.0);
    assert_eq!(r.created_at, r.updated_at);
  }

  #[test]
  fn merge_district_only_touches_district() {
    let before = sample();
    let mut after = before.clone();
    let patch: RestaurantPatch =
      serde_json::from_str(r#"{"address":{"district":"Jardins"}}"#).unwrap();
    after.merge(patch);

    assert_eq!(after.address.district, "Jardins");
    let mut expected = before.clone();
    expected.address.district = "Jardins".into();
    assert_eq!(after, expected);
  }

  #[test]
  fn merge_nested_schedule_keeps_siblings() {
    let mut r = sample();
    let patch: RestaurantPatch =
      serde_json::from_str(r#"{"schedule":{"closesAt":"23:30"}}"#).unwrap();
    r.merge(patch);
    assert_eq!(r.schedule.opens_at, "08:00");
    assert_eq!(r.schedule.closes_at, "23:30");
    assert!(r.schedule.operating_days.mon);
  }

  #[test]
  fn null_phone_clears_and_absent_phone_keeps() {
    let mut r = sample();
    r.merge(serde_json::from_str(r#"{"name":"Pizza Z"}"#).unwrap());
    assert_eq!(r.phone.as_deref(), Some("1133334444"));

    r.merge(serde_json::from_str(r#"{"phone":null}"#).unwrap());
    assert_eq!(r.phone, None);
  }

  #[test]
  fn patch_rejects_unknown_and_system_fields() {
    assert!(serde_json::from_str::<RestaurantPatch>(r#"{"averageRating":5}"#).is_err());
    assert!(serde_json::from_str::<RestaurantPatch>(r#"{"ownerIdentity":"x"}"#).is_err());
    assert!(
      serde_json::from_str::<RestaurantPatch>(r#"{"priceRange":{"avg":3}}"#).is_err()
    );
  }

  #[test]
  fn document_serialises_camel_case() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["taxId"], "11222333000181");
    assert_eq!(json["serviceOptions"]["acceptsReservations"], true);
    assert_eq!(json["schedule"]["opensAt"], "08:00");
    assert_eq!(json["status"], "active");
  }
}
