//! Restaurant Mutation Service: create, read, partial update and delete.
//!
//! Every write validates first and short-circuits on the first bad field, so
//! a rejected request never leaves a partial write behind.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound as _, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{self, CallerIdentity},
  query::{self, ListParams, PagedResult},
  restaurant::{NewRestaurant, Restaurant, RestaurantPatch},
  store::{DocumentStore, UnexpectedOutcome, WriteOutcome},
  validate,
};

/// How many times an update is re-read and re-applied after losing a race.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Who may update or delete a restaurant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipPolicy {
  /// Any authenticated caller.
  #[default]
  Open,
  /// Only the identity recorded as `owner_identity`.
  OwnerOnly,
}

pub struct RestaurantService<S> {
  store:     Arc<S>,
  ownership: OwnershipPolicy,
}

impl<S> RestaurantService<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>, ownership: OwnershipPolicy) -> Self {
    Self { store, ownership }
  }

  /// Validate, check tax-ID uniqueness, and persist a new active restaurant.
  pub async fn create(
    &self,
    input: NewRestaurant,
    caller: Option<&CallerIdentity>,
  ) -> Result<Uuid> {
    let caller = identity::require(caller)?;
    let input = input.normalized();
    validate_new(&input)?;

    let existing = self
      .store
      .find_restaurant_by_tax_id(&input.tax_id)
      .await
      .map_err(Error::store)?;
    if let Some(existing) = existing {
      tracing::warn!(%existing, "rejected restaurant with duplicate tax ID");
      return Err(duplicate_tax_id(&input.tax_id));
    }

    let tax_id = input.tax_id.clone();
    let restaurant =
      Restaurant::from_new(input, Uuid::new_v4(), caller.uid.clone(), now());
    let id = restaurant.id;

    match self
      .store
      .insert_restaurant(restaurant)
      .await
      .map_err(Error::store)?
    {
      WriteOutcome::Written => {
        tracing::info!(%id, owner = %caller.uid, "restaurant created");
        Ok(id)
      }
      // Lost the race against a concurrent create with the same tax ID.
      WriteOutcome::Duplicate => Err(duplicate_tax_id(&tax_id)),
      outcome => Err(Error::store(UnexpectedOutcome {
        outcome,
        operation: "insert_restaurant",
      })),
    }
  }

  /// Public read; no identity required.
  pub async fn get(&self, id: Uuid) -> Result<Restaurant> {
    self
      .store
      .get_restaurant(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| not_found(id))
  }

  /// Apply a partial, nested-merge update.
  ///
  /// The merged document is validated as a whole before the single write, and
  /// `updated_at` always moves forward. A write that loses an optimistic
  /// concurrency race is re-read and re-applied.
  pub async fn update(
    &self,
    id: Uuid,
    patch: RestaurantPatch,
    caller: Option<&CallerIdentity>,
  ) -> Result<()> {
    let caller = identity::require(caller)?;
    validate_patch(&patch)?;

    for attempt in 1..=MAX_WRITE_ATTEMPTS {
      let current = self.get(id).await?;
      self.check_owner(&current, caller)?;

      let mut next = current.clone();
      next.merge(patch.clone());
      validate_price_range(&next)?;
      next.updated_at = next_timestamp(current.updated_at);

      match self
        .store
        .replace_restaurant(next, current.updated_at)
        .await
        .map_err(Error::store)?
      {
        WriteOutcome::Written => {
          tracing::info!(%id, by = %caller.uid, "restaurant updated");
          return Ok(());
        }
        WriteOutcome::Duplicate => {
          return Err(Error::Conflict(
            "tax ID is already registered to another restaurant".into(),
          ));
        }
        WriteOutcome::Missing => return Err(not_found(id)),
        WriteOutcome::Stale => {
          tracing::warn!(%id, attempt, "concurrent update detected; retrying");
        }
      }
    }

    Err(Error::Conflict(format!(
      "restaurant {id} kept changing; update abandoned"
    )))
  }

  /// Hard delete. Deleting an ID that does not exist is not an error.
  pub async fn delete(
    &self,
    id: Uuid,
    caller: Option<&CallerIdentity>,
  ) -> Result<()> {
    let caller = identity::require(caller)?;

    if self.ownership == OwnershipPolicy::OwnerOnly {
      let current = self.store.get_restaurant(id).await.map_err(Error::store)?;
      if let Some(current) = current {
        self.check_owner(&current, caller)?;
      }
    }

    let deleted = self
      .store
      .delete_restaurant(id)
      .await
      .map_err(Error::store)?;
    if deleted {
      tracing::info!(%id, by = %caller.uid, "restaurant deleted");
    } else {
      tracing::debug!(%id, "delete of missing restaurant");
    }
    Ok(())
  }

  /// See [`query::list_restaurants`].
  pub async fn list(&self, params: ListParams) -> Result<PagedResult> {
    query::list_restaurants(self.store.as_ref(), params).await
  }

  fn check_owner(
    &self,
    restaurant: &Restaurant,
    caller: &CallerIdentity,
  ) -> Result<()> {
    match self.ownership {
      OwnershipPolicy::OwnerOnly if restaurant.owner_identity != caller.uid => {
        Err(Error::Forbidden(format!(
          "restaurant {} belongs to another identity",
          restaurant.id
        )))
      }
      _ => Ok(()),
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate_new(input: &NewRestaurant) -> Result<()> {
  if validate::is_blank(&input.name) {
    return Err(Error::validation("name", "is required"));
  }
  validate_tax_id(&input.tax_id)?;
  if let Some(phone) = &input.phone {
    validate_phone(phone)?;
  }
  if validate::is_blank(&input.address.region)
    || validate::is_blank(&input.address.municipality)
  {
    return Err(Error::validation(
      "address",
      "region and municipality are required",
    ));
  }
  if !input.address.postal_code.is_empty() {
    validate_postal_code(&input.address.postal_code)?;
  }
  validate_time("schedule.opensAt", &input.schedule.opens_at)?;
  validate_time("schedule.closesAt", &input.schedule.closes_at)?;
  if !validate::is_valid_price_range(input.price_range.min, input.price_range.max)
  {
    return Err(Error::validation("priceRange", "min must not exceed max"));
  }
  Ok(())
}

/// Check every field the patch changes. Cross-field rules are checked on the
/// merged document by [`validate_price_range`].
fn validate_patch(patch: &RestaurantPatch) -> Result<()> {
  if let Some(name) = &patch.name
    && validate::is_blank(name)
  {
    return Err(Error::validation("name", "must not be blank"));
  }
  if let Some(tax_id) = &patch.tax_id {
    validate_tax_id(&validate::normalize_digits(tax_id))?;
  }
  if let Some(Some(phone)) = &patch.phone {
    let digits = validate::normalize_digits(phone);
    if !digits.is_empty() {
      validate_phone(&digits)?;
    }
  }
  if let Some(address) = &patch.address {
    if let Some(code) = &address.postal_code {
      validate_postal_code(code)?;
    }
    if address.region.as_deref().is_some_and(validate::is_blank) {
      return Err(Error::validation("address.region", "must not be blank"));
    }
    if address.municipality.as_deref().is_some_and(validate::is_blank) {
      return Err(Error::validation("address.municipality", "must not be blank"));
    }
  }
  if let Some(schedule) = &patch.schedule {
    if let Some(t) = &schedule.opens_at {
      validate_time("schedule.opensAt", t)?;
    }
    if let Some(t) = &schedule.closes_at {
      validate_time("schedule.closesAt", t)?;
    }
  }
  if let Some(price) = &patch.price_range
    && [price.min, price.max].into_iter().flatten().any(|v| !v.is_finite())
  {
    return Err(Error::validation("priceRange", "bounds must be finite numbers"));
  }
  Ok(())
}

fn validate_price_range(r: &Restaurant) -> Result<()> {
  if validate::is_valid_price_range(r.price_range.min, r.price_range.max) {
    Ok(())
  } else {
    Err(Error::validation("priceRange", "min must not exceed max"))
  }
}

fn validate_tax_id(digits: &str) -> Result<()> {
  if digits.len() != validate::TAX_ID_LEN {
    return Err(Error::validation("taxId", "must have 14 digits"));
  }
  if !validate::is_valid_tax_id(digits) {
    return Err(Error::validation("taxId", "check digits do not match"));
  }
  Ok(())
}

fn validate_phone(phone: &str) -> Result<()> {
  if validate::is_valid_phone(phone) {
    Ok(())
  } else {
    Err(Error::validation("phone", "must have 10 or 11 digits"))
  }
}

fn validate_postal_code(code: &str) -> Result<()> {
  if validate::is_valid_postal_code(code) {
    Ok(())
  } else {
    Err(Error::validation("address.postalCode", "must have 8 digits"))
  }
}

fn validate_time(field: &'static str, value: &str) -> Result<()> {
  if validate::is_valid_time_of_day(value) {
    Ok(())
  } else {
    Err(Error::validation(field, "must be HH:mm"))
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn duplicate_tax_id(tax_id: &str) -> Error {
  Error::Conflict(format!("tax ID {tax_id} is already registered"))
}

fn not_found(id: Uuid) -> Error {
  Error::NotFound(format!("restaurant {id} not found"))
}

/// Server timestamp at the precision the stores keep (microseconds).
pub(crate) fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// A timestamp strictly after `previous`, so an optimistic-concurrency token
/// always changes on write.
pub(crate) fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
  now().max(previous + Duration::microseconds(1))
}
