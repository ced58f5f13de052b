//! Client profile service.
//!
//! Every operation is scoped to the caller's own identity; `me` is accepted
//! as an alias for it.

use std::sync::Arc;

use crate::{
  Error, Result,
  client::{ClientPatch, ClientPrivate, ClientProfile, NewClient},
  identity::{self, CallerIdentity},
  mutation::{next_timestamp, now},
  store::{DocumentStore, UnexpectedOutcome, WriteOutcome},
  validate,
};

pub struct ClientService<S> {
  store: Arc<S>,
}

impl<S> ClientService<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Create (or re-create) the caller's profile and private record.
  ///
  /// Re-running create for an existing identity overwrites the profile but
  /// keeps its original `created_at`.
  pub async fn create(
    &self,
    input: NewClient,
    caller: Option<&CallerIdentity>,
  ) -> Result<String> {
    let caller = identity::require(caller)?;
    let input = input.normalized();
    validate_new(&input)?;
    self.ensure_person_id_free(&input.person_id, &caller.uid).await?;

    let existing = self
      .store
      .get_client(&caller.uid)
      .await
      .map_err(Error::store)?;
    let now = now();
    let created_at = existing.map_or(now, |p| p.created_at);

    let profile = ClientProfile {
      id: caller.uid.clone(),
      name_lower: input.name.to_lowercase(),
      name: input.name,
      phone: input.phone,
      address: input.address,
      preferences: input.preferences,
      allergies: input.allergies,
      created_at,
      updated_at: now,
    };
    let private = ClientPrivate {
      id: caller.uid.clone(),
      person_id: input.person_id,
      created_at,
      updated_at: now,
    };

    self.write(profile, private).await?;
    tracing::info!(uid = %caller.uid, "client profile saved");
    Ok(caller.uid.clone())
  }

  pub async fn get(
    &self,
    requested: &str,
    caller: Option<&CallerIdentity>,
  ) -> Result<ClientProfile> {
    let caller = identity::require(caller)?;
    let id = identity::resolve_self(caller, requested)?;
    self
      .store
      .get_client(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| not_found(id))
  }

  /// Partial update of the profile; a new person ID is re-checked for
  /// uniqueness before anything is written.
  pub async fn update(
    &self,
    requested: &str,
    patch: ClientPatch,
    caller: Option<&CallerIdentity>,
  ) -> Result<()> {
    let caller = identity::require(caller)?;
    let id = identity::resolve_self(caller, requested)?;
    validate_patch(&patch)?;

    let mut profile = self
      .store
      .get_client(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| not_found(id))?;
    let mut private = self
      .store
      .get_client_private(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| not_found(id))?;

    let updated_at = next_timestamp(profile.updated_at);
    if let Some(person_id) = &patch.person_id {
      let digits = validate::normalize_digits(person_id);
      if digits != private.person_id {
        self.ensure_person_id_free(&digits, id).await?;
        private.person_id = digits;
        private.updated_at = updated_at;
      }
    }

    profile.merge(patch);
    profile.updated_at = updated_at;

    self.write(profile, private).await?;
    tracing::info!(uid = %id, "client profile updated");
    Ok(())
  }

  /// Remove both documents. Deleting a missing profile is not an error.
  pub async fn delete(
    &self,
    requested: &str,
    caller: Option<&CallerIdentity>,
  ) -> Result<()> {
    let caller = identity::require(caller)?;
    let id = identity::resolve_self(caller, requested)?;
    let deleted = self.store.delete_client(id).await.map_err(Error::store)?;
    if deleted {
      tracing::info!(uid = %id, "client profile deleted");
    }
    Ok(())
  }

  async fn ensure_person_id_free(&self, person_id: &str, uid: &str) -> Result<()> {
    let holder = self
      .store
      .find_client_by_person_id(person_id)
      .await
      .map_err(Error::store)?;
    match holder {
      Some(holder) if holder != uid => {
        tracing::warn!(uid, "rejected duplicate person ID");
        Err(duplicate_person_id())
      }
      _ => Ok(()),
    }
  }

  async fn write(&self, profile: ClientProfile, private: ClientPrivate) -> Result<()> {
    match self
      .store
      .put_client(profile, private)
      .await
      .map_err(Error::store)?
    {
      WriteOutcome::Written => Ok(()),
      WriteOutcome::Duplicate => Err(duplicate_person_id()),
      outcome => Err(Error::store(UnexpectedOutcome {
        outcome,
        operation: "put_client",
      })),
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate_new(input: &NewClient) -> Result<()> {
  if validate::is_blank(&input.name) {
    return Err(Error::validation("name", "is required"));
  }
  validate_person_id(&input.person_id)?;
  if !validate::is_valid_postal_code(&input.address.postal_code) {
    return Err(Error::validation("address.postalCode", "must have 8 digits"));
  }
  if validate::is_blank(&input.address.region)
    || validate::is_blank(&input.address.municipality)
  {
    return Err(Error::validation(
      "address",
      "region and municipality are required",
    ));
  }
  if !input.phone.is_empty() && !validate::is_valid_phone(&input.phone) {
    return Err(Error::validation("phone", "must have 10 or 11 digits"));
  }
  Ok(())
}

fn validate_patch(patch: &ClientPatch) -> Result<()> {
  if patch.name.as_deref().is_some_and(validate::is_blank) {
    return Err(Error::validation("name", "must not be blank"));
  }
  if let Some(person_id) = &patch.person_id {
    validate_person_id(&validate::normalize_digits(person_id))?;
  }
  if let Some(phone) = &patch.phone {
    let digits = validate::normalize_digits(phone);
    if !digits.is_empty() && !validate::is_valid_phone(&digits) {
      return Err(Error::validation("phone", "must have 10 or 11 digits"));
    }
  }
  if let Some(address) = &patch.address {
    if address
      .postal_code
      .as_deref()
      .is_some_and(|c| !validate::is_valid_postal_code(c))
    {
      return Err(Error::validation("address.postalCode", "must have 8 digits"));
    }
    if address.region.as_deref().is_some_and(validate::is_blank)
      || address.municipality.as_deref().is_some_and(validate::is_blank)
    {
      return Err(Error::validation(
        "address",
        "region and municipality must not be blank",
      ));
    }
  }
  Ok(())
}

fn validate_person_id(digits: &str) -> Result<()> {
  if digits.len() != validate::PERSON_ID_LEN {
    return Err(Error::validation("personId", "must have 11 digits"));
  }
  if !validate::is_valid_person_id(digits) {
    return Err(Error::validation("personId", "check digits do not match"));
  }
  Ok(())
}

fn duplicate_person_id() -> Error {
  Error::Conflict("person ID is already registered to another account".into())
}

fn not_found(id: &str) -> Error {
  Error::NotFound(format!("client {id} not found"))
}
