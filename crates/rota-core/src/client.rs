//! Client (end consumer) documents.
//!
//! A client is split in two documents keyed by the same identity: a public
//! profile and a private record holding the person ID, so the national ID
//! never travels with the profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  address::{Address, AddressPatch},
  patch::{present, set},
  validate::normalize_digits,
};

/// Public profile, stored in `users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
  /// The owning identity; also the document key.
  pub id:          String,
  pub name:        String,
  /// Lowercased `name`, kept for case-insensitive lookups.
  pub name_lower:  String,
  pub phone:       String,
  pub address:     Address,
  /// Cuisine preferences picked during onboarding.
  pub preferences: Vec<String>,
  pub allergies:   Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Private record, stored in `users_private`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPrivate {
  pub id:         String,
  /// 11 digits, unique across clients.
  pub person_id:  String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::profile::ClientService::create`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewClient {
  pub name:        String,
  pub phone:       String,
  pub person_id:   String,
  pub address:     Address,
  pub preferences: Vec<String>,
  pub allergies:   Option<String>,
}

impl NewClient {
  pub fn normalized(self) -> Self {
    Self {
      name:        self.name.trim().to_owned(),
      phone:       normalize_digits(&self.phone),
      person_id:   normalize_digits(&self.person_id),
      address:     self.address.normalized(),
      preferences: normalize_preferences(self.preferences),
      allergies:   normalize_note(self.allergies),
    }
  }
}

/// Input to [`crate::profile::ClientService::update`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientPatch {
  pub name:        Option<String>,
  pub phone:       Option<String>,
  pub person_id:   Option<String>,
  pub address:     Option<AddressPatch>,
  pub preferences: Option<Vec<String>>,
  #[serde(default, deserialize_with = "present")]
  pub allergies:   Option<Option<String>>,
}

impl ClientProfile {
  /// Merge the profile-side keys of `patch`. The person ID lives in
  /// [`ClientPrivate`] and is handled by the service.
  pub fn merge(&mut self, patch: ClientPatch) {
    if let Some(name) = patch.name {
      self.name = name.trim().to_owned();
      self.name_lower = self.name.to_lowercase();
    }
    set(&mut self.phone, patch.phone.map(|p| normalize_digits(&p)));
    if let Some(address) = patch.address {
      address.apply_to(&mut self.address);
    }
    set(&mut self.preferences, patch.preferences.map(normalize_preferences));
    set(&mut self.allergies, patch.allergies.map(normalize_note));
  }
}

/// Drop blank entries.
fn normalize_preferences(prefs: Vec<String>) -> Vec<String> {
  prefs
    .into_iter()
    .map(|p| p.trim().to_owned())
    .filter(|p| !p.is_empty())
    .collect()
}

/// A blank note is stored as `None`.
fn normalize_note(note: Option<String>) -> Option<String> {
  note
    .map(|n| n.trim().to_owned())
    .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn profile() -> ClientProfile {
    let now = Utc::now();
    ClientProfile {
      id:          "u1".into(),
      name:        "Ana".into(),
      name_lower:  "ana".into(),
      phone:       "11987654321".into(),
      address:     Address { region: "SP".into(), ..Default::default() },
      preferences: vec!["japanese".into()],
      allergies:   Some("peanuts".into()),
      created_at:  now,
      updated_at:  now,
    }
  }

  #[test]
  fn rename_refreshes_lowercase_copy() {
    let mut p = profile();
    p.merge(ClientPatch { name: Some("  Beatriz ".into()), ..Default::default() });
    assert_eq!(p.name, "Beatriz");
    assert_eq!(p.name_lower, "beatriz");
  }

  #[test]
  fn blank_allergies_clear_the_note() {
    let mut p = profile();
    p.merge(serde_json::from_str(r#"{"allergies":"   "}"#).unwrap());
    assert_eq!(p.allergies, None);

    let mut p = profile();
    p.merge(serde_json::from_str(r#"{"allergies":null}"#).unwrap());
    assert_eq!(p.allergies, None);

    let mut p = profile();
    p.merge(serde_json::from_str(r#"{"preferences":["vegan",""]}"#).unwrap());
    assert_eq!(p.allergies.as_deref(), Some("peanuts"));
    assert_eq!(p.preferences, vec!["vegan".to_owned()]);
  }

  #[test]
  fn new_client_normalisation() {
    let c = NewClient {
      name: " Ana ".into(),
      phone: "(11) 98765-4321".into(),
      person_id: "529.982.247-25".into(),
      allergies: Some("".into()),
      ..Default::default()
    }
    .normalized();
    assert_eq!(c.name, "Ana");
    assert_eq!(c.phone, "11987654321");
    assert_eq!(c.person_id, "52998224725");
    assert_eq!(c.allergies, None);
  }
}
