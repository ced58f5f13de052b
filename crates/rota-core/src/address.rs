//! Postal address shared by restaurants and client profiles.

use serde::{Deserialize, Serialize};

use crate::{patch::set, validate::normalize_digits};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
  /// Digits only.
  pub postal_code:  String,
  pub street:       String,
  pub number:       String,
  pub district:     String,
  pub municipality: String,
  /// Two-letter region (state) code.
  pub region:       String,
}

impl Address {
  /// Trim free-text fields and reduce the postal code to digits.
  pub fn normalized(self) -> Self {
    Self {
      postal_code:  normalize_digits(&self.postal_code),
      street:       self.street.trim().to_owned(),
      number:       self.number.trim().to_owned(),
      district:     self.district.trim().to_owned(),
      municipality: self.municipality.trim().to_owned(),
      region:       self.region.trim().to_owned(),
    }
  }
}

/// Field-level patch for [`Address`]; absent keys leave siblings untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressPatch {
  pub postal_code:  Option<String>,
  pub street:       Option<String>,
  pub number:       Option<String>,
  pub district:     Option<String>,
  pub municipality: Option<String>,
  pub region:       Option<String>,
}

impl AddressPatch {
  pub fn apply_to(self, address: &mut Address) {
    set(&mut address.postal_code, self.postal_code.map(|c| normalize_digits(&c)));
    set(&mut address.street, trimmed(self.street));
    set(&mut address.number, trimmed(self.number));
    set(&mut address.district, trimmed(self.district));
    set(&mut address.municipality, trimmed(self.municipality));
    set(&mut address.region, trimmed(self.region));
  }
}

fn trimmed(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned())
}
