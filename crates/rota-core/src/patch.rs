//! Serde helpers shared by the partial-update patch types.
//!
//! Patches distinguish three states for a nullable field:
//!
//! | JSON            | Rust              | Meaning       |
//! |-----------------|-------------------|---------------|
//! | key absent      | `None`            | leave as is   |
//! | `"key": null`   | `Some(None)`      | clear         |
//! | `"key": value`  | `Some(Some(v))`   | replace       |

use serde::{Deserialize, Deserializer};

/// Use with `#[serde(default, deserialize_with = "present")]` on an
/// `Option<Option<T>>` field.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

/// Apply a `Some(value)` onto `slot`; `None` leaves it untouched.
pub(crate) fn set<T>(slot: &mut T, value: Option<T>) {
  if let Some(v) = value {
    *slot = v;
  }
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::present;

  #[derive(Debug, Deserialize)]
  struct Holder {
    #[serde(default, deserialize_with = "present")]
    field: Option<Option<String>>,
  }

  #[test]
  fn distinguishes_absent_null_and_value() {
    let absent: Holder = serde_json::from_str("{}").unwrap();
    let null: Holder = serde_json::from_str(r#"{"field":null}"#).unwrap();
    let value: Holder = serde_json::from_str(r#"{"field":"x"}"#).unwrap();

    assert_eq!(absent.field, None);
    assert_eq!(null.field, Some(None));
    assert_eq!(value.field, Some(Some("x".to_owned())));
  }
}
