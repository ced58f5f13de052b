//! The verified caller identity handed to the services by the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An identity already verified by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
  pub uid: String,
}

impl CallerIdentity {
  pub fn new(uid: impl Into<String>) -> Self { Self { uid: uid.into() } }
}

/// Reject the call with [`Error::Unauthenticated`] when no identity is present.
pub fn require(caller: Option<&CallerIdentity>) -> Result<&CallerIdentity> {
  caller.ok_or(Error::Unauthenticated)
}

/// Resolve a path parameter that is either `me` or an explicit identity, and
/// enforce that it names the caller.
pub fn resolve_self<'a>(
  caller: &'a CallerIdentity,
  requested: &str,
) -> Result<&'a str> {
  if requested == "me" || requested == caller.uid {
    Ok(&caller.uid)
  } else {
    Err(Error::Forbidden(format!(
      "identity {} may not access {requested}",
      caller.uid
    )))
  }
}
