//! Bearer-token identity verifier and the [`Caller`] extractor.
//!
//! Tokens are never stored; the table holds hex SHA-256 digests mapped to
//! caller identities.

use std::{collections::HashMap, convert::Infallible};

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use rota_core::{
  identity::{self, CallerIdentity},
  store::DocumentStore,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::AppState;

/// One configured identity: `uid` plus the digest of its bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEntry {
  pub uid:          String,
  /// Lowercase hex SHA-256 of the token.
  pub token_sha256: String,
}

/// Digest-to-identity lookup table.
#[derive(Debug, Default)]
pub struct TokenTable {
  by_digest: HashMap<String, CallerIdentity>,
}

impl TokenTable {
  pub fn new(entries: impl IntoIterator<Item = IdentityEntry>) -> Self {
    let by_digest = entries
      .into_iter()
      .map(|e| (e.token_sha256.trim().to_ascii_lowercase(), CallerIdentity::new(e.uid)))
      .collect();
    Self { by_digest }
  }

  pub fn len(&self) -> usize { self.by_digest.len() }

  pub fn is_empty(&self) -> bool { self.by_digest.is_empty() }

  /// Identity for `token`, if it is known.
  pub fn verify(&self, token: &str) -> Option<CallerIdentity> {
    self.by_digest.get(&token_digest(token)).cloned()
  }
}

/// Hex SHA-256 of a bearer token, as stored in configuration.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve the caller from an `Authorization: Bearer <token>` header.
///
/// A missing, malformed or unknown token resolves to `None`; the services
/// decide whether an identity is required.
pub fn caller_from_headers(
  headers: &HeaderMap,
  table: &TokenTable,
) -> Option<CallerIdentity> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ")?.trim();
  if token.is_empty() {
    return None;
  }
  let caller = table.verify(token);
  if caller.is_none() {
    tracing::debug!("bearer token did not match any identity");
  }
  caller
}

/// The verified caller of a request, if any.
pub struct Caller(pub Option<CallerIdentity>);

impl Caller {
  pub fn identity(&self) -> Option<&CallerIdentity> { self.0.as_ref() }

  /// The caller, or [`rota_core::Error::Unauthenticated`].
  pub fn require(&self) -> rota_core::Result<&CallerIdentity> {
    identity::require(self.identity())
  }
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: DocumentStore + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Caller(caller_from_headers(&parts.headers, &state.tokens)))
  }
}
