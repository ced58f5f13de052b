//! Error types for `rota-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A field is missing or malformed. Never partially applied.
  #[error("invalid {field}: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// A unique field (tax ID, person ID) is already taken.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// The document store failed for infrastructure reasons.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { field, message: message.into() }
  }

  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(e))
  }

  /// Machine-readable kind, stable across releases.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation { .. } => "validation",
      Self::Unauthenticated => "unauthenticated",
      Self::Forbidden(_) => "forbidden",
      Self::Conflict(_) => "conflict",
      Self::NotFound(_) => "not_found",
      Self::StoreUnavailable(_) => "store_unavailable",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
