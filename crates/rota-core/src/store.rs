//! The `DocumentStore` trait, the persistence collaborator of the services.
//!
//! The trait is implemented by storage backends (e.g. `rota-store-sqlite`).
//! The query engine and the mutation services depend on this abstraction, not
//! on any concrete backend. Every method is a suspension point; nothing is
//! fire-and-forget.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  client::{ClientPrivate, ClientProfile},
  query::QueryPlan,
  restaurant::Restaurant,
};

/// Result of a single-document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Written,
  /// A unique key (tax ID, person ID) is held by another document. Nothing
  /// was written.
  Duplicate,
  /// The target document does not exist. Nothing was written.
  Missing,
  /// The document changed since it was read. Nothing was written.
  Stale,
}

/// Abstraction over a document store backend.
///
/// Writes are atomic per call. Unique keys must be enforced by the backend
/// itself (unique index or transaction), not only by a caller-side pre-check.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Restaurants ───────────────────────────────────────────────────────

  /// Insert a new restaurant. Returns [`WriteOutcome::Duplicate`] if another
  /// restaurant already holds the same `tax_id`.
  fn insert_restaurant(
    &self,
    restaurant: Restaurant,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// ID of the restaurant holding `tax_id`, if any.
  fn find_restaurant_by_tax_id<'a>(
    &'a self,
    tax_id: &'a str,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;

  /// Retrieve a restaurant by ID. Returns `None` if not found.
  fn get_restaurant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Restaurant>, Self::Error>> + Send + '_;

  /// Overwrite a restaurant, but only if its stored `updated_at` still equals
  /// `expected_updated_at` (optimistic concurrency).
  fn replace_restaurant(
    &self,
    restaurant: Restaurant,
    expected_updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Hard-delete a restaurant. Returns `false` if nothing was deleted.
  fn delete_restaurant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Execute a listing plan.
  ///
  /// Implementations must only return `active` restaurants matching every
  /// filter, in the plan's order, resuming strictly after its cursor, and at
  /// most [`QueryPlan::fetch_limit`] rows.
  fn query_restaurants<'a>(
    &'a self,
    plan: &'a QueryPlan,
  ) -> impl Future<Output = Result<Vec<Restaurant>, Self::Error>> + Send + 'a;

  // ── Clients ───────────────────────────────────────────────────────────

  /// Identity of the client holding `person_id`, if any.
  fn find_client_by_person_id<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn get_client<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<ClientProfile>, Self::Error>> + Send + 'a;

  fn get_client_private<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<ClientPrivate>, Self::Error>> + Send + 'a;

  /// Upsert both client documents in one transaction. Returns
  /// [`WriteOutcome::Duplicate`] if another identity holds the person ID.
  fn put_client(
    &self,
    profile: ClientProfile,
    private: ClientPrivate,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Delete both client documents. Returns `false` if neither existed.
  fn delete_client<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

/// A backend answered a write with an outcome the operation cannot produce
/// (e.g. `Stale` for an insert).
#[derive(Debug, thiserror::Error)]
#[error("unexpected store outcome {outcome:?} for {operation}")]
pub struct UnexpectedOutcome {
  pub outcome:   WriteOutcome,
  pub operation: &'static str,
}
