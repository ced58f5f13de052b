//! JSON REST API for Rota.
//!
//! Exposes an axum [`Router`] backed by any [`rota_core::store::DocumentStore`].
//! TLS, CORS and request tracing are layered on by the caller.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = rota_api::AppState::new(store, OwnershipPolicy::Open, tokens);
//! let app = rota_api::router(state).layer(cors);
//! ```

pub mod auth;
pub mod clients;
pub mod error;
pub mod restaurants;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{FromRequest, FromRequestParts, Query},
  routing::{get, post},
};
use rota_core::{
  mutation::{OwnershipPolicy, RestaurantService},
  profile::ClientService,
  store::DocumentStore,
};
use serde_json::{Value, json};

pub use auth::{IdentityEntry, TokenTable};
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub restaurants: Arc<RestaurantService<S>>,
  pub clients:     Arc<ClientService<S>>,
  pub tokens:      Arc<TokenTable>,
}

impl<S> AppState<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>, ownership: OwnershipPolicy, tokens: TokenTable) -> Self {
    Self {
      restaurants: Arc::new(RestaurantService::new(store.clone(), ownership)),
      clients:     Arc::new(ClientService::new(store)),
      tokens:      Arc::new(tokens),
    }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      restaurants: self.restaurants.clone(),
      clients:     self.clients.clone(),
      tokens:      self.tokens.clone(),
    }
  }
}

/// `Json` whose rejection renders as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection renders as an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + 'static,
{
  Router::new()
    // Restaurants
    .route(
      "/restaurants",
      get(restaurants::list::<S>).post(restaurants::create::<S>),
    )
    .route(
      "/restaurants/{id}",
      get(restaurants::get_one::<S>)
        .patch(restaurants::update::<S>)
        .delete(restaurants::delete_one::<S>),
    )
    // Clients
    .route("/clients", post(clients::create::<S>))
    .route(
      "/clients/{id}",
      get(clients::get_one::<S>)
        .patch(clients::update::<S>)
        .delete(clients::delete_one::<S>),
    )
    .route("/health", get(health))
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use rota_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::token_digest;

  async fn make_state(ownership: OwnershipPolicy) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let tokens = TokenTable::new(["alice", "bob"].map(|uid| IdentityEntry {
      uid:          uid.to_string(),
      token_sha256: token_digest(&format!("{uid}-token")),
    }));
    AppState::new(Arc::new(store), ownership, tokens)
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    as_uid: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = as_uid {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {uid}-token"));
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn pizza(name: &str, tax_id: &str) -> Value {
    json!({
      "name": name,
      "taxId": tax_id,
      "phone": "(11) 3333-4444",
      "address": {
        "postalCode": "01310-100",
        "street": "Av. Paulista",
        "number": "1000",
        "district": "Bela Vista",
        "municipality": "São Paulo",
        "region": "SP"
      },
      "serviceOptions": { "acceptsReservations": true, "hasQueue": false },
      "schedule": { "opensAt": "08:00", "closesAt": "22:00" },
      "priceRange": { "min": 20, "max": 80 }
    })
  }

  async fn create(state: &AppState<SqliteStore>, name: &str, tax_id: &str) -> String {
    let resp = send(state, "POST", "/restaurants", Some("alice"), Some(pizza(name, tax_id))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["id"].as_str().unwrap().to_owned()
  }

  // ── Health ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_is_ok() {
    let state = make_state(OwnershipPolicy::Open).await;
    let resp = send(&state, "GET", "/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "status": "ok" }));
  }

  // ── Restaurants ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_get_returns_active_document() {
    let state = make_state(OwnershipPolicy::Open).await;
    let id = create(&state, "Pizza X", "11222333000181").await;

    let resp = send(&state, "GET", &format!("/restaurants/{id}"), None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = json_body(resp).await;
    assert_eq!(doc["id"], id.as_str());
    assert_eq!(doc["status"], "active");
    assert_eq!(doc["averageRating"], 0.0);
    assert_eq!(doc["ownerIdentity"], "alice");
    assert_eq!(doc["address"]["postalCode"], "01310100");
  }

  #[tokio::test]
  async fn create_without_valid_token_is_401() {
    let state = make_state(OwnershipPolicy::Open).await;
    let body = Some(pizza("Pizza X", "11222333000181"));

    let resp = send(&state, "POST", "/restaurants", None, body.clone()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(json_body(resp).await["error"]["kind"], "unauthenticated");

    let resp = send(&state, "POST", "/restaurants", Some("mallory"), body).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn duplicate_tax_id_is_409() {
    let state = make_state(OwnershipPolicy::Open).await;
    create(&state, "Pizza X", "11222333000181").await;

    let resp = send(
      &state,
      "POST",
      "/restaurants",
      Some("bob"),
      Some(pizza("Other", "11.222.333/0001-81")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"]["kind"], "conflict");
  }

  #[tokio::test]
  async fn invalid_payloads_are_400() {
    let state = make_state(OwnershipPolicy::Open).await;

    let resp = send(
      &state,
      "POST",
      "/restaurants",
      Some("alice"),
      Some(pizza("Pizza X", "11111111111111")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["field"], "taxId");

    let req = Request::builder()
      .method("POST")
      .uri("/restaurants")
      .header(header::AUTHORIZATION, "Bearer alice-token")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["kind"], "validation");
  }

  #[tokio::test]
  async fn patch_merges_and_rejects_inverted_prices() {
    let state = make_state(OwnershipPolicy::Open).await;
    let id = create(&state, "Pizza X", "11222333000181").await;
    let uri = format!("/restaurants/{id}");

    let resp = send(
      &state,
      "PATCH",
      &uri,
      Some("bob"),
      Some(json!({ "priceRange": { "min": 100, "max": 50 } })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["field"], "priceRange");

    let resp = send(
      &state,
      "PATCH",
      &uri,
      Some("bob"),
      Some(json!({ "address": { "district": "Jardins" } })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let doc = json_body(send(&state, "GET", &uri, None, None).await).await;
    assert_eq!(doc["address"]["district"], "Jardins");
    assert_eq!(doc["address"]["street"], "Av. Paulista");
    assert_eq!(doc["priceRange"], json!({ "min": 20.0, "max": 80.0 }));

    let resp = send(
      &state,
      "PATCH",
      &uri,
      Some("bob"),
      Some(json!({ "averageRating": 5 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_ids_are_404_and_delete_is_idempotent() {
    let state = make_state(OwnershipPolicy::Open).await;

    let resp = send(&state, "GET", "/restaurants/not-a-uuid", None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let missing = format!("/restaurants/{}", uuid::Uuid::new_v4());
    let resp = send(&state, "GET", &missing, None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&state, "PATCH", &missing, Some("alice"), Some(json!({ "name": "X" }))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let id = create(&state, "Pizza X", "11222333000181").await;
    let uri = format!("/restaurants/{id}");
    for _ in 0..2 {
      let resp = send(&state, "DELETE", &uri, Some("alice"), None).await;
      assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    let resp = send(&state, "DELETE", &uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn owner_only_policy_is_403_for_others() {
    let state = make_state(OwnershipPolicy::OwnerOnly).await;
    let id = create(&state, "Pizza X", "11222333000181").await;
    let uri = format!("/restaurants/{id}");

    let resp = send(&state, "DELETE", &uri, Some("bob"), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&state, "DELETE", &uri, Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn search_listing_pages_with_opaque_cursor() {
    let state = make_state(OwnershipPolicy::Open).await;
    create(&state, "Pizza Y", "11222333000181").await;
    create(&state, "Pizza X", "11444777000161").await;

    let resp = send(&state, "GET", "/restaurants?searchText=Piz&pageSize=1", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = json_body(resp).await;
    assert_eq!(page["mode"], "search");
    assert_eq!(page["items"][0]["name"], "Pizza X");
    assert_eq!(page["hasMore"], true);
    let cursor = page["nextCursor"].as_str().unwrap().to_owned();

    let uri = format!("/restaurants?q=Piz&limit=1&cursor={cursor}");
    let page = json_body(send(&state, "GET", &uri, None, None).await).await;
    assert_eq!(page["items"][0]["name"], "Pizza Y");
    assert_eq!(page["hasMore"], false);
    assert!(page["nextCursor"].is_null());

    let page = json_body(send(&state, "GET", "/restaurants?region=RJ", None, None).await).await;
    assert_eq!(page["mode"], "default");
    assert_eq!(page["items"], json!([]));
  }

  #[tokio::test]
  async fn malformed_listing_query_is_structured_400() {
    let state = make_state(OwnershipPolicy::Open).await;
    let resp = send(&state, "GET", "/restaurants?region=SP&region=RJ", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["kind"], "validation");
    assert!(body["error"]["message"].is_string());
  }

  #[tokio::test]
  async fn browse_resumes_from_legacy_row_cursor_when_both_aliases_sent() {
    let state = make_state(OwnershipPolicy::Open).await;
    create(&state, "Pizza Y", "11222333000181").await;
    create(&state, "Pizza X", "11444777000161").await;

    let first = json_body(send(&state, "GET", "/restaurants?pageSize=1", None, None).await).await;
    let top = first["items"][0]["id"].as_str().unwrap().to_owned();

    let uri = format!("/restaurants?pageSize=1&cursorId={top}&cursorNome=Pizza");
    let next = json_body(send(&state, "GET", &uri, None, None).await).await;
    assert_eq!(next["mode"], "default");
    assert_ne!(next["items"][0]["id"], top.as_str());
    assert_eq!(next["hasMore"], false);
  }

  #[tokio::test]
  async fn unauthenticated_writes_are_401_before_id_or_body_checks() {
    let state = make_state(OwnershipPolicy::Open).await;
    let cases = [
      ("PATCH", "/restaurants/not-a-uuid", Some(json!({ "name": "X" }))),
      ("PATCH", "/restaurants/not-a-uuid", Some(json!({ "averageRating": 5 }))),
      ("POST", "/restaurants", Some(json!({ "name": 1 }))),
      ("POST", "/clients", Some(json!({}))),
      ("PATCH", "/clients/me", Some(json!({ "unknown": true }))),
      ("DELETE", "/restaurants/not-a-uuid", None),
    ];
    for (method, uri, body) in cases {
      let resp = send(&state, method, uri, None, body).await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let resp = send(
      &state,
      "PATCH",
      "/restaurants/not-a-uuid",
      Some("alice"),
      Some(json!({ "averageRating": 5 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Clients ─────────────────────────────────────────────────────────────────

  fn client(person_id: &str) -> Value {
    json!({
      "name": "Ana Souza",
      "phone": "11988887777",
      "personId": person_id,
      "address": { "postalCode": "01310100", "municipality": "São Paulo", "region": "SP" },
      "preferences": ["vegan"]
    })
  }

  #[tokio::test]
  async fn client_lifecycle_through_me_alias() {
    let state = make_state(OwnershipPolicy::Open).await;

    let resp = send(&state, "POST", "/clients", Some("alice"), Some(client("52998224725"))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["id"], "alice");

    let resp = send(&state, "GET", "/clients/me", Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile = json_body(resp).await;
    assert_eq!(profile["nameLower"], "ana souza");
    assert!(profile.get("personId").is_none());

    let resp = send(&state, "GET", "/clients/alice", Some("bob"), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&state, "POST", "/clients", Some("bob"), Some(client("529.982.247-25"))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(
      &state,
      "PATCH",
      "/clients/me",
      Some("alice"),
      Some(json!({ "allergies": "lactose" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "DELETE", "/clients/alice", Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&state, "GET", "/clients/me", Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
