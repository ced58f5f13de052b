//! Handlers for `/restaurants` endpoints.
//!
//! | Method   | Path                | Notes                                  |
//! |----------|---------------------|----------------------------------------|
//! | `GET`    | `/restaurants`      | Filters, search, cursor pagination     |
//! | `POST`   | `/restaurants`      | Bearer token required; `201 {"id"}`    |
//! | `GET`    | `/restaurants/{id}` | Public; 404 if missing                 |
//! | `PATCH`  | `/restaurants/{id}` | Bearer token required; `204`           |
//! | `DELETE` | `/restaurants/{id}` | Bearer token required; `204`, idempotent |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rota_core::{
  Error,
  query::{Cursor, ListFilters, ListParams, PagedResult, parse_page_size},
  restaurant::{NewRestaurant, Restaurant, RestaurantPatch},
  store::DocumentStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, ApiJson, ApiQuery, auth::Caller, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

/// Raw listing query string. Everything arrives as text so a malformed value
/// degrades to a default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
  pub region:               Option<String>,
  pub municipality:         Option<String>,
  pub accepts_reservations: Option<String>,
  pub has_queue:            Option<String>,
  pub search_text:          Option<String>,
  /// Legacy alias of `searchText`.
  pub q:                    Option<String>,
  pub page_size:            Option<String>,
  /// Legacy alias of `pageSize`.
  pub limit:                Option<String>,
  /// Opaque token from a previous `nextCursor`.
  pub cursor:               Option<String>,
  /// Legacy raw row ID (default mode).
  pub cursor_id:            Option<String>,
  /// Legacy raw name (search mode).
  pub cursor_nome:          Option<String>,
}

impl ListQuery {
  pub fn into_params(self) -> ListParams {
    let search_text = non_blank(self.search_text).or(non_blank(self.q));
    // Each legacy raw cursor belongs to one mode.
    let legacy = if search_text.is_some() {
      non_blank(self.cursor_nome).map(Cursor::AfterName)
    } else {
      non_blank(self.cursor_id)
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .map(Cursor::AfterRow)
    };
    ListParams {
      filters:     ListFilters {
        region:               non_blank(self.region),
        municipality:         non_blank(self.municipality),
        accepts_reservations: self.accepts_reservations.as_deref().map(flag),
        has_queue:            self.has_queue.as_deref().map(flag),
      },
      search_text,
      page_size:   parse_page_size(
        non_blank(self.page_size).or(non_blank(self.limit)).as_deref(),
      ),
      cursor:      resolve_cursor(self.cursor, legacy),
    }
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

/// A present flag is `true` only when it reads `true`, in any casing.
fn flag(value: &str) -> bool { value.trim().eq_ignore_ascii_case("true") }

/// An opaque token wins over a legacy raw cursor.
fn resolve_cursor(token: Option<String>, legacy: Option<Cursor>) -> Option<Cursor> {
  let Some(token) = non_blank(token) else {
    return legacy;
  };
  let cursor = Cursor::decode(token.trim());
  if cursor.is_none() {
    tracing::debug!("unreadable cursor token ignored");
  }
  cursor
}

/// `GET /restaurants[?region=..][&municipality=..][&acceptsReservations=..]
/// [&hasQueue=..][&searchText=..][&pageSize=..][&cursor=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<PagedResult>, ApiError>
where
  S: DocumentStore + 'static,
{
  let page = state.restaurants.list(query.into_params()).await?;
  Ok(Json(page))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /restaurants`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  body: Result<ApiJson<NewRestaurant>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  let me = caller.require()?;
  let ApiJson(body) = body?;
  let id = state.restaurants.create(body, Some(me)).await?;
  Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /restaurants/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Restaurant>, ApiError>
where
  S: DocumentStore + 'static,
{
  let restaurant = state.restaurants.get(parse_id(&id)?).await?;
  Ok(Json(restaurant))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /restaurants/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
  patch: Result<ApiJson<RestaurantPatch>, ApiError>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  let me = caller.require()?;
  let id = parse_id(&id)?;
  let ApiJson(patch) = patch?;
  state.restaurants.update(id, patch, Some(me)).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /restaurants/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  // An ID that cannot exist is already deleted.
  let me = caller.require()?;
  let Ok(id) = Uuid::parse_str(&id) else {
    return Ok(StatusCode::NO_CONTENT);
  };
  state.restaurants.delete(id, Some(me)).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Restaurant IDs are UUIDs; anything else cannot name a stored document.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw)
    .map_err(|_| Error::NotFound(format!("restaurant {raw} not found")).into())
}
