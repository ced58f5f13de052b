//! Handlers for `/clients` endpoints. All of them require a bearer token and
//! only ever touch the caller's own profile; `{id}` may be `me`. Bodies are
//! decoded after the caller is checked, so a missing token is always `401`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rota_core::{
  client::{ClientPatch, ClientProfile, NewClient},
  store::DocumentStore,
};
use serde_json::json;

use crate::{AppState, ApiJson, auth::Caller, error::ApiError};

/// `POST /clients`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  body: Result<ApiJson<NewClient>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  let me = caller.require()?;
  let ApiJson(body) = body?;
  let id = state.clients.create(body, Some(me)).await?;
  Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// `GET /clients/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<Json<ClientProfile>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(state.clients.get(&id, caller.identity()).await?))
}

/// `PATCH /clients/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
  patch: Result<ApiJson<ClientPatch>, ApiError>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  let me = caller.require()?;
  let ApiJson(patch) = patch?;
  state.clients.update(&id, patch, Some(me)).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /clients/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  state.clients.delete(&id, caller.identity()).await?;
  Ok(StatusCode::NO_CONTENT)
}
