//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as
//! `{"error": {"kind": "...", "message": "...", "field": "..."}}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] rota_core::Error),

  /// The request could not be decoded at all (malformed JSON or query string,
  /// unknown keys).
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use rota_core::Error as E;

    let (status, kind, message, field) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "validation", m.clone(), None),
      ApiError::Core(e) => {
        let status = match e {
          E::Validation { .. } => StatusCode::BAD_REQUEST,
          E::Unauthenticated => StatusCode::UNAUTHORIZED,
          E::Forbidden(_) => StatusCode::FORBIDDEN,
          E::NotFound(_) => StatusCode::NOT_FOUND,
          E::Conflict(_) => StatusCode::CONFLICT,
          E::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let message = match e {
          E::StoreUnavailable(source) => {
            tracing::error!(error = %source, "document store call failed");
            "the document store is unavailable".to_owned()
          }
          E::Validation { message, .. } => message.clone(),
          other => other.to_string(),
        };
        let field = match e {
          E::Validation { field, .. } => Some(*field),
          _ => None,
        };
        (status, e.kind(), message, field)
      }
    };

    let body = json!({
      "error": { "kind": kind, "message": message, "field": field },
    });
    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"rota\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn validation_carries_field() {
    let (status, body) =
      render(rota_core::Error::validation("taxId", "must have 14 digits").into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["field"], "taxId");
    assert_eq!(body["error"]["message"], "must have 14 digits");
  }

  #[tokio::test]
  async fn store_failure_hides_details() {
    let source = std::io::Error::other("disk on fire at /var/lib/rota.db");
    let (status, body) = render(rota_core::Error::store(source).into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "store_unavailable");
    assert!(!body.to_string().contains("/var/lib"));
    assert!(body["error"]["field"].is_null());
  }

  #[tokio::test]
  async fn status_mapping() {
    use rota_core::Error as E;
    let cases = [
      (E::Unauthenticated, StatusCode::UNAUTHORIZED),
      (E::Forbidden("x".into()), StatusCode::FORBIDDEN),
      (E::NotFound("x".into()), StatusCode::NOT_FOUND),
      (E::Conflict("x".into()), StatusCode::CONFLICT),
    ];
    for (err, expected) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), expected);
    }
  }
}
