//! Handler error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::server::validation::Violation;

/// Handler errors mapped onto HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(#[from] Violation),
    #[error("Not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(violation) => {
                let body = json!({
                    "title": "One or more validation errors occurred.",
                    "status": StatusCode::BAD_REQUEST.as_u16(),
                    "errors": { violation.field(): [violation.to_string()] },
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                let body = json!({
                    "title": "Internal server error",
                    "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validation_body_shape() {
        let response = ApiError::from(Violation::HitsBelowKills).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(
            body["errors"]["validHits"][0],
            "ValidHits must be ≥ Kills (armored moles need extra hits)."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        let db = ApiError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
