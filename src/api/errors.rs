use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

use crate::services::catalog::CatalogError;
use crate::services::errors::ServiceError;

const GENERIC_FAILURE: &str = "Something went wrong, please try again";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    status: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable { field: Option<String>, message: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant that
    /// carries no detail.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(GENERIC_FAILURE.to_string())
    }

    pub(crate) fn invalid_payload(errors: ValidationErrors) -> Self {
        Self::Unprocessable { field: None, message: errors.to_string() }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidIdentifier { .. } => {
                ApiError::BadRequest("This link is invalid".to_string())
            }
            ServiceError::Validation { field, message } => {
                ApiError::Unprocessable { field: Some(field.to_string()), message }
            }
            ServiceError::InvalidState { action, status } => {
                tracing::warn!(action, status = status.as_str(), "Invalid submission state");
                ApiError::Conflict(format!("Cannot {action} a submission that is {status}"))
            }
            ServiceError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            ServiceError::Unauthorized => ApiError::Forbidden("Access denied"),
            ServiceError::Stale { action } => {
                tracing::warn!(action, "Submission changed during mutation");
                ApiError::Conflict(format!(
                    "The submission changed while the {action} was in progress; reload and try again"
                ))
            }
            ServiceError::InFlight { action } => {
                ApiError::Conflict(format!("A {action} for this submission is already in progress"))
            }
            ServiceError::Store(err) => ApiError::internal(err, "Submission store failure"),
            ServiceError::Catalog(CatalogError::NotFound) => {
                ApiError::NotFound("assessment not found".to_string())
            }
            ServiceError::Catalog(err) => ApiError::internal(err, "Assessment catalog failure"),
        }
    }
}

fn error_body(status: StatusCode, error: String, field: Option<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse { success: false, status: status.as_u16(), error, field })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response =
                    (status, error_body(status, message.to_string(), None)).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (status, error_body(status, message.to_string(), None)).into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, error_body(status, message, None)).into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, error_body(status, message, None)).into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, error_body(status, message, None)).into_response()
            }
            ApiError::Unprocessable { field, message } => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                (status, error_body(status, message, field)).into_response()
            }
            ApiError::Internal(message) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, error_body(status, message, None)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::SubmissionStatus;
    use crate::repositories::StoreError;
    use axum::body::to_bytes;

    async fn render(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = ApiError::from(err).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn taxonomy_maps_to_distinct_statuses() {
        let (status, body) = render(ServiceError::InvalidIdentifier { field: "id" }).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "This link is invalid");
        assert_eq!(body["success"], false);

        let (status, body) = render(ServiceError::validation("score", "Score must be a number")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "score");

        let (status, _) = render(ServiceError::InvalidState {
            action: "grade",
            status: SubmissionStatus::Draft,
        })
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = render(ServiceError::NotFound("submission")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(ServiceError::Unauthorized).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Access denied");

        let (status, _) = render(ServiceError::InFlight { action: "grade" }).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = render(ServiceError::Stale { action: "submit" }).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("reload"));
    }

    #[tokio::test]
    async fn store_failures_are_generic() {
        let (status, body) =
            render(ServiceError::Store(StoreError::Unavailable("connection reset".into()))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_FAILURE);
        assert!(body.get("field").is_none());
    }
}
