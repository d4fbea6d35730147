use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::funnel::backend::BackendError;
use crate::models::Stage;
use crate::session::store::StoreError;

/// Engine-level error shared by ranking, session and funnel operations.
///
/// `Ambiguous` scores are not errors: they travel as a flag on the normalized score.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {from} is terminal, cannot move to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] BackendError),

    #[error("Superseded by a newer operation")]
    Superseded,

    #[error("Backing store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "INVALID_ARGUMENT",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::Persistence(_) => "PERSISTENCE_FAILURE",
            EngineError::Superseded => "SUPERSEDED",
            EngineError::Store(_) => "STORE_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// `Superseded` outcomes are discarded silently; everything else deserves a message.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, EngineError::Superseded)
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidTransition { .. } | EngineError::Superseded => StatusCode::CONFLICT,
            EngineError::Persistence(_) => StatusCode::BAD_GATEWAY,
            EngineError::Store(_) | EngineError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// `{ code, message }` pair used in HTTP error bodies and bulk results.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&EngineError> for ErrorBody {
    fn from(e: &EngineError) -> Self {
        let message = match e {
            EngineError::Persistence(_) => "Failed to save the change, please try again".to_string(),
            EngineError::Store(_) | EngineError::Serialization(_) => {
                "A session storage error occurred".to_string()
            }
            other => other.to_string(),
        };
        Self {
            code: e.code(),
            message,
        }
    }
}

/// HTTP-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Engine(e) => {
                match e {
                    EngineError::Persistence(inner) => tracing::error!("Persistence error: {inner}"),
                    EngineError::Store(_) | EngineError::Serialization(_) => {
                        tracing::error!("Session storage error: {e}")
                    }
                    _ => {}
                }
                (e.status(), ErrorBody::from(e))
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg.clone(),
                },
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An internal server error occurred".to_string(),
                    },
                )
            }
        };

        (status, Json(json!({ "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                EngineError::InvalidTransition {
                    from: Stage::Hired,
                    to: Stage::Offer,
                },
                StatusCode::CONFLICT,
            ),
            (EngineError::Persistence(BackendError::Timeout), StatusCode::BAD_GATEWAY),
            (EngineError::Superseded, StatusCode::CONFLICT),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).into_response().status(), status);
        }
    }

    #[test]
    fn test_persistence_message_is_user_friendly() {
        let body = ErrorBody::from(&EngineError::Persistence(BackendError::Transport(
            "connection reset".into(),
        )));
        assert_eq!(body.code, "PERSISTENCE_FAILURE");
        assert!(body.message.contains("try again"));
        assert!(!body.message.contains("connection reset"));
    }

    #[test]
    fn test_only_superseded_is_silent() {
        assert!(!EngineError::Superseded.is_user_visible());
        assert!(EngineError::NotFound("p1".into()).is_user_visible());
    }

    #[test]
    fn test_invalid_transition_message_names_stages() {
        let e = EngineError::InvalidTransition {
            from: Stage::Rejected,
            to: Stage::Screening,
        };
        assert_eq!(
            e.to_string(),
            "Invalid transition: rejected is terminal, cannot move to screening"
        );
    }
}
