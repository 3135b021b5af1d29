//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use gatecheck_engine::EngineError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("verification not found: {0}")]
    VerificationNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("support decision already recorded: {0}")]
    AlreadyRecorded(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<EngineError> for RpcError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::EventNotFound(id) => RpcError::EventNotFound(id.to_string()),
            EngineError::VerificationNotFound(id) => {
                RpcError::VerificationNotFound(id.to_string())
            }
            EngineError::SupportDecisionAlreadyRecorded { id, existing } => {
                RpcError::AlreadyRecorded(format!("{id} already ruled {existing}"))
            }
            EngineError::Store(gatecheck_store::StoreError::Conflict(msg)) => {
                RpcError::Conflict(msg)
            }
            EngineError::Store(other) => RpcError::Store(other.to_string()),
        }
    }
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            RpcError::EventNotFound(_) | RpcError::VerificationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::AlreadyRecorded(_) | RpcError::Conflict(_) => StatusCode::CONFLICT,
            RpcError::Store(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_store::StoreError;
    use gatecheck_types::{EventId, SupportDecision, VerificationId};

    #[test]
    fn engine_errors_map_to_matching_statuses() {
        let missing: RpcError = EngineError::EventNotFound(EventId::new(40)).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let ruled: RpcError = EngineError::SupportDecisionAlreadyRecorded {
            id: VerificationId::new(1),
            existing: SupportDecision::ConfirmedFraud,
        }
        .into();
        assert_eq!(ruled.status(), StatusCode::CONFLICT);

        let moved: RpcError =
            EngineError::Store(StoreError::Conflict("trust row moved".into())).into();
        assert_eq!(moved.status(), StatusCode::CONFLICT);

        let down: RpcError = EngineError::Store(StoreError::Timeout("scan".into())).into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
