//! RPC error types and their HTTP rendering.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use daiv_node::NodeError;
use daiv_types::ErrorKind;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateContent
        | ErrorKind::AlreadyVoted
        | ErrorKind::AlreadyExecuted
        | ErrorKind::AlreadyReleased => StatusCode::CONFLICT,
        ErrorKind::Unauthorized | ErrorKind::MissingAuthorization => StatusCode::FORBIDDEN,
        ErrorKind::InsufficientBalance
        | ErrorKind::InvalidState
        | ErrorKind::ZeroWeight
        | ErrorKind::VotingClosed
        | ErrorKind::Overflow => StatusCode::UNPROCESSABLE_ENTITY,
        // 425 Too Early
        ErrorKind::NotYetEligible => {
            StatusCode::from_u16(425).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
        }
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Node(e) => status_for(e.kind()),
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code reported in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Node(e) => e.kind().as_str(),
            Self::InvalidRequest(_) => "BadRequest",
            Self::Server(_) => "Internal",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        if status.is_server_error() {
            error!(code = body.error, message = %body.message, "request failed");
        } else {
            warn!(code = body.error, message = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RpcError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for RpcError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daiv_types::DatasetId;

    #[test]
    fn node_errors_map_by_kind() {
        let not_found = RpcError::from(NodeError::Registry(
            daiv_registry::RegistryError::NotFound(DatasetId::new(3)),
        ));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.code(), "NotFound");

        let auth = RpcError::from(NodeError::MissingAuthorization {
            caller: "eve".into(),
            operation: "cancel proposals",
        });
        assert_eq!(auth.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn every_kind_has_a_status() {
        assert_eq!(status_for(ErrorKind::NotYetEligible).as_u16(), 425);
        assert_eq!(status_for(ErrorKind::AlreadyExecuted), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::Storage),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_input_is_bad_request() {
        let e = RpcError::InvalidRequest("missing field `voter`".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.code(), "BadRequest");
    }
}
