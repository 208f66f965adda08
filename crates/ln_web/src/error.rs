use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// JSON error body `{"message": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Not found: {}", what))
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<ln_core::Error> for ApiError {
    fn from(e: ln_core::Error) -> Self {
        use ln_core::Error;
        let code = match &e {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Source(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if code == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", e);
        }
        Self::new(code, e.to_string())
    }
}

impl From<ln_sources::SourceError> for ApiError {
    fn from(e: ln_sources::SourceError) -> Self {
        ln_core::Error::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(ApiError::from(ln_core::Error::NotFound("x".into())).code, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(ln_core::Error::InvalidInput("x".into())).code,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ln_core::Error::Source("down".into())).code,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ln_core::Error::Storage("disk".into())).code,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
