//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use debridgate_common::Error;

/// A gateway error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code the error is reported with.
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

/// Map an error to its HTTP status.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidLink(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Unsupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
        Error::Upstream { .. } | Error::Network(_) => StatusCode::BAD_GATEWAY,
        Error::TaskIncomplete(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Crypto(_)
        | Error::CorruptListing(_)
        | Error::Serialization(_)
        | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("Internal error: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use debridgate_common::StoreName;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidLink("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                Error::unsupported(StoreName::Seedr, "add_magnet"),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (
                Error::upstream(StoreName::PikPak, "500"),
                StatusCode::BAD_GATEWAY,
            ),
            (Error::Network("reset".into()), StatusCode::BAD_GATEWAY),
            (Error::Crypto("tag".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{}", err);
        }
    }

    #[test]
    fn test_internal_details_hidden() {
        let response = ApiError(Error::Crypto("bad tag for key 1234".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
