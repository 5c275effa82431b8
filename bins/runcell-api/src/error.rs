// Protocol-level errors for the runcell API
//
// Only request-shape problems (4xx) and internal faults (5xx) come through
// here. Program failures are successful responses with `data.error = true`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use runcell_common::types::ErrorBody;
use runcell_engine::ExecuteError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ExecuteError> for ApiError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::MissingFields => ApiError::bad_request(err.to_string()),
            ExecuteError::UnsupportedLanguage(_) => ApiError::bad_request("Unsupported language"),
            // Details stay in the logs; they can contain host paths
            ExecuteError::Internal(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Error executing code")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(self.status.as_u16(), self.message);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        let missing = ApiError::from(ExecuteError::MissingFields);
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.message, "Code and language are required");

        let unsupported = ApiError::from(ExecuteError::UnsupportedLanguage("cobol".into()));
        assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.message, "Unsupported language");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(ExecuteError::Internal(
            std::io::Error::other("/tmp/runcell/abc: permission denied").into(),
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("/tmp"));
    }
}
