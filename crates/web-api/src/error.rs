use application::{ApplicationError, ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let message = error.client_message();
        match error.kind() {
            ErrorKind::Authentication => ApiError::unauthorized(message),
            ErrorKind::AccessDenied => ApiError::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", message),
            ErrorKind::Validation => ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message),
            ErrorKind::NotFound => ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
            ErrorKind::Persistence => ApiError::internal_server_error(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
