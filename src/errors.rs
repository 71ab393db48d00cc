use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Service wide error type. Everything a handler can fail with is mapped onto
/// one of these variants and rendered as `{"success": false, "error": ...}`.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("missing or malformed X-User-Id header")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            error: self.to_string(),
        })
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ServiceError::NotFound("record"),
            other => {
                error!("database error: {}", other);
                ServiceError::Internal
            }
        }
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(err: r2d2::Error) -> Self {
        error!("connection pool error: {}", err);
        ServiceError::Internal
    }
}

impl From<BlockingError> for ServiceError {
    fn from(err: BlockingError) -> Self {
        error!("blocking task error: {}", err);
        ServiceError::Internal
    }
}
