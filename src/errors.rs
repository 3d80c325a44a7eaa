use crate::backend::BackendError;
use actix_web::{HttpResponse, http::StatusCode, ResponseError};
use thiserror::Error;
use serde::Serialize;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("could not dispatch one-time code: {0}")]
    Dispatch(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ApiErrBody {
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Write(_) => StatusCode::BAD_GATEWAY,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrBody { error: self.to_string() })
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized => ApiError::Unauthorized,
            BackendError::NotFound => ApiError::NotFound,
            other => {
                log::error!("backend error: {other}");
                ApiError::Backend(other.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        log::error!("row decode error: {e}");
        ApiError::Internal
    }
}
