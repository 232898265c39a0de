use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug)]
enum ErrorBody {
    Detail(String),
    PlainText(String),
    Fields(Vec<FieldError>),
}

/// One failed field, shaped like the usual `{loc, msg, type}` validation
/// entries so clients can point at the offending input.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Detail(message.into()),
        }
    }

    pub fn plain_text(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::PlainText(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn validation(location: &str, field: &str, message: impl Into<String>) -> Self {
        Self::fields(
            StatusCode::UNPROCESSABLE_ENTITY,
            FieldError {
                loc: vec![location.to_string(), field.to_string()],
                msg: message.into(),
                kind: "value_error",
            },
        )
    }

    /// A request body that could not be read into the expected shape.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::fields(
            StatusCode::UNPROCESSABLE_ENTITY,
            FieldError {
                loc: vec!["body".to_string()],
                msg: message.into(),
                kind: "value_error",
            },
        )
    }

    fn fields(status: StatusCode, error: FieldError) -> Self {
        Self {
            status,
            body: ErrorBody::Fields(vec![error]),
        }
    }

    /// Logs the cause and hides it from the client.
    pub fn internal<E: Display>(error: E) -> Self {
        tracing::error!(error = %error, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        match self.body {
            ErrorBody::Detail(detail) => (status, Json(DetailResponse { detail })).into_response(),
            ErrorBody::Fields(detail) => (status, Json(DetailResponse { detail })).into_response(),
            ErrorBody::PlainText(text) => (status, text).into_response(),
        }
    }
}

#[derive(Serialize)]
struct DetailResponse<T> {
    detail: T,
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AppError::not_found(),
            StoreError::DuplicateEmail => AppError::bad_request("email already exists in waitlist"),
            StoreError::DuplicateUsername => AppError::bad_request("username already exists"),
            other => AppError::internal(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let kind = match &rejection {
            JsonRejection::JsonSyntaxError(_) => "json_invalid",
            JsonRejection::MissingJsonContentType(_) => "content_type",
            _ => "value_error",
        };
        Self::fields(
            rejection.status(),
            FieldError {
                loc: vec!["body".to_string()],
                msg: rejection.body_text(),
                kind,
            },
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}
