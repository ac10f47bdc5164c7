use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

impl<V: Serialize> IntoResponse for Success<V> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    MissingCredentials { message: String },
    InvalidCredentials { message: String },
    Unauthenticated { message: String },
    InvalidToken { message: String },
    ForbiddenRole { message: String },
    InvalidPayload { message: String },
    UnsupportedMedia { message: String },
    NotFound { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MissingCredentials { .. }
            | Error::InvalidPayload { .. }
            | Error::UnsupportedMedia { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials { .. } | Error::Unauthenticated { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Error::InvalidToken { .. } | Error::ForbiddenRole { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // 500s carry a fixed message; whatever actually failed has already been logged
    pub fn server_error(kind: &'static str) -> Error {
        Error::InternalError {
            kind,
            message: "Server error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Failure {
    success: bool,
    #[serde(flatten)]
    error: Error,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(Failure {
                success: false,
                error: self,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        log::error!("Database error: {}", err);
        Error::server_error("DatabaseError")
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        log::error!("IO error: {}", err);
        Error::server_error("IOError")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (
                Error::MissingCredentials {
                    message: String::new(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::InvalidCredentials {
                    message: String::new(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::Unauthenticated {
                    message: String::new(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::InvalidToken {
                    message: String::new(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                Error::ForbiddenRole {
                    message: String::new(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                Error::UnsupportedMedia {
                    message: String::new(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::server_error("DatabaseError"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn database_failure_does_not_leak_detail() {
        let err = Error::from(sqlx::Error::PoolTimedOut);
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["message"], "Server error");
        assert_eq!(body["error"], "InternalError");
    }
}
