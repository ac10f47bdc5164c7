use axum::body::Body;
use axum::headers::{Cookie, HeaderMapExt};
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::{Identity, Role};
use crate::err::Error;
use crate::token::TokenKeys;

pub const TOKEN_COOKIE: &str = "token";

pub fn session_cookie(token: &str) -> String {
    format!("{}={}; HttpOnly; Path=/", TOKEN_COOKIE, token)
}

pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0", TOKEN_COOKIE)
}

/// The cookie wins; the bearer header is only consulted when no cookie is set.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = headers.typed_get::<Cookie>() {
        if let Some(token) = cookie.get(TOKEN_COOKIE) {
            return Some(token.to_string());
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Authentication stage: a missing token is 401, a present-but-rejected
/// token is 403. On success the resolved `Identity` rides along in the
/// request extensions.
pub async fn authenticate(mut req: Request<Body>, next: Next<Body>) -> Result<Response, Error> {
    let token = match token_from_headers(req.headers()) {
        Some(token) => token,
        None => {
            log::debug!("No session token on {}", req.uri().path());
            return Err(Error::Unauthenticated {
                message: "Access denied".to_string(),
            });
        }
    };

    let keys = req.extensions().get::<TokenKeys>().ok_or_else(|| {
        log::error!("Token keys missing from request extensions");
        Error::server_error("Configuration")
    })?;
    let identity = keys.verify(&token).ok_or(Error::InvalidToken {
        message: "Invalid token".to_string(),
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Authorization stage. Fails closed: without an `Identity` in the request
/// extensions the authentication stage never ran, and the request is
/// rejected rather than waved through.
pub async fn authorize(
    required: Role,
    req: Request<Body>,
    next: Next<Body>,
) -> Result<Response, Error> {
    match req.extensions().get::<Identity>() {
        Some(identity) if identity.role == required => Ok(next.run(req).await),
        Some(_) => Err(Error::ForbiddenRole {
            message: "Access denied".to_string(),
        }),
        None => Err(Error::Unauthenticated {
            message: "Access denied".to_string(),
        }),
    }
}

pub async fn require_professor(req: Request<Body>, next: Next<Body>) -> Result<Response, Error> {
    authorize(Role::Professor, req, next).await
}

pub async fn require_student(req: Request<Body>, next: Next<Body>) -> Result<Response, Error> {
    authorize(Role::Student, req, next).await
}
