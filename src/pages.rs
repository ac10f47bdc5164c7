use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Extension;

use crate::err::Error;
use crate::gate;
use crate::token::TokenKeys;

async fn page(path: &'static str) -> Result<Html<String>, Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(html) => Ok(Html(html)),
        Err(err) => {
            log::error!("Failed to read page {}: {}", path, err);
            Err(Error::server_error("IOError"))
        }
    }
}

pub async fn index() -> Result<Html<String>, Error> {
    page("public/index.html").await
}

/// A visitor that already carries a valid session is sent straight to their
/// role's page instead of the login form.
pub async fn login_page(
    headers: HeaderMap,
    Extension(keys): Extension<TokenKeys>,
) -> Result<Response, Error> {
    if let Some(token) = gate::token_from_headers(&headers) {
        if let Some(identity) = keys.verify(&token) {
            return Ok(Redirect::to(identity.role.home_path()).into_response());
        }
    }
    Ok(page("views/login.html").await?.into_response())
}

pub async fn teacher_page() -> Result<Html<String>, Error> {
    page("protected_views/teacher.html").await
}

pub async fn student_page() -> Result<Html<String>, Error> {
    page("protected_views/student.html").await
}
