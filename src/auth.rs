use std::fmt;

use axum::async_trait;
use axum::body::HttpBody;
use axum::extract::{Form, FromRequest, RequestParts};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{BoxError, Extension, Json};
use pbkdf2::password_hash::{PasswordHash, PasswordVerifier};
use pbkdf2::Pbkdf2;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::err::Error;
use crate::gate;
use crate::models::CredentialRow;
use crate::token::TokenKeys;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "student" => Some(Role::Student),
            "professor" => Some(Role::Professor),
            _ => None,
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Role::Student => "/student",
            Role::Professor => "/teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Student => "student",
            Role::Professor => "professor",
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
}

// The email is looked up across both credential tables, each tagged with a
// literal role. Only the first match is considered; emails are unique within
// a table but not across tables.
const CREDENTIAL_QUERY: &str = "\
    SELECT id, email, password_hash, 'student' AS role FROM students WHERE email = $1 \
    UNION ALL \
    SELECT id, email, password_hash, 'professor' AS role FROM professors WHERE email = $1 \
    LIMIT 1";

pub async fn verify_credentials(
    pg: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<Identity>, Error> {
    let row = sqlx::query_as::<_, CredentialRow>(CREDENTIAL_QUERY)
        .bind(email)
        .fetch_optional(pg)
        .await
        .map_err(Error::from)?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    if !password_matches(&row.password_hash, password) {
        return Ok(None);
    }

    let role = match Role::from_name(&row.role) {
        Some(role) => role,
        None => {
            log::error!("Credential row {} carries unknown role `{}`", row.id, row.role);
            return Err(Error::server_error("DataError"));
        }
    };

    Ok(Some(Identity {
        user_id: row.id,
        role,
    }))
}

pub(crate) fn password_matches(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(err) => {
            // a non-PHC value in the store never matches anything
            log::warn!("Stored password hash is malformed: {}", err);
            false
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// The login form posts urlencoded; API clients send JSON. Both carry the
// same two fields, picked apart by Content-Type.
#[async_trait]
impl<B> FromRequest<B> for LoginRequest
where
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let malformed = || Error::MissingCredentials {
            message: "Email and password are required".to_string(),
        };

        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(body) = Json::<LoginRequest>::from_request(req)
                .await
                .map_err(|_| malformed())?;
            Ok(body)
        } else {
            let Form(body) = Form::<LoginRequest>::from_request(req)
                .await
                .map_err(|_| malformed())?;
            Ok(body)
        }
    }
}

pub async fn login(
    Extension(pg): Extension<PgPool>,
    Extension(keys): Extension<TokenKeys>,
    body: LoginRequest,
) -> Result<Response, Error> {
    let (email, password) = match (
        body.email.as_deref().filter(|v| !v.is_empty()),
        body.password.as_deref().filter(|v| !v.is_empty()),
    ) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(Error::MissingCredentials {
                message: "Email and password are required".to_string(),
            })
        }
    };

    let identity = match verify_credentials(&pg, email, password).await? {
        Some(identity) => identity,
        // same response for unknown email and wrong password
        None => {
            return Err(Error::InvalidCredentials {
                message: "Invalid credentials".to_string(),
            })
        }
    };

    let token = keys.issue(&identity)?;
    log::info!("User {} logged in as {}", identity.user_id, identity.role);

    Ok((
        [(header::SET_COOKIE, gate::session_cookie(&token))],
        Redirect::to(identity.role.home_path()),
    )
        .into_response())
}

pub async fn logout(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    log::info!("User {} logged out", identity.user_id);
    // the token itself stays valid until expiry; only the cookie is dropped
    (
        [(header::SET_COOKIE, gate::clear_session_cookie())],
        Redirect::to("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbkdf2::password_hash::{PasswordHasher, SaltString};
    use rand_core::OsRng;

    #[test]
    fn verifies_salted_pbkdf2_hashes() {
        let hash = Pbkdf2
            .hash_password(b"hunter2", &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string();
        assert!(password_matches(&hash, "hunter2"));
        assert!(!password_matches(&hash, "hunter3"));
    }

    #[test]
    fn plaintext_in_the_store_never_matches() {
        assert!(!password_matches("hunter2", "hunter2"));
    }

    #[test]
    fn role_names_round_trip() {
        assert_eq!(Role::from_name("student"), Some(Role::Student));
        assert_eq!(Role::from_name("professor"), Some(Role::Professor));
        assert_eq!(Role::from_name("dean"), None);
        assert_eq!(Role::Professor.to_string(), "professor");
        assert_eq!(Role::Student.home_path(), "/student");
        assert_eq!(Role::Professor.home_path(), "/teacher");
    }
}
