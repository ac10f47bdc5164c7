use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::{Identity, Role};
use crate::err::Error;

pub const TOKEN_TTL_SECS: i64 = 60 * 60;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// HS256 signing and verification keys, fixed for the process lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "TOKEN_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            );
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: identity.user_id,
            role: identity.role,
            iat: now as usize,
            exp: (now + TOKEN_TTL_SECS) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|err| {
            log::error!("Failed to sign session token: {}", err);
            Error::server_error("TokenError")
        })
    }

    /// Expired, tampered and malformed tokens are all just `None`; the
    /// distinction only reaches the log.
    pub fn verify(&self, token: &str) -> Option<Identity> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(Identity {
                user_id: data.claims.user_id,
                role: data.claims.role,
            }),
            Err(err) => {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "expired",
                    ErrorKind::InvalidSignature => "bad signature",
                    _ => "malformed",
                };
                log::debug!("Session token rejected: {}", reason);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET).unwrap()
    }

    #[test]
    fn issue_then_verify_preserves_identity() {
        let keys = keys();
        let identity = Identity {
            user_id: 7,
            role: Role::Professor,
        };
        let token = keys.issue(&identity).unwrap();
        assert_eq!(keys.verify(&token), Some(identity));
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let other = TokenKeys::new("another-secret-that-is-also-32-chars!").unwrap();
        let token = other
            .issue(&Identity {
                user_id: 1,
                role: Role::Student,
            })
            .unwrap();
        assert_eq!(keys().verify(&token), None);
    }

    #[test]
    fn rejects_token_past_its_expiry() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            role: Role::Student,
            iat: (now - 2 * TOKEN_TTL_SECS) as usize,
            exp: (now - TOKEN_TTL_SECS) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(keys().verify(&token), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(keys().verify("not-a-token"), None);
        assert_eq!(keys().verify(""), None);
    }

    #[test]
    fn refuses_short_secrets() {
        assert!(TokenKeys::new("short").is_err());
        assert!(TokenKeys::new("").is_err());
    }
}
