use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use poem::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Issuer embedded in every access token this server accepts.
pub const TOKEN_ISSUER: &str = "video-upload-server-access";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingCredential,
    #[error("invalid token: {0}")]
    InvalidCredential(String),
}

/// User identity derived from a verified credential. Lives for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// HS256 access tokens signed with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidCredential("token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::InvalidCredential("invalid token issuer".to_string())
                }
                _ => AuthError::InvalidCredential(e.to_string()),
            }
        })?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AuthError::InvalidCredential("subject is not a user id".to_string()))?;
        Ok(Principal { user_id })
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use poem::http::HeaderValue;

    pub const SECRET: &str = "test-secret";

    pub fn mint(secret: &str, sub: &str, issuer: &str, ttl_secs: i64) -> String {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: issuer.to_string(),
            sub: sub.to_string(),
            iat: now,
            exp: now + ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub fn token_for(user_id: Uuid) -> String {
        mint(SECRET, &user_id.to_string(), TOKEN_ISSUER, 3600)
    }

    #[test]
    fn accepts_valid_token() {
        let user_id = Uuid::new_v4();
        let principal = JwtVerifier::new(SECRET).verify(&token_for(user_id)).unwrap();
        assert_eq!(principal.user_id, user_id);
    }

    #[test]
    fn rejects_bad_signature_expiry_issuer_and_subject() {
        let verifier = JwtVerifier::new(SECRET);
        let user = Uuid::new_v4().to_string();
        for token in [
            mint("other-secret", &user, TOKEN_ISSUER, 3600),
            mint(SECRET, &user, TOKEN_ISSUER, -120),
            mint(SECRET, &user, "someone-else", 3600),
            mint(SECRET, "not-a-uuid", TOKEN_ISSUER, 3600),
            "garbage".to_string(),
        ] {
            assert!(matches!(
                verifier.verify(&token),
                Err(AuthError::InvalidCredential(_))
            ));
        }
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingCredential)
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingCredential)
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingCredential)
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
