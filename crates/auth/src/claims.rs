use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use remitdesk_core::{OrganisationId, RoleId, UserId};

use crate::principal::AccountStatus;

/// Identity claims embedded in a bearer token.
///
/// This is the full set of claims Remitdesk expects once a token has been
/// decoded and its signature verified. Permissions are deliberately **not**
/// in the token: they are resolved from storage on every request, so a role
/// edit takes effect without re-issuing credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    pub email: String,

    /// Role the permission set is resolved from.
    pub role_id: RoleId,

    pub organisation_id: OrganisationId,

    pub status: AccountStatus,

    /// Issued-at (seconds since epoch).
    pub iat: i64,

    /// Expiry (seconds since epoch), validated by the verifier.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    /// Signature mismatch, malformed payload, wrong algorithm - anything
    /// that is not a clean decode. Collapsed on purpose: the caller only
    /// learns "unauthenticated", never which check failed.
    #[error("invalid token")]
    Invalid,
}

/// Verifies an opaque bearer token into [`Claims`].
///
/// Fails closed: every failure mode is a [`TokenError`], there is no
/// partially-trusted result.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS256 verifier/issuer over a shared secret.
pub struct Hs256TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl: Duration::hours(8),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Issue a signed token for an authenticated user.
    pub fn issue(
        &self,
        sub: UserId,
        email: impl Into<String>,
        role_id: RoleId,
        organisation_id: OrganisationId,
        status: AccountStatus,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            email: email.into(),
            role_id,
            organisation_id,
            status,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Invalid)
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
