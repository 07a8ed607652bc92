//! # JWT Service
//!
//! Validates access tokens issued by the external auth collaborator. Token
//! issuance, refresh rotation, and credential handling are out of scope for
//! the core (`spec.md` §1, §6); this service only verifies a bearer token's
//! signature, expiration, and blocklist status.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur while validating an access token.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
    #[error("token has been revoked")]
    Blocklisted,
}

/// JWT claims structure carried by an access token. `jti` identifies the
/// token for blocklist consultation (`spec.md` §6).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as string).
    pub sub: String,
    /// Token identifier, consulted against the blocklist on every request.
    pub jti: String,
    /// Expiration timestamp (Unix epoch).
    pub exp: u64,
    /// Issued-at timestamp (Unix epoch).
    pub iat: u64,
}

/// Service for validating access tokens issued by the auth collaborator.
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(decoding_key: DecodingKey) -> Self {
        Self { decoding_key }
    }

    /// Verifies signature and expiration only. Blocklist consultation is a
    /// separate, async step (see [`crate::middleware::auth::auth_middleware`])
    /// since it requires a queue-store round trip.
    #[instrument(skip(self, token), fields(token_length = token.len()))]
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        debug!("validating access token");

        match decode::<Claims>(token, &self.decoding_key, &Validation::default()) {
            Ok(token_data) => {
                debug!(user_id = %token_data.claims.sub, "access token signature valid");
                Ok(token_data.claims)
            }
            Err(e) if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                warn!("access token expired");
                Err(JwtError::TokenExpired)
            }
            Err(e) => {
                warn!(error = %e, "invalid access token");
                Err(JwtError::InvalidToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn service_with_secret(secret: &[u8]) -> (JwtService, EncodingKey) {
        (
            JwtService::new(DecodingKey::from_secret(secret)),
            EncodingKey::from_secret(secret),
        )
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let (service, encoding_key) = service_with_secret(b"test-secret");
        let claims = Claims {
            sub: "11111111-1111-1111-1111-111111111111".into(),
            jti: "jti-1".into(),
            exp: 9_999_999_999,
            iat: 0,
        };
        let token = encode(&Header::default(), &claims, &encoding_key).unwrap();

        let validated = service.validate_access_token(&token).unwrap();
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.jti, claims.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let (service, encoding_key) = service_with_secret(b"test-secret");
        let claims = Claims {
            sub: "11111111-1111-1111-1111-111111111111".into(),
            jti: "jti-2".into(),
            exp: 1,
            iat: 0,
        };
        let token = encode(&Header::default(), &claims, &encoding_key).unwrap();

        let err = service.validate_access_token(&token).unwrap_err();
        assert!(matches!(err, JwtError::TokenExpired));
    }

    #[test]
    fn token_signed_with_wrong_secret_is_rejected() {
        let (service, _) = service_with_secret(b"correct-secret");
        let (_, wrong_encoding_key) = service_with_secret(b"wrong-secret");
        let claims = Claims {
            sub: "11111111-1111-1111-1111-111111111111".into(),
            jti: "jti-3".into(),
            exp: 9_999_999_999,
            iat: 0,
        };
        let token = encode(&Header::default(), &claims, &wrong_encoding_key).unwrap();

        let err = service.validate_access_token(&token).unwrap_err();
        assert!(matches!(err, JwtError::InvalidToken));
    }
}
