//! Signed, time-bounded tokens.
//!
//! Tokens are HS256 JWTs over [`TokenClaims`], keyed by the server's
//! `TOKEN_SECRET`. Three purposes share the format:
//! - `access`: bearer token returned by login
//! - `verify_email`: emailed after registration, carries a single-use nonce
//! - `password_reset`: emailed on request, carries a single-use nonce
//!
//! Signature, expiry and purpose are checked here. Nonce consumption is the
//! store's job (`UnitOfWork::consume_security_token`).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// What a token authorizes. A token issued for one purpose is rejected for any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    VerifyEmail,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::VerifyEmail => "verify_email",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Payload carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: Uuid,
    pub purpose: TokenPurpose,
    /// Expiry as a unix timestamp (seconds)
    pub exp: i64,
    /// Present on single-use tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Uuid>,
}

/// Issues and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Issue a bearer token for `user_id` valid for `ttl`.
    pub fn issue_access(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        self.sign(&TokenClaims {
            sub: user_id,
            purpose: TokenPurpose::Access,
            exp: (Utc::now() + ttl).timestamp(),
            nonce: None,
        })
    }

    /// Issue a single-use token. The caller must persist `nonce` with the same expiry.
    pub fn issue_single_use(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        nonce: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        self.sign(&TokenClaims {
            sub: user_id,
            purpose,
            exp: expires_at.timestamp(),
            nonce: Some(nonce),
        })
    }

    pub fn sign(&self, claims: &TokenClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    /// Check signature, expiry and purpose, returning the claims.
    ///
    /// # Errors
    ///
    /// `AppError::Token` for a malformed, tampered, mis-purposed or expired token.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, AppError> {
        let claims = decode::<TokenClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::token("Token has expired"),
                ErrorKind::InvalidSignature => AppError::token("Invalid token signature"),
                _ => AppError::token("Malformed token"),
            })?
            .claims;

        if claims.purpose != purpose {
            return Err(AppError::token("Token was issued for a different purpose"));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-key-that-is-at-least-32-bytes")
    }

    #[test]
    fn access_token_verifies_for_its_user() {
        let user_id = Uuid::new_v4();
        let token = signer().issue_access(user_id, Duration::minutes(5)).unwrap();

        let claims = signer().verify(&token, TokenPurpose::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.nonce, None);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = signer()
            .issue_access(Uuid::new_v4(), Duration::minutes(5))
            .unwrap();
        let (_, signature) = token.rsplit_once('.').unwrap();

        let forged_claims = TokenClaims {
            sub: Uuid::new_v4(),
            purpose: TokenPurpose::Access,
            exp: (Utc::now() + Duration::days(365)).timestamp(),
            nonce: None,
        };
        let other = TokenSigner::new("another-secret-key-also-at-least-32-bytes");
        let forged_token = other.sign(&forged_claims).unwrap();
        let (forged_body, _) = forged_token.rsplit_once('.').unwrap();
        let forged = format!("{forged_body}.{signature}");

        assert!(matches!(
            signer().verify(&forged, TokenPurpose::Access),
            Err(AppError::Token(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenSigner::new("another-secret-key-also-at-least-32-bytes");
        let token = other
            .issue_access(Uuid::new_v4(), Duration::minutes(5))
            .unwrap();

        assert!(signer().verify(&token, TokenPurpose::Access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = signer()
            .issue_access(Uuid::new_v4(), Duration::seconds(-1))
            .unwrap();

        assert!(matches!(
            signer().verify(&token, TokenPurpose::Access),
            Err(AppError::Token(msg)) if msg.contains("expired")
        ));
    }

    #[test]
    fn reset_token_cannot_be_used_as_access_token() {
        let token = signer()
            .issue_single_use(
                Uuid::new_v4(),
                TokenPurpose::PasswordReset,
                Uuid::new_v4(),
                Utc::now() + Duration::minutes(30),
            )
            .unwrap();

        assert!(signer().verify(&token, TokenPurpose::Access).is_err());
        let claims = signer()
            .verify(&token, TokenPurpose::PasswordReset)
            .unwrap();
        assert!(claims.nonce.is_some());
    }

    #[test]
    fn garbage_is_rejected() {
        for token in ["", "no-dot", "abc.zz", "a.b.c", "!!!.00.zz"] {
            assert!(signer().verify(token, TokenPurpose::Access).is_err());
        }
    }
}
