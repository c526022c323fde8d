//! Stateless HS256 bearer tokens.
//!
//! Nothing is stored server-side, so an issued token cannot be revoked: a leaked
//! token stays valid until its `exp`. Keep the TTL short.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::errors::AuthError;

/// Minimum HMAC key length in bytes.
const MIN_KEY_BYTES: usize = 32;

pub const MAX_SESSION_TTL_SECS: u64 = configs::MAX_ACCESS_TTL_SECS;

/// HMAC key material derived from the configured secret.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Base64-decoded secret when it parses, raw bytes otherwise. Anything
    /// shorter than 32 bytes is stretched through SHA-256.
    pub fn from_secret(secret: &str) -> Self {
        let raw = STANDARD.decode(secret.trim()).unwrap_or_else(|_| secret.as_bytes().to_vec());
        if raw.len() < MIN_KEY_BYTES {
            Self(Sha256::digest(&raw).to_vec())
        } else {
            Self(raw)
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionTokenIssuer {
    /// Fails when `ttl_secs` is zero or past [`MAX_SESSION_TTL_SECS`].
    pub fn new(key: &SigningKey, ttl_secs: u64) -> Result<Self, AuthError> {
        let ttl = Some(ttl_secs)
            .filter(|s| (1..=MAX_SESSION_TTL_SECS).contains(s))
            .and_then(|s| i64::try_from(s).ok())
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::Validation(format!("session ttl must be in 1..={MAX_SESSION_TTL_SECS} seconds")))?;
        Ok(Self { encoding: EncodingKey::from_secret(&key.0), decoding: DecodingKey::from_secret(&key.0), ttl })
    }

    pub fn issue(&self, account_id: Uuid, username: &str) -> Result<String, AuthError> {
        self.issue_at(account_id, username, Utc::now())
    }

    pub fn issue_at(&self, account_id: Uuid, username: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: account_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Account id carried by a valid token. Bad signature, bad shape and
    /// expiry all come back as the same `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(err = %e, "session token rejected");
            AuthError::InvalidToken
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> SessionTokenIssuer {
        SessionTokenIssuer::new(&SigningKey::from_secret(secret), 3600).unwrap()
    }

    #[test]
    fn short_secrets_are_stretched() {
        assert_eq!(SigningKey::from_secret("dev").0.len(), 32);
        // "c2hvcnQ=" is base64 for "short"
        assert_eq!(SigningKey::from_secret("c2hvcnQ=").0.len(), 32);
        let long = STANDARD.encode([7u8; 48]);
        assert_eq!(SigningKey::from_secret(&long).0.len(), 48);
        let raw = "x".repeat(40) + "!";
        assert_eq!(SigningKey::from_secret(&raw).0.len(), 41);
        assert!(!format!("{:?}", SigningKey::from_secret("dev")).contains("dev"));
    }

    #[test]
    fn issued_token_verifies_to_account() {
        let iss = issuer("a-signing-secret");
        let id = Uuid::new_v4();
        let token = iss.issue(id, "alice").unwrap();
        assert_eq!(iss.verify(&token).unwrap(), id);
    }

    #[test]
    fn claims_carry_username_and_ttl() {
        let iss = issuer("a-signing-secret");
        let now = Utc::now();
        let token = iss.issue_at(Uuid::new_v4(), "alice", now).unwrap();
        let mut v = Validation::new(Algorithm::HS256);
        v.insecure_disable_signature_validation();
        let data = decode::<SessionClaims>(&token, &DecodingKey::from_secret(b"ignored"), &v).unwrap();
        assert_eq!(data.claims.username, "alice");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn out_of_range_ttl_is_rejected() {
        let key = SigningKey::from_secret("a-signing-secret");
        for ttl in [0, MAX_SESSION_TTL_SECS + 1, i64::MAX as u64 / 1000 + 1, u64::MAX] {
            assert!(matches!(SessionTokenIssuer::new(&key, ttl), Err(AuthError::Validation(_))), "ttl {ttl}");
        }
        let iss = SessionTokenIssuer::new(&key, MAX_SESSION_TTL_SECS).unwrap();
        let id = Uuid::new_v4();
        assert_eq!(iss.verify(&iss.issue(id, "alice").unwrap()).unwrap(), id);
    }

    #[test]
    fn every_failure_is_invalid_token() {
        let iss = issuer("a-signing-secret");
        let other = issuer("another-secret");
        let id = Uuid::new_v4();

        let foreign = other.issue(id, "alice").unwrap();
        assert!(matches!(iss.verify(&foreign), Err(AuthError::InvalidToken)));

        assert!(matches!(iss.verify("not.a.jwt"), Err(AuthError::InvalidToken)));
        assert!(matches!(iss.verify(""), Err(AuthError::InvalidToken)));

        let stale = iss.issue_at(id, "alice", Utc::now() - Duration::hours(2)).unwrap();
        assert!(matches!(iss.verify(&stale), Err(AuthError::InvalidToken)));
    }
}
