use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of verification and password reset tokens.
pub const TOKEN_TTL_HOURS: i64 = 2;

/// Random bytes behind every opaque token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Registration input
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Resend-verification input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendVerificationInput {
    pub email: String,
}

/// Email verification input
#[derive(Clone, Serialize, Deserialize)]
pub struct VerifyEmailInput {
    pub token: String,
}

/// Login input; `login` is either the email or the username.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

/// Forgot-password input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordInput {
    pub email: String,
}

/// Password reset confirmation input
#[derive(Clone, Serialize, Deserialize)]
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for VerifyEmailInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyEmailInput").field("token", &"<redacted>").finish()
    }
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for ResetPasswordInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordInput")
            .field("token", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

/// Email verification state of an account. `Verified` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationState {
    Unverified,
    Verified,
}

/// Account record. Fields are private; the only transitions are
/// [`Account::verified`] and [`Account::with_password_hash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    /// A freshly registered, unverified account.
    pub fn register(email: String, username: String, password_hash: String, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4(), email, username, password_hash, email_verified: false, created_at: now }
    }

    /// Rebuild an account loaded from storage.
    pub fn from_parts(
        id: Uuid,
        email: String,
        username: String,
        password_hash: String,
        email_verified: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id, email, username, password_hash, email_verified, created_at }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn email(&self) -> &str { &self.email }
    pub fn username(&self) -> &str { &self.username }
    pub fn password_hash(&self) -> &str { &self.password_hash }
    pub fn is_email_verified(&self) -> bool { self.email_verified }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn state(&self) -> VerificationState {
        if self.email_verified { VerificationState::Verified } else { VerificationState::Unverified }
    }

    /// Unverified → Verified. Idempotent on an already verified account.
    pub fn verified(self) -> Self {
        Self { email_verified: true, ..self }
    }

    pub fn with_password_hash(self, password_hash: String) -> Self {
        Self { password_hash, ..self }
    }
}

/// What a single-use token may be exchanged for. Each purpose lives in its own
/// storage partition, so a token minted for one purpose never resolves for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, expiring, single-use token bound to one account.
#[derive(Clone, PartialEq, Eq)]
pub struct SingleUseToken {
    id: Uuid,
    token: String,
    account_id: Uuid,
    purpose: TokenPurpose,
    expires_at: DateTime<Utc>,
    used: bool,
}

impl SingleUseToken {
    /// Mint a new token from the OS random generator, expiring `TOKEN_TTL_HOURS` after `now`.
    pub fn mint(purpose: TokenPurpose, account_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            id: Uuid::new_v4(),
            token: URL_SAFE_NO_PAD.encode(bytes),
            account_id,
            purpose,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
            used: false,
        }
    }

    pub fn from_parts(
        id: Uuid,
        token: String,
        account_id: Uuid,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
        used: bool,
    ) -> Self {
        Self { id, token, account_id, purpose, expires_at, used }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn token(&self) -> &str { &self.token }
    pub fn account_id(&self) -> Uuid { self.account_id }
    pub fn purpose(&self) -> TokenPurpose { self.purpose }
    pub fn expires_at(&self) -> DateTime<Utc> { self.expires_at }
    pub fn is_used(&self) -> bool { self.used }

    /// Unused and `expires_at` strictly after `now`.
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }

    pub fn mark_used(self) -> Self {
        Self { used: true, ..self }
    }
}

impl fmt::Debug for SingleUseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleUseToken")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("purpose", &self.purpose)
            .field("expires_at", &self.expires_at)
            .field("used", &self.used)
            .finish()
    }
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub account_id: Uuid,
    pub username: String,
    pub access_token: String,
}
