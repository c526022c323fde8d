use once_cell::sync::Lazy;
use regex::Regex;

use super::domain::{
    ForgotPasswordInput, LoginInput, RegisterInput, ResendVerificationInput, ResetPasswordInput, VerifyEmailInput,
};
use super::errors::AuthError;

pub const USERNAME_MAX_LEN: usize = 64;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"));

// ASCII letters and digits only, at least 8 long
static PASSWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{8,}$").expect("password regex compiles"));

/// Shape checks run before any storage access.
pub trait Validate {
    fn validate(&self) -> Result<(), AuthError>;
}

pub fn check_email(email: &str) -> Result<(), AuthError> {
    if email.len() > 255 || !EMAIL_RE.is_match(email) {
        return Err(AuthError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

pub fn check_username(username: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::Validation("username must not be blank".into()));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(AuthError::Validation(format!("username must be at most {USERNAME_MAX_LEN} characters")));
    }
    Ok(())
}

/// At least 8 ASCII letters/digits with one of each.
pub fn check_password(password: &str) -> Result<(), AuthError> {
    let ok = PASSWORD_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit());
    if !ok {
        return Err(AuthError::Validation(
            "password must be at least 8 letters and digits, with at least one of each".into(),
        ));
    }
    Ok(())
}

fn not_blank(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

impl Validate for RegisterInput {
    fn validate(&self) -> Result<(), AuthError> {
        check_email(&self.email)?;
        check_username(&self.username)?;
        check_password(&self.password)
    }
}

impl Validate for ResendVerificationInput {
    fn validate(&self) -> Result<(), AuthError> {
        check_email(&self.email)
    }
}

impl Validate for VerifyEmailInput {
    fn validate(&self) -> Result<(), AuthError> {
        not_blank(&self.token, "token")
    }
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), AuthError> {
        not_blank(&self.login, "login")?;
        not_blank(&self.password, "password")
    }
}

impl Validate for ForgotPasswordInput {
    fn validate(&self) -> Result<(), AuthError> {
        check_email(&self.email)
    }
}

impl Validate for ResetPasswordInput {
    fn validate(&self) -> Result<(), AuthError> {
        not_blank(&self.token, "token")?;
        check_password(&self.new_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(check_email("a@x.com").is_ok());
        assert!(check_email("first.last+tag@sub.example.org").is_ok());
        for bad in ["", "a", "a@", "@x.com", "a@x", "a b@x.com", "a@@x.com"] {
            assert!(check_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn passwords() {
        assert!(check_password("Passw0rd").is_ok());
        assert!(check_password("12345abc").is_ok());
        for bad in ["", "short1", "abcdefgh", "12345678", "Passw0rd!", "pass word1"] {
            assert!(check_password(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn usernames() {
        assert!(check_username("alice").is_ok());
        assert!(check_username("   ").is_err());
        assert!(check_username(&"u".repeat(64)).is_ok());
        assert!(check_username(&"u".repeat(65)).is_err());
    }

    #[test]
    fn login_requires_both_fields() {
        let input = LoginInput { login: "alice".into(), password: " ".into() };
        assert!(matches!(input.validate(), Err(AuthError::Validation(_))));
    }
}
