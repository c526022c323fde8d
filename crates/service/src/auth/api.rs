use async_trait::async_trait;

use super::domain::{
    Account, AuthSession, ForgotPasswordInput, LoginInput, RegisterInput, ResendVerificationInput,
    ResetPasswordInput, VerifyEmailInput,
};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::service::AuthService;

/// Object-safe view of [`AuthService`], so callers can hold `Arc<dyn AuthApi>`
/// without carrying the repository type around.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<(), AuthError>;
    async fn resend_verification(&self, input: ResendVerificationInput) -> Result<(), AuthError>;
    async fn verify_email(&self, input: VerifyEmailInput) -> Result<AuthSession, AuthError>;
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError>;
    async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<(), AuthError>;
    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError>;
    async fn current_account(&self, access_token: &str) -> Result<Account, AuthError>;
}

#[async_trait]
impl<R: AuthRepository + 'static> AuthApi for AuthService<R> {
    async fn register(&self, input: RegisterInput) -> Result<(), AuthError> {
        AuthService::register(self, input).await
    }

    async fn resend_verification(&self, input: ResendVerificationInput) -> Result<(), AuthError> {
        AuthService::resend_verification(self, input).await
    }

    async fn verify_email(&self, input: VerifyEmailInput) -> Result<AuthSession, AuthError> {
        AuthService::verify_email(self, input).await
    }

    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        AuthService::login(self, input).await
    }

    async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<(), AuthError> {
        AuthService::forgot_password(self, input).await
    }

    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError> {
        AuthService::reset_password(self, input).await
    }

    async fn current_account(&self, access_token: &str) -> Result<Account, AuthError> {
        AuthService::current_account(self, access_token).await
    }
}
