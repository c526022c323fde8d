use std::sync::Arc;

use tracing::{debug, info, instrument, warn, Instrument, Span};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::domain::{
    Account, AuthSession, ForgotPasswordInput, LoginInput, RegisterInput, ResendVerificationInput,
    ResetPasswordInput, SingleUseToken, TokenPurpose, VerifyEmailInput,
};
use super::errors::{AuthError, ConflictReason};
use super::messages::{Notification, Templates};
use super::notify::Notifier;
use super::password::Passwords;
use super::repository::{AuthRepository, AuthTransaction, CredentialStore, TokenStore};
use super::session::{SessionTokenIssuer, SigningKey};
use super::validation::Validate;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub public_base_url: String,
}

impl AuthConfig {
    pub fn from_settings(s: &configs::AuthSettings) -> Self {
        Self {
            jwt_secret: s.jwt_secret.clone(),
            access_ttl_secs: s.access_ttl_secs,
            public_base_url: s.public_base_url.clone(),
        }
    }
}

/// Auth business service independent of web framework.
///
/// Every operation runs its reads and writes in a single repository
/// transaction; mail goes out only after that transaction has committed.
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    notifier: Arc<dyn Notifier>,
    passwords: Arc<Passwords>,
    issuer: SessionTokenIssuer,
    templates: Templates,
    clock: Arc<dyn Clock>,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, notifier: Arc<dyn Notifier>, cfg: AuthConfig) -> Result<Self, AuthError> {
        if cfg.jwt_secret.trim().is_empty() {
            return Err(AuthError::Validation("jwt_secret must not be empty".into()));
        }
        let key = SigningKey::from_secret(&cfg.jwt_secret);
        let issuer = SessionTokenIssuer::new(&key, cfg.access_ttl_secs)?;
        let templates = Templates::new(&cfg.public_base_url)?;
        let passwords = Passwords::default();
        passwords.warm();
        Ok(Self {
            repo,
            notifier,
            passwords: Arc::new(passwords),
            issuer,
            templates,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_passwords(mut self, passwords: Passwords) -> Self {
        passwords.warm();
        self.passwords = Arc::new(passwords);
        self
    }

    pub fn issuer(&self) -> &SessionTokenIssuer {
        &self.issuer
    }

    /// Register a new account and mail it a verification link.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::notify::mock::RecordingNotifier;
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let mail = Arc::new(RecordingNotifier::default());
    /// let cfg = AuthConfig { jwt_secret: "secret".into(), access_ttl_secs: 3600, public_base_url: "http://localhost:8080".into() };
    /// let svc = AuthService::new(repo, mail.clone(), cfg).unwrap();
    /// let input = RegisterInput { email: "a@x.com".into(), username: "alice".into(), password: "Passw0rd".into() };
    /// tokio_test::block_on(svc.register(input)).unwrap();
    /// assert!(mail.last_token_for("a@x.com").is_some());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<(), AuthError> {
        input.validate()?;
        let password_hash = self.hash_password(input.password).await?;
        let now = self.clock.now();

        let mut tx = self.repo.begin().await?;
        if tx.find_account_by_email(&input.email).await?.is_some() {
            return Err(AuthError::Conflict(ConflictReason::EmailTaken));
        }
        if tx.find_account_by_username(&input.username).await?.is_some() {
            return Err(AuthError::Conflict(ConflictReason::UsernameTaken));
        }
        let account = Account::register(input.email, input.username, password_hash, now);
        tx.save_account(&account).await?;
        let token = SingleUseToken::mint(TokenPurpose::EmailVerification, account.id(), now);
        tx.save_token(&token).await?;
        let mail = self.templates.verification(account.email(), token.token())?;
        tx.commit().await?;

        info!(account_id = %account.id(), "account_registered");
        self.deliver(mail).await
    }

    /// Replace every outstanding verification token of an unverified account with a fresh one.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn resend_verification(&self, input: ResendVerificationInput) -> Result<(), AuthError> {
        input.validate()?;
        let now = self.clock.now();

        let mut tx = self.repo.begin().await?;
        let account = tx.find_account_by_email(&input.email).await?.ok_or(AuthError::NotFound)?;
        if account.is_email_verified() {
            return Err(AuthError::Conflict(ConflictReason::AlreadyVerified));
        }
        let purged = tx.delete_tokens_for_account(TokenPurpose::EmailVerification, account.id()).await?;
        let token = SingleUseToken::mint(TokenPurpose::EmailVerification, account.id(), now);
        tx.save_token(&token).await?;
        let mail = self.templates.verification(account.email(), token.token())?;
        tx.commit().await?;

        info!(account_id = %account.id(), purged, "verification_resent");
        self.deliver(mail).await
    }

    /// Consume a verification token, mark the account verified and open a session.
    #[instrument(skip(self, input))]
    pub async fn verify_email(&self, input: VerifyEmailInput) -> Result<AuthSession, AuthError> {
        input.validate()?;
        let now = self.clock.now();

        let mut tx = self.repo.begin().await?;
        let (token, account) = Self::resolve_token(&mut tx, TokenPurpose::EmailVerification, &input.token, now).await?;
        let account = account.verified();
        tx.save_account(&account).await?;
        if !tx.consume_token(&token).await? {
            debug!(token_id = %token.id(), "verification token consumed concurrently");
            return Err(AuthError::InvalidToken);
        }
        let access_token = self.issuer.issue_at(account.id(), account.username(), now)?;
        tx.commit().await?;

        info!(account_id = %account.id(), "email_verified");
        Ok(AuthSession { account_id: account.id(), username: account.username().to_string(), access_token })
    }

    /// Authenticate by email or username.
    ///
    /// Unknown identifier and wrong password are the same `Unauthorized`;
    /// only a correct password on an unverified account gets `Forbidden`.
    #[instrument(skip(self, input), fields(login = %input.login))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        input.validate()?;
        let account = {
            let mut tx = self.repo.begin().await?;
            match tx.find_account_by_email(&input.login).await? {
                Some(a) => Some(a),
                None => tx.find_account_by_username(&input.login).await?,
            }
        };

        let Some(account) = account else {
            self.burn_password(input.password).await?;
            warn!(reason = "unknown_login", "login_rejected");
            return Err(AuthError::Unauthorized);
        };
        if !self.verify_password(input.password, account.password_hash().to_string()).await? {
            warn!(account_id = %account.id(), reason = "bad_password", "login_rejected");
            return Err(AuthError::Unauthorized);
        }
        if !account.is_email_verified() {
            warn!(account_id = %account.id(), reason = "unverified", "login_rejected");
            return Err(AuthError::Forbidden);
        }

        let access_token = self.issuer.issue_at(account.id(), account.username(), self.clock.now())?;
        info!(account_id = %account.id(), "login_succeeded");
        Ok(AuthSession { account_id: account.id(), username: account.username().to_string(), access_token })
    }

    /// Mail a reset link if the address belongs to an account. The result is
    /// the same whether or not it does. Delivery runs in a background task so
    /// both paths return at the same point; failures are only logged.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<(), AuthError> {
        input.validate()?;
        let now = self.clock.now();

        let mut tx = self.repo.begin().await?;
        let Some(account) = tx.find_account_by_email(&input.email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };
        // earlier reset tokens stay valid until used or expired
        let token = SingleUseToken::mint(TokenPurpose::PasswordReset, account.id(), now);
        tx.save_token(&token).await?;
        let mail = self.templates.password_reset(account.email(), token.token())?;
        tx.commit().await?;

        info!(account_id = %account.id(), "password_reset_requested");
        self.deliver_detached(mail);
        Ok(())
    }

    /// Consume a reset token and replace the account's password hash.
    #[instrument(skip(self, input))]
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError> {
        input.validate()?;
        let password_hash = self.hash_password(input.new_password).await?;
        let now = self.clock.now();

        let mut tx = self.repo.begin().await?;
        let (token, account) = Self::resolve_token(&mut tx, TokenPurpose::PasswordReset, &input.token, now).await?;
        if !tx.consume_token(&token).await? {
            debug!(token_id = %token.id(), "reset token consumed concurrently");
            return Err(AuthError::InvalidToken);
        }
        let account = account.with_password_hash(password_hash);
        tx.save_account(&account).await?;
        tx.commit().await?;

        info!(account_id = %account.id(), "password_reset");
        Ok(())
    }

    /// Account behind a session token. A token for an account that no longer
    /// exists is treated like any other invalid token.
    pub async fn current_account(&self, access_token: &str) -> Result<Account, AuthError> {
        let id: Uuid = self.issuer.verify(access_token)?;
        let mut tx = self.repo.begin().await?;
        tx.find_account_by_id(id).await?.ok_or(AuthError::InvalidToken)
    }

    /// Token plus owning account, if the token is consumable right now.
    async fn resolve_token(
        tx: &mut R::Tx,
        purpose: TokenPurpose,
        raw: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(SingleUseToken, Account), AuthError> {
        let token = tx
            .find_token(purpose, raw)
            .await?
            .filter(|t| t.is_consumable(now))
            .ok_or(AuthError::InvalidToken)?;
        let account = tx.find_account_by_id(token.account_id()).await?.ok_or(AuthError::InvalidToken)?;
        Ok((token, account))
    }

    async fn deliver(&self, mail: Notification) -> Result<(), AuthError> {
        self.notifier.send(&mail.to, &mail.subject, &mail.body_html).await.map_err(|e| {
            warn!(to = %mail.to, subject = %mail.subject, err = %e, "notification_failed");
            AuthError::Delivery(e.to_string())
        })
    }

    fn deliver_detached(&self, mail: Notification) {
        let notifier = self.notifier.clone();
        tokio::spawn(
            async move {
                if let Err(e) = notifier.send(&mail.to, &mail.subject, &mail.body_html).await {
                    warn!(to = %mail.to, subject = %mail.subject, err = %e, "notification_failed");
                }
            }
            .instrument(Span::current()),
        );
    }

    async fn hash_password(&self, plain: String) -> Result<String, AuthError> {
        let pw = self.passwords.clone();
        tokio::task::spawn_blocking(move || pw.hash(&plain))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    async fn verify_password(&self, plain: String, hash: String) -> Result<bool, AuthError> {
        let pw = self.passwords.clone();
        tokio::task::spawn_blocking(move || pw.verify(&plain, &hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    async fn burn_password(&self, plain: String) -> Result<(), AuthError> {
        let pw = self.passwords.clone();
        tokio::task::spawn_blocking(move || pw.burn(&plain)).await.map_err(|e| AuthError::Hash(e.to_string()))
    }
}
