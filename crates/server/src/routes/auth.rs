use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Redirect, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use service::auth::domain::{
    Account, ForgotPasswordInput, LoginInput, RegisterInput, ResendVerificationInput, ResetPasswordInput,
    VerifyEmailInput,
};
use service::auth::{AuthApi, AuthError};

use crate::errors::{ApiError, ErrorBody};

/// Where the browser is sent after following a mailed link.
#[derive(Debug, Clone)]
pub struct Redirects {
    pub verify: Url,
    pub reset: Url,
}

impl Redirects {
    pub fn from_settings(s: &configs::AuthSettings) -> anyhow::Result<Self> {
        Ok(Self { verify: Url::parse(&s.verify_redirect)?, reset: Url::parse(&s.reset_redirect)? })
    }

    fn with_param(base: &Url, key: &str, value: &str) -> String {
        let mut url = base.clone();
        url.query_pairs_mut().append_pair(key, value);
        url.into()
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<dyn AuthApi>,
    pub redirects: Arc<Redirects>,
}

/// Authenticated principal, placed in request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email or username
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for MeResponse {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id(),
            email: a.email().to_string(),
            username: a.username().to_string(),
            email_verified: a.is_email_verified(),
            created_at: a.created_at(),
        }
    }
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = RegisterRequest,
    responses((status = 204, description = "Registered; verification mail sent"),
              (status = 400, description = "Bad Request", body = ErrorBody),
              (status = 409, description = "Email or username taken", body = ErrorBody)))]
pub async fn register(State(state): State<ServerState>, Json(req): Json<RegisterRequest>) -> Result<StatusCode, ApiError> {
    state
        .auth
        .register(RegisterInput { email: req.email, username: req.username, password: req.password })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/verify", tag = "auth", params(TokenQuery),
    responses((status = 303, description = "Verified; redirect carries accessToken"),
              (status = 400, description = "Invalid or expired token", body = ErrorBody)))]
pub async fn verify(State(state): State<ServerState>, Query(q): Query<TokenQuery>) -> Result<Redirect, ApiError> {
    let session = state.auth.verify_email(VerifyEmailInput { token: q.token }).await?;
    let target = Redirects::with_param(&state.redirects.verify, "accessToken", &session.access_token);
    Ok(Redirect::to(&target))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = LoginRequest,
    responses((status = 200, description = "Logged in", body = TokenResponse),
              (status = 401, description = "Invalid credentials", body = ErrorBody),
              (status = 403, description = "Email not verified", body = ErrorBody)))]
pub async fn login(State(state): State<ServerState>, Json(req): Json<LoginRequest>) -> Result<Json<TokenResponse>, ApiError> {
    let session = state.auth.login(LoginInput { login: req.login, password: req.password }).await?;
    Ok(Json(TokenResponse { access_token: session.access_token }))
}

#[utoipa::path(post, path = "/auth/forgot", tag = "auth", request_body = EmailRequest,
    responses((status = 204, description = "Accepted, whether or not the address is known")))]
pub async fn forgot(State(state): State<ServerState>, Json(req): Json<EmailRequest>) -> Result<StatusCode, ApiError> {
    state.auth.forgot_password(ForgotPasswordInput { email: req.email }).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bounce the mailed reset link into the app. Nothing is consumed here.
#[utoipa::path(get, path = "/auth/reset/confirm", tag = "auth", params(TokenQuery),
    responses((status = 303, description = "Redirect into the app carrying the token")))]
pub async fn reset_confirm(State(state): State<ServerState>, Query(q): Query<TokenQuery>) -> Redirect {
    Redirect::to(&Redirects::with_param(&state.redirects.reset, "token", &q.token))
}

#[utoipa::path(post, path = "/auth/reset", tag = "auth", request_body = ResetRequest,
    responses((status = 204, description = "Password replaced"),
              (status = 400, description = "Invalid or expired token", body = ErrorBody)))]
pub async fn reset(State(state): State<ServerState>, Json(req): Json<ResetRequest>) -> Result<StatusCode, ApiError> {
    state
        .auth
        .reset_password(ResetPasswordInput { token: req.token, new_password: req.new_password })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/auth/resend-verification", tag = "auth", request_body = EmailRequest,
    responses((status = 204, description = "Fresh verification mail sent"),
              (status = 404, description = "No such account", body = ErrorBody),
              (status = 409, description = "Already verified", body = ErrorBody)))]
pub async fn resend_verification(State(state): State<ServerState>, Json(req): Json<EmailRequest>) -> Result<StatusCode, ApiError> {
    state.auth.resend_verification(ResendVerificationInput { email: req.email }).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", security(("bearer" = [])),
    responses((status = 200, description = "Current account", body = MeResponse),
              (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)))]
pub async fn me(Extension(CurrentAccount(account)): Extension<CurrentAccount>) -> Json<MeResponse> {
    Json(MeResponse::from(&account))
}

/// Resolve `Authorization: Bearer <token>` into a [`CurrentAccount`].
pub async fn require_session(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    let Some(token) = token else {
        tracing::warn!(path = %req.uri().path(), "missing or malformed Authorization header");
        return Err(ApiError::unauthorized("missing bearer token"));
    };

    match state.auth.current_account(&token).await {
        Ok(account) => {
            req.extensions_mut().insert(CurrentAccount(account));
            Ok(next.run(req).await)
        }
        Err(AuthError::InvalidToken) => Err(ApiError::invalid_bearer()),
        Err(e) => Err(e.into()),
    }
}
