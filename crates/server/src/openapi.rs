use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::errors::ErrorBody;
use crate::routes::auth::{EmailRequest, LoginRequest, MeResponse, RegisterRequest, ResetRequest, TokenResponse};

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::verify,
        crate::routes::auth::login,
        crate::routes::auth::forgot,
        crate::routes::auth::reset_confirm,
        crate::routes::auth::reset,
        crate::routes::auth::resend_verification,
        crate::routes::auth::me,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            RegisterRequest,
            LoginRequest,
            EmailRequest,
            ResetRequest,
            TokenResponse,
            MeResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth", description = "Registration, verification, login and password reset")
    )
)]
pub struct ApiDoc;
