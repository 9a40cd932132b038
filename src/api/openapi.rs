//! OpenAPI document for the service.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::{auth, health};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::signup::register,
        auth::verification::verify_email,
        auth::verification::resend_otp,
        auth::login::login,
        auth::session::refresh,
        auth::session::logout,
        auth::password::forgot_password,
        auth::password::verify_otp,
        auth::password::reset_password,
        auth::me::me,
    ),
    components(schemas(
        health::Health,
        auth::types::Role,
        auth::types::OtpPurpose,
        auth::types::RegisterRequest,
        auth::types::MessageResponse,
        auth::types::VerifyEmailRequest,
        auth::types::LoginRequest,
        auth::types::SessionResponse,
        auth::types::ForgotPasswordRequest,
        auth::types::VerifyOtpRequest,
        auth::types::ResendOtpRequest,
        auth::types::ResetPasswordRequest,
        auth::types::UserProfile,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, verification, sessions, and password recovery"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/v1/auth/register",
            "/v1/auth/verify_email",
            "/v1/auth/resend_otp",
            "/v1/auth/login",
            "/v1/auth/refresh",
            "/v1/auth/logout",
            "/v1/auth/forgot_password",
            "/v1/auth/verify_otp",
            "/v1/auth/reset_password",
            "/v1/auth/me",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
