// web-server/src/api/auth.rs
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use common::models::User;
use common::session::encode_session;
use common::Config;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendClient, BackendError};
use crate::session_store::{clear_cookie, load_session, session_cookie};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// The backend user with its identity field duplicated under the
/// client-friendly `id` alias.
pub fn normalized_user(user: &User) -> serde_json::Value {
    let mut value = serde_json::to_value(user).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("id".to_string(), json!(user.id));
    }
    value
}

fn forward_status(status: u16, message: String) -> HttpResponse {
    HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
        .json(json!({ "error": message }))
}

// Exchange credentials for a backend token and set the session cookie
#[post("/auth/login")]
pub async fn login(
    form: web::Json<LoginForm>,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    match backend.login(&form.email, &form.password).await {
        Ok(login) => {
            let signed = match encode_session(
                &login.token,
                &login.user,
                config.session.secret.as_bytes(),
            ) {
                Ok(signed) => signed,
                Err(e) => {
                    tracing::error!("Failed to sign session: {}", e);
                    return HttpResponse::InternalServerError()
                        .json(json!({ "error": "Internal server error" }));
                }
            };

            tracing::info!("User logged in: {}", login.user.id);

            HttpResponse::Ok()
                .cookie(session_cookie(signed))
                .json(json!({
                    "user": normalized_user(&login.user),
                    "token": login.token,
                }))
        }
        Err(BackendError::Status { status, message }) => {
            tracing::info!("Login rejected by backend ({}): {}", status, message);
            forward_status(status, message)
        }
        Err(e) => {
            tracing::error!("Login failed upstream: {}", e);
            HttpResponse::BadGateway().json(json!({ "error": "Upstream unavailable" }))
        }
    }
}

// BFF bridge: resolve the httpOnly cookie's token into {user, token} for
// client-side code that cannot read the cookie itself. Never cached.
#[get("/auth/me")]
pub async fn me(
    req: HttpRequest,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match load_session(&req, config.session.secret.as_bytes()) {
        Some(claims) => claims,
        None => {
            return HttpResponse::Unauthorized()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(json!({ "error": "Not authenticated" }));
        }
    };

    match backend.me(&claims.token).await {
        Ok(user) => {
            if user.id.is_empty() {
                tracing::error!("Backend identity response missing user id");
                return HttpResponse::InternalServerError()
                    .insert_header((header::CACHE_CONTROL, "no-store"))
                    .json(json!({ "error": "Internal server error" }));
            }

            HttpResponse::Ok()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(json!({
                    "user": normalized_user(&user),
                    "token": claims.token,
                }))
        }
        Err(BackendError::Status { status, message }) => {
            // Any backend auth rejection invalidates the session
            tracing::info!("Backend rejected session token ({}): {}", status, message);
            HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .cookie(clear_cookie())
                .json(json!({ "error": message }))
        }
        Err(BackendError::Malformed(e)) => {
            tracing::error!("Backend identity response malformed: {}", e);
            HttpResponse::InternalServerError()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(json!({ "error": "Internal server error" }))
        }
        Err(e) => {
            tracing::error!("Identity lookup failed upstream: {}", e);
            HttpResponse::BadGateway()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(json!({ "error": "Upstream unavailable" }))
        }
    }
}

// Destroy the session explicitly
#[post("/auth/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok()
        .cookie(clear_cookie())
        .json(json!({ "status": "success" }))
}
