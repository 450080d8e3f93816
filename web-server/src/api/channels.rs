// web-server/src/api/channels.rs
//
// Session-guarded proxies for the backend channel API. Each handler reads
// the session cookie (the server-side auth context) and forwards the
// backend bearer token; client code never sees the service API key.
use actix_web::http::StatusCode;
use actix_web::{delete, get, put, web, HttpRequest, HttpResponse, Responder};
use common::models::{Channel, ChannelUpdate};
use common::session::SessionClaims;
use common::Config;
use serde_json::json;

use crate::backend::{BackendClient, BackendError};
use crate::session_store::load_session;

fn require_session(req: &HttpRequest, config: &Config) -> Result<SessionClaims, HttpResponse> {
    match load_session(req, config.session.secret.as_bytes()) {
        Some(claims) if !claims.user.id.is_empty() => Ok(claims),
        _ => Err(HttpResponse::Unauthorized().json(json!({ "error": "Not authenticated" }))),
    }
}

fn forward_error(err: BackendError) -> HttpResponse {
    match err {
        BackendError::Status { status, message } => {
            HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
                .json(json!({ "error": message }))
        }
        e => {
            tracing::error!("Backend call failed: {}", e);
            HttpResponse::BadGateway().json(json!({ "error": "Upstream unavailable" }))
        }
    }
}

#[get("/channels")]
pub async fn list_channels(
    req: HttpRequest,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match require_session(&req, &config) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    match backend
        .channels_for_user(&claims.token, &claims.user.id)
        .await
    {
        Ok(channels) => HttpResponse::Ok().json(channels),
        Err(e) => forward_error(e),
    }
}

#[get("/channels/stats/overview")]
pub async fn stats_overview(
    req: HttpRequest,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match require_session(&req, &config) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    match backend.stats_overview(&claims.token, &claims.user.id).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => forward_error(e),
    }
}

#[get("/channels/{channel_id}")]
pub async fn get_channel(
    req: HttpRequest,
    path: web::Path<(String,)>,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match require_session(&req, &config) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    match backend.channel(&claims.token, &path.0).await {
        Ok(channel) => HttpResponse::Ok().json(channel),
        Err(e) => forward_error(e),
    }
}

#[put("/channels/{channel_id}")]
pub async fn update_channel(
    req: HttpRequest,
    path: web::Path<(String,)>,
    update: web::Json<ChannelUpdate>,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match require_session(&req, &config) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    // Field names form the key set of every history entry; duplicates
    // would make the data mapping ambiguous.
    if let Some(fields) = update.fields.as_deref() {
        if !Channel::has_unique_field_names(fields) {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Field names must be unique" }));
        }
    }

    match backend
        .update_channel(&claims.token, &path.0, &update)
        .await
    {
        Ok(channel) => HttpResponse::Ok().json(channel),
        Err(e) => forward_error(e),
    }
}

#[delete("/channels/{channel_id}")]
pub async fn delete_channel(
    req: HttpRequest,
    path: web::Path<(String,)>,
    backend: web::Data<BackendClient>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match require_session(&req, &config) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    match backend.delete_channel(&claims.token, &path.0).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "success" })),
        Err(e) => forward_error(e),
    }
}
