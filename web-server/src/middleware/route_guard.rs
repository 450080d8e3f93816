// web-server/src/middleware/route_guard.rs
use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpResponse};
use common::session::SessionClaims;
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::session_store::load_session;

// Page sections requiring a valid session
const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/api-keys"];
// Auth pages that a logged-in user is bounced away from
const AUTH_ONLY_PATHS: &[&str] = &["/login", "/register"];
// Legacy flat channel paths, canonicalized to /dashboard/{userId}/channels/...
const LEGACY_CHANNEL_PREFIX: &str = "/channels";

/// Outcome of the guard policy for one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    ToLogin,
    ToDashboard(String),
    ToCanonical(String),
}

fn matches_section(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// The guard policy, kept pure so it can be tested without HTTP plumbing.
///
/// API and websocket routes are exempt: they answer 401 themselves instead
/// of redirecting. A session whose payload lacks a user id counts as
/// present but is never used as a redirect target, so a corrupt cookie
/// falls through to re-authentication instead of redirect-looping.
pub fn decide(path: &str, session: Option<&SessionClaims>) -> GuardDecision {
    if path.starts_with("/api/") || path.starts_with("/ws/") || path.starts_with("/assets/") {
        return GuardDecision::Allow;
    }

    let user_id = session
        .map(|s| s.user.id.as_str())
        .filter(|id| !id.is_empty());

    if AUTH_ONLY_PATHS.iter().any(|p| matches_section(path, p)) {
        return match user_id {
            Some(id) => GuardDecision::ToDashboard(format!("/dashboard/{}", id)),
            None => GuardDecision::Allow,
        };
    }

    if matches_section(path, LEGACY_CHANNEL_PREFIX) {
        return match user_id {
            Some(id) => GuardDecision::ToCanonical(format!("/dashboard/{}{}", id, path)),
            None => GuardDecision::ToLogin,
        };
    }

    if PROTECTED_PREFIXES.iter().any(|p| matches_section(path, p)) {
        return match session {
            Some(_) => GuardDecision::Allow,
            None => GuardDecision::ToLogin,
        };
    }

    GuardDecision::Allow
}

/// Request-time route gate: redirects unauthenticated requests away from
/// protected pages and authenticated ones away from the auth pages.
#[derive(Clone)]
pub struct RouteGuard {
    secret: Rc<Vec<u8>>,
}

impl RouteGuard {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::new(secret.as_bytes().to_vec()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RouteGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RouteGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteGuardMiddleware {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct RouteGuardMiddleware<S> {
    service: S,
    secret: Rc<Vec<u8>>,
}

impl<S, B> Service<ServiceRequest> for RouteGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = load_session(req.request(), &self.secret);
        let decision = decide(req.path(), session.as_ref());

        let target = match decision {
            GuardDecision::Allow => {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) });
            }
            GuardDecision::ToLogin => "/login".to_string(),
            GuardDecision::ToDashboard(path) | GuardDecision::ToCanonical(path) => path,
        };

        tracing::debug!("Route guard redirecting {} -> {}", req.path(), target);

        Box::pin(async move {
            let (req, _) = req.into_parts();
            let resp = HttpResponse::Found()
                .insert_header((header::LOCATION, target))
                .finish()
                .map_into_right_body();
            Ok(ServiceResponse::new(req, resp))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Role, User};
    use common::session::SESSION_TTL_SECONDS;

    fn claims(user_id: &str) -> SessionClaims {
        SessionClaims {
            token: "backend-token".to_string(),
            user: User {
                id: user_id.to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: Role::User,
                api_key: None,
            },
            iat: 0,
            exp: SESSION_TTL_SECONDS,
        }
    }

    #[test]
    fn protected_paths_require_session() {
        assert_eq!(decide("/dashboard", None), GuardDecision::ToLogin);
        assert_eq!(decide("/dashboard/u1/channels/ch1", None), GuardDecision::ToLogin);
        assert_eq!(decide("/api-keys", None), GuardDecision::ToLogin);

        let session = claims("u1");
        assert_eq!(decide("/dashboard/u1", Some(&session)), GuardDecision::Allow);
        assert_eq!(decide("/api-keys", Some(&session)), GuardDecision::Allow);
    }

    #[test]
    fn auth_pages_bounce_logged_in_users() {
        assert_eq!(decide("/login", None), GuardDecision::Allow);
        assert_eq!(decide("/register", None), GuardDecision::Allow);

        let session = claims("u1");
        assert_eq!(
            decide("/login", Some(&session)),
            GuardDecision::ToDashboard("/dashboard/u1".to_string())
        );
        assert_eq!(
            decide("/register", Some(&session)),
            GuardDecision::ToDashboard("/dashboard/u1".to_string())
        );
    }

    #[test]
    fn legacy_channel_paths_are_canonicalized() {
        let session = claims("u1");
        assert_eq!(
            decide("/channels/ch1", Some(&session)),
            GuardDecision::ToCanonical("/dashboard/u1/channels/ch1".to_string())
        );
        assert_eq!(decide("/channels/ch1", None), GuardDecision::ToLogin);
    }

    #[test]
    fn corrupt_session_falls_through_on_auth_pages() {
        // Session present but no user id: never used as a redirect target
        let session = claims("");
        assert_eq!(decide("/login", Some(&session)), GuardDecision::Allow);
        assert_eq!(decide("/channels/ch1", Some(&session)), GuardDecision::ToLogin);
        // Protected paths still honor presence
        assert_eq!(decide("/dashboard/u1", Some(&session)), GuardDecision::Allow);
    }

    #[test]
    fn public_and_exempt_paths_always_allowed() {
        assert_eq!(decide("/", None), GuardDecision::Allow);
        assert_eq!(decide("/pricing", None), GuardDecision::Allow);
        assert_eq!(decide("/api/auth/me", None), GuardDecision::Allow);
        assert_eq!(decide("/ws/live/ch1", None), GuardDecision::Allow);
        assert_eq!(decide("/assets/app.js", None), GuardDecision::Allow);

        let session = claims("u1");
        assert_eq!(decide("/pricing", Some(&session)), GuardDecision::Allow);
    }

    #[test]
    fn prefix_matching_respects_segments() {
        // "/dashboarding" is not the dashboard section
        assert_eq!(decide("/dashboarding", None), GuardDecision::Allow);
        assert_eq!(decide("/channelsx", None), GuardDecision::Allow);
    }
}
