// web-server/src/session_store.rs
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use common::session::{decode_session, SessionClaims, SESSION_TTL_SECONDS};

/// Cookie name for the signed session
pub const SESSION_COOKIE_NAME: &str = "merke_session";

/// Build the httpOnly session cookie holding an encoded session.
///
/// The cookie expiry matches the signed token's expiry, so both lapse
/// together and a stale cookie simply decodes to "no session".
pub fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, value)
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(SESSION_TTL_SECONDS as i64))
        .finish()
}

/// Cookie that removes the session immediately (logout, invalid backend token)
pub fn clear_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .max_age(CookieDuration::seconds(0))
        .finish()
}

/// Read and verify the session from the request's cookie jar.
///
/// Absent cookie and failed decode are the same outcome: not logged in.
pub fn load_session(req: &HttpRequest, secret: &[u8]) -> Option<SessionClaims> {
    let cookie = req.cookie(SESSION_COOKIE_NAME)?;
    decode_session(cookie.value(), secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use common::models::{Role, User};
    use common::session::encode_session;

    const SECRET: &[u8] = b"test_secret";

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::User,
            api_key: None,
        }
    }

    #[test]
    fn session_cookie_is_http_only_with_matching_expiry() {
        let cookie = session_cookie("value".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(CookieDuration::seconds(SESSION_TTL_SECONDS as i64))
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn loads_valid_session_from_request() {
        let signed = encode_session("backend-token", &sample_user(), SECRET).unwrap();
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, signed))
            .to_http_request();

        let claims = load_session(&req, SECRET).expect("valid session");
        assert_eq!(claims.user.id, "u1");
        assert_eq!(claims.token, "backend-token");
    }

    #[test]
    fn missing_or_garbage_cookie_is_no_session() {
        let req = TestRequest::default().to_http_request();
        assert!(load_session(&req, SECRET).is_none());

        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "garbage"))
            .to_http_request();
        assert!(load_session(&req, SECRET).is_none());
    }
}
