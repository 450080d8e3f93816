// common/src/session.rs
use crate::models::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sessions live for 24 hours; a new login is required after that
pub const SESSION_TTL_SECONDS: usize = 86_400;

/// Signed session payload: the backend bearer token plus the user it
/// belongs to, with standard issued-at/expiry claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub token: String,
    pub user: User,
    pub iat: usize,
    pub exp: usize,
}

/// Sign a session as a compact HS256 token with a 1-day expiry.
pub fn encode_session(
    token: &str,
    user: &User,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize;

    let claims = SessionClaims {
        token: token.to_string(),
        user: user.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECONDS,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Verify and decode a session token.
///
/// Any failure (bad signature, expired, malformed) is `None`: callers treat
/// it as "no session", never as an error to surface.
pub fn decode_session(value: &str, secret: &[u8]) -> Option<SessionClaims> {
    let validation = Validation::new(Algorithm::HS256);

    match decode::<SessionClaims>(value, &DecodingKey::from_secret(secret), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!("Session token rejected: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};

    const SECRET: &[u8] = b"test_secret";

    fn sample_user() -> User {
        User {
            id: "64f0c2".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::User,
            api_key: Some("mk_live_123".to_string()),
        }
    }

    #[test]
    fn round_trips_before_expiry() {
        let user = sample_user();
        let signed = encode_session("backend-token", &user, SECRET).unwrap();

        let claims = decode_session(&signed, SECRET).expect("valid session");
        assert_eq!(claims.token, "backend-token");
        assert_eq!(claims.user, user);
        assert_eq!(claims.exp, claims.iat + SESSION_TTL_SECONDS);
    }

    #[test]
    fn rejects_wrong_signing_key() {
        let signed = encode_session("backend-token", &sample_user(), SECRET).unwrap();
        assert!(decode_session(&signed, b"other_secret").is_none());
    }

    #[test]
    fn rejects_tampered_token() {
        let signed = encode_session("backend-token", &sample_user(), SECRET).unwrap();

        // Flip the last character of the signature
        let mut tampered = signed.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(decode_session(&tampered, SECRET).is_none());
    }

    #[test]
    fn rejects_expired_session() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;

        // Expired two days ago, well past the default leeway
        let claims = SessionClaims {
            token: "backend-token".to_string(),
            user: sample_user(),
            iat: now - 3 * SESSION_TTL_SECONDS,
            exp: now - 2 * SESSION_TTL_SECONDS,
        };

        let signed = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(decode_session(&signed, SECRET).is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_session("not-a-token", SECRET).is_none());
        assert!(decode_session("", SECRET).is_none());
    }
}
