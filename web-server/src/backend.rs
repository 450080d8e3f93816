// web-server/src/backend.rs
use common::models::{Channel, ChannelStats, ChannelUpdate, User};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors from the external RSensorGrid backend.
///
/// `Status` carries the upstream status and message so BFF handlers can
/// forward them verbatim; `Malformed` marks a 2xx body the gateway could
/// not interpret, surfaced as an internal error rather than upstream's.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend returned a malformed body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Error body shape used by the backend on non-OK responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Successful login/registration payload: the bearer token with the user
/// fields inlined beside it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub user: User,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Typed client for the backend REST API. Every call carries the service
/// `x-api-key`; per-user calls add the session's bearer token.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .header("x-api-key", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        into_json(resp).await
    }

    /// Resolve the identity behind a bearer token ("who am I")
    pub async fn me(&self, token: &str) -> Result<User, BackendError> {
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn channels_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<Channel>, BackendError> {
        let resp = self
            .http
            .get(self.url(&format!("/channels/user/{}", user_id)))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn stats_overview(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<ChannelStats, BackendError> {
        let resp = self
            .http
            .get(self.url(&format!("/channels/user/{}/stats/overview", user_id)))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        into_json(resp).await
    }

    /// Single channel, with its embedded history window
    pub async fn channel(&self, token: &str, channel_id: &str) -> Result<Channel, BackendError> {
        let resp = self
            .http
            .get(self.url(&format!("/channels/{}", channel_id)))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn update_channel(
        &self,
        token: &str,
        channel_id: &str,
        update: &ChannelUpdate,
    ) -> Result<Channel, BackendError> {
        let resp = self
            .http
            .put(self.url(&format!("/channels/{}", channel_id)))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;
        into_json(resp).await
    }

    /// Delete a channel and all of its data
    pub async fn delete_channel(&self, token: &str, channel_id: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .delete(self.url(&format!("/channels/{}", channel_id)))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, resp.text().await.unwrap_or_default()))
        }
    }
}

async fn into_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;

    if status.is_success() {
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(status_error(status, body))
    }
}

fn status_error(status: reqwest::StatusCode, body: String) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_login_body() {
        let json = r#"{
            "token": "jwt-from-backend",
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "user",
            "apiKey": "mk_live_123"
        }"#;

        let login: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(login.token, "jwt-from-backend");
        assert_eq!(login.user.id, "u1");
    }

    #[test]
    fn status_error_prefers_upstream_message() {
        let err = status_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"message": "Invalid credentials"}"#.to_string(),
        );
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn status_error_falls_back_to_reason_phrase() {
        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "<html>".to_string());
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
