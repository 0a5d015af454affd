//! HTTP client for the auth backend.
//!
//! This module defines the `AuthGateway` interface the keeper is generic
//! over, plus `HttpAuthGateway`, the production implementation speaking
//! JSON over HTTPS to a bearer-token auth backend.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::session::{Session, TokenPair};

use super::GatewayError;

/// HTTP request timeout in seconds.
/// 30s allows for slow backend responses while failing fast enough that a
/// stalled check does not block the next trigger for long.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The three auth backend operations the keeper depends on.
///
/// All operations suspend on the network and are fallible. Callers must
/// not issue concurrent calls against one gateway instance; the keeper
/// serializes them by construction.
pub trait AuthGateway: Send + Sync {
    /// Look up the currently valid session, if any.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send;

    /// Exchange the current refresh token for a new credential pair.
    ///
    /// Returns `Ok(None)` when there is nothing to refresh and
    /// `Err(InvalidRefreshToken)` when the backend rejected the token -
    /// terminal for that token, never retried with the same one.
    fn refresh_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send;

    /// Install an externally supplied credential pair as current.
    ///
    /// Used only during backup restoration.
    fn set_session(
        &self,
        pair: &TokenPair,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send;
}

impl<G: AuthGateway> AuthGateway for Arc<G> {
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send {
        (**self).get_session()
    }

    fn refresh_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send {
        (**self).refresh_session()
    }

    fn set_session(
        &self,
        pair: &TokenPair,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send {
        (**self).set_session(pair)
    }
}

/// Session payload returned by the auth backend.
///
/// The backend reports expiry either as an absolute instant or as a
/// relative `expiresIn` seconds count depending on the endpoint version.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresAt")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "expiresIn")]
    expires_in: Option<i64>,
    identity: String,
}

impl SessionResponse {
    fn into_session(self) -> Result<Session, GatewayError> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at,
            (None, Some(secs)) => Utc::now() + chrono::Duration::seconds(secs),
            (None, None) => {
                return Err(GatewayError::InvalidResponse(
                    "session payload carries neither expiresAt nor expiresIn".to_string(),
                ))
            }
        };
        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            identity: self.identity,
        })
    }
}

/// Auth backend client.
///
/// Holds the current credential pair internally and rolls it forward on
/// every successful call, so the keeper never has to thread tokens back
/// into the gateway.
pub struct HttpAuthGateway {
    client: Client,
    base_url: String,
    tokens: RwLock<Option<TokenPair>>,
}

impl HttpAuthGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: RwLock::new(None),
        })
    }

    /// Seed the gateway with a credential pair, e.g. right after an
    /// interactive login performed outside the keeper.
    pub fn install_tokens(&self, pair: TokenPair) {
        let mut tokens = self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *tokens = Some(pair);
    }

    fn current_tokens(&self) -> Option<TokenPair> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn remember(&self, session: &Session) {
        self.install_tokens(session.token_pair());
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        GatewayError::from_status(status, &body)
    }

    async fn parse_session(response: reqwest::Response) -> Result<Session, GatewayError> {
        let payload: SessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        payload.into_session()
    }
}

impl AuthGateway for HttpAuthGateway {
    async fn get_session(&self) -> Result<Option<Session>, GatewayError> {
        let Some(pair) = self.current_tokens() else {
            debug!("no credential pair installed, skipping session lookup");
            return Ok(None);
        };

        let response = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(&pair.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let session = Self::parse_session(response).await?;
                self.remember(&session);
                Ok(Some(session))
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                debug!("auth backend reports no current session");
                Ok(None)
            }
            _ => Err(Self::read_error(response).await),
        }
    }

    async fn refresh_session(&self) -> Result<Option<Session>, GatewayError> {
        let Some(pair) = self.current_tokens() else {
            debug!("no credential pair installed, nothing to refresh");
            return Ok(None);
        };

        let body = serde_json::json!({ "refreshToken": pair.refresh_token });
        let response = self
            .client
            .post(self.url("/auth/token"))
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let session = Self::parse_session(response).await?;
                self.remember(&session);
                Ok(Some(session))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!("auth backend rejected the refresh token");
                Err(GatewayError::InvalidRefreshToken)
            }
            _ => Err(Self::read_error(response).await),
        }
    }

    async fn set_session(&self, pair: &TokenPair) -> Result<Option<Session>, GatewayError> {
        let body = serde_json::json!({
            "accessToken": pair.access_token,
            "refreshToken": pair.refresh_token,
        });
        let response = self
            .client
            .post(self.url("/auth/session"))
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let session = Self::parse_session(response).await?;
                self.remember(&session);
                Ok(Some(session))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!("auth backend rejected the supplied credential pair");
                Err(GatewayError::InvalidCredential)
            }
            _ => Err(Self::read_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_response_with_absolute_expiry() {
        let json = r#"{
            "accessToken": "at-1",
            "refreshToken": "rt-1",
            "expiresAt": "2026-08-06T12:00:00Z",
            "identity": "user@example.com"
        }"#;

        let payload: SessionResponse = serde_json::from_str(json).unwrap();
        let session = payload.into_session().unwrap();
        assert_eq!(session.access_token, "at-1");
        assert_eq!(session.identity, "user@example.com");
        assert_eq!(
            session.expires_at,
            "2026-08-06T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_session_response_with_relative_expiry() {
        let json = r#"{
            "accessToken": "at-1",
            "refreshToken": "rt-1",
            "expiresIn": 1800,
            "identity": "user@example.com"
        }"#;

        let payload: SessionResponse = serde_json::from_str(json).unwrap();
        let session = payload.into_session().unwrap();
        let remaining = session.seconds_until_expiry();
        assert!((1790..=1800).contains(&remaining));
    }

    #[test]
    fn test_parse_session_response_without_expiry_fails() {
        let json = r#"{
            "accessToken": "at-1",
            "refreshToken": "rt-1",
            "identity": "user@example.com"
        }"#;

        let payload: SessionResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            payload.into_session(),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = HttpAuthGateway::new("https://auth.example.org/").unwrap();
        assert_eq!(
            gateway.url("/auth/session"),
            "https://auth.example.org/auth/session"
        );
    }

    #[test]
    fn test_install_tokens_makes_pair_current() {
        let gateway = HttpAuthGateway::new("https://auth.example.org").unwrap();
        assert!(gateway.current_tokens().is_none());

        let pair = TokenPair {
            access_token: "at-1".to_string(),
            refresh_token: "rt-1".to_string(),
        };
        gateway.install_tokens(pair.clone());
        assert_eq!(gateway.current_tokens(), Some(pair));
    }
}
