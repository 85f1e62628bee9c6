use std::time::Duration;

use chrono::DateTime;
use log::debug;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::GatewayError;

/// Bound on every outbound call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback token lifetime when the server does not declare an expiry.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Token + expiry state held by the [`Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    /// Unix seconds at local receipt of the token.
    pub issued_at: i64,
    /// Unix seconds past which the token is treated as invalid.
    pub expires_at: i64,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        unix_now() < self.expires_at
    }
}

/// Session state in the shape the status tooling reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl AuthStatus {
    /// Reports whether `session` is active and, if so, when it expires
    /// (RFC 3339).
    pub fn of(session: Option<&Session>) -> Self {
        match session {
            Some(session) if session.is_valid() => Self {
                authenticated: true,
                expires_at: DateTime::from_timestamp(session.expires_at, 0)
                    .map(|expiry| expiry.to_rfc3339()),
            },
            _ => Self {
                authenticated: false,
                expires_at: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires: Option<Value>,
}

/// Session-aware HTTP client for the upstream admin API.
///
/// Holds at most one [`Session`]; only [`authenticate`](Self::authenticate)
/// replaces it. Forwarding calls attach the token as a bearer credential and
/// fail fast with [`GatewayError::NotAuthenticated`] before touching the
/// network when no valid session is held.
#[derive(Debug)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    session: Option<Session>,
    token_ttl: Duration,
}

impl Gateway {
    /// # Errors
    ///
    /// Fails when the underlying HTTP client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session: None,
            token_ttl: DEFAULT_TOKEN_TTL,
        })
    }

    /// Overrides the fallback token lifetime used when the server does not
    /// declare one.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn base_address(&self) -> &Url {
        &self.base_url
    }

    /// Points future requests at a different backend. In-flight requests and
    /// the current session are unaffected.
    pub fn update_base_address(&mut self, base_url: Url) {
        self.base_url = base_url;
    }

    /// True only if a token is present and its expiry has not elapsed.
    /// Pure time check: no network, no side effects.
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_valid)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn auth_status(&self) -> AuthStatus {
        AuthStatus::of(self.session())
    }

    /// Adopts a previously persisted session, replacing any current one.
    /// Validity is still checked at every dispatch, so restoring an expired
    /// session is harmless.
    pub fn restore_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Drops the current session. Forwarding calls fail with
    /// [`GatewayError::NotAuthenticated`] until a fresh authenticate.
    pub fn logout(&mut self) {
        self.session = None;
    }

    /// Trades credentials for a session at `POST /tokens`.
    ///
    /// The expiry is the server-declared one when present and parseable,
    /// else `now + token_ttl`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Auth`] for every failure mode (rejected credentials,
    /// transport failure, malformed response), with the detail in the cause.
    /// Any previously held session is cleared first, so a failed
    /// re-authentication never leaves a stale token behind.
    pub async fn authenticate(
        &mut self,
        identity: &str,
        secret: &str,
    ) -> Result<(), GatewayError> {
        debug!("POST /tokens for {identity}");

        let outcome = self
            .http
            .post(self.endpoint("/tokens"))
            .json(&TokenRequest { identity, secret })
            .send()
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.session = None;
                return Err(GatewayError::Auth {
                    cause: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            self.session = None;
            return Err(GatewayError::Auth {
                cause: format!(
                    "token request failed with status {status}: {message}",
                    message = upstream_message(status.as_u16(), &body)
                ),
            });
        }

        let token_response: TokenResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                self.session = None;
                return Err(GatewayError::Auth {
                    cause: format!("failed to parse token response: {e}"),
                });
            }
        };

        let issued_at = unix_now();
        let expires_at = token_response
            .expires
            .as_ref()
            .and_then(declared_expiry)
            .unwrap_or(issued_at + self.token_ttl.as_secs() as i64);

        self.session = Some(Session {
            token: token_response.token,
            issued_at,
            expires_at,
        });

        Ok(())
    }

    /// Sends one authenticated call to `base address + path`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotAuthenticated`] before any network attempt when
    ///   no valid session is held.
    /// - [`GatewayError::Upstream`] for any non-success status, with the
    ///   message extracted from the error body when present. A 401 is
    ///   surfaced as-is, never retried: the server's rejection is
    ///   authoritative even while the local expiry still reads valid.
    /// - [`GatewayError::Network`] for transport failures and timeouts.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value, GatewayError> {
        let token = match &self.session {
            Some(session) if session.is_valid() => session.token.clone(),
            _ => return Err(GatewayError::NotAuthenticated),
        };

        debug!("{method} {path}");

        let mut request = self
            .http
            .request(method.clone(), self.endpoint(path))
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("{status} {method} {path}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: upstream_message(status.as_u16(), &body),
            });
        }

        let text = response.text().await?;
        Ok(parse_body(&text))
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        self.request(Method::GET, path, None, query).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, GatewayError> {
        self.request(Method::POST, path, body, &[]).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, GatewayError> {
        self.request(Method::PUT, path, body, &[]).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete(&self, path: &str) -> Result<Value, GatewayError> {
        self.request(Method::DELETE, path, None, &[]).await
    }

    // Plain concatenation rather than Url::join: a base address with a path
    // component ("http://host:81/api") must keep it for every endpoint.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

/// Expiry declared by the token endpoint: RFC 3339 in current upstream
/// versions, unix seconds in older ones. Anything unparseable is ignored in
/// favor of the TTL fallback.
fn declared_expiry(value: &Value) -> Option<i64> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.timestamp()),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Pulls a human-readable message out of an upstream error body, falling
/// back to the raw body and finally to a generic line.
fn upstream_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(String::from)
    });

    if let Some(message) = from_json {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

/// Upstream bodies are opaque JSON passed through verbatim. Empty bodies
/// become null; non-JSON bodies pass through as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
