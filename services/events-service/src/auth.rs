use std::{collections::HashSet, fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::models::ErrorResponse;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

type KeyDigest = [u8; 32];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Disabled,
    StaticKey,
    Token,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            AuthMode::Disabled => "disabled",
            AuthMode::StaticKey => "static_key",
            AuthMode::Token => "token",
        };
        write!(f, "{value}")
    }
}

impl std::str::FromStr for AuthMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(AuthMode::Disabled),
            "static_key" | "api_key" => Ok(AuthMode::StaticKey),
            "token" | "bearer" => Ok(AuthMode::Token),
            _ => Err(()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Rejected(&'static str),
}

pub trait Authenticator: Send + Sync {
    fn mode(&self) -> AuthMode;
    fn authenticate(&self, headers: &HeaderMap) -> AuthDecision;
}

pub fn build_authenticator(config: &AuthConfig) -> Arc<dyn Authenticator> {
    match config.mode {
        AuthMode::Disabled => Arc::new(DisabledAuth::new(&config.api_key)),
        AuthMode::StaticKey => Arc::new(StaticKeyAuth::new(&config.api_key)),
        AuthMode::Token => Arc::new(TokenAuth::new(&config.tokens)),
    }
}

/// Checks the API key but never rejects; mismatches are only logged.
pub struct DisabledAuth {
    expected: KeyDigest,
}

impl DisabledAuth {
    pub fn new(expected_key: &str) -> Self {
        Self {
            expected: digest(expected_key),
        }
    }
}

impl Authenticator for DisabledAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::Disabled
    }

    fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        let presented = api_key(headers);
        if presented.map(digest) != Some(self.expected) {
            tracing::warn!(
                key_present = presented.is_some(),
                "unauthorized access attempt allowed"
            );
        }
        AuthDecision::Allowed
    }
}

pub struct StaticKeyAuth {
    expected: KeyDigest,
}

impl StaticKeyAuth {
    pub fn new(expected_key: &str) -> Self {
        Self {
            expected: digest(expected_key),
        }
    }
}

impl Authenticator for StaticKeyAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::StaticKey
    }

    fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        match api_key(headers) {
            None => AuthDecision::Rejected("missing api key"),
            Some(key) if digest(key) == self.expected => AuthDecision::Allowed,
            Some(_) => AuthDecision::Rejected("invalid api key"),
        }
    }
}

pub struct TokenAuth {
    tokens: HashSet<KeyDigest>,
}

impl TokenAuth {
    pub fn new(tokens: &[String]) -> Self {
        if tokens.is_empty() {
            tracing::warn!("token auth enabled without API_TOKENS; every request will be rejected");
        }
        Self {
            tokens: tokens.iter().map(|token| digest(token)).collect(),
        }
    }
}

impl Authenticator for TokenAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::Token
    }

    fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        match bearer_token(headers) {
            None => AuthDecision::Rejected("missing bearer token"),
            Some(token) if self.tokens.contains(&digest(token)) => AuthDecision::Allowed,
            Some(_) => AuthDecision::Rejected("invalid bearer token"),
        }
    }
}

pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.auth.authenticate(request.headers()) {
        AuthDecision::Allowed => next.run(request).await,
        AuthDecision::Rejected(reason) => {
            tracing::warn!(
                mode = %state.auth.mode(),
                path = request.uri().path(),
                reason,
                "request rejected"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    code: "unauthorized",
                    message: reason.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn digest(value: &str) -> KeyDigest {
    Sha256::digest(value.as_bytes()).into()
}
