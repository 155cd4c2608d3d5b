use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// PKCE code challenge method. Plain challenges are never used.
pub const PKCE_METHOD: &str = "S256";

/// Verifier and derived challenge for one authorization attempt.
#[derive(Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn method(&self) -> &'static str {
        PKCE_METHOD
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"***")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Anti-CSRF value round-tripped through the authorization redirect.
///
/// The value is a secret for the lifetime of one attempt: `Debug` is
/// redacted and comparison runs in constant time.
#[derive(Clone)]
pub struct StateToken(String);

impl StateToken {
    /// Wraps an already generated value; see [`crate::utils::generate_state`].
    pub fn new(value: String) -> Self {
        StateToken(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, returned: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), returned.as_bytes())
    }
}

impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateToken(***)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// Everything that goes into the authorization URL.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
    pub state: StateToken,
}

impl AuthorizationRequest {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: &[String],
        pkce: &PkceChallenge,
        state: &StateToken,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: scopes.to_vec(),
            code_challenge: pkce.challenge.clone(),
            code_challenge_method: pkce.method(),
            state: state.clone(),
        }
    }
}

/// Query parameters captured from the provider's redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackResult {
    pub code: String,
    pub state: String,
}

impl fmt::Debug for CallbackResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackResult")
            .field("code", &"***")
            .field("state", &"***")
            .finish()
    }
}

/// Parsed success body of the token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// The refresh token carried by this grant, ignoring empty strings.
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The credential currently in use. Replaced as a whole on every refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    scope: Option<String>,
}

impl AuthSession {
    /// # Arguments
    ///
    /// * `access_token` - Bearer token for Web API requests
    /// * `refresh_token` - Token used to obtain the next access token
    /// * `expires_at` - Absolute expiry instant of `access_token`
    /// * `scope` - Scopes granted by the provider, if reported
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
        scope: Option<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
            scope,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// True once `now + margin` has reached the expiry instant.
    pub fn expires_within(&self, margin: TimeDelta, now: DateTime<Utc>) -> bool {
        now + margin >= self.expires_at
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// On-disk form of the token cache. Access tokens are never written.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenCacheEntry {
    pub refresh_token: String,
}

/// Observable state of the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Authorizing,
    Ready,
    Refreshing,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Authorizing => "authorizing",
            Phase::Ready => "ready",
            Phase::Refreshing => "refreshing",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}
