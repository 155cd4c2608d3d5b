//! Error types for the authorization core.
//!
//! Every fallible operation in the crate returns [`AuthError`]. The variants
//! map one-to-one onto the ways an authorization attempt or a token refresh
//! can end, so callers can decide between restarting the flow, retrying
//! later, or giving up without inspecting message strings.

use std::{fmt, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

/// Which grant a token exchange was performed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantKind::AuthorizationCode => write!(f, "authorization code"),
            GrantKind::RefreshToken => write!(f, "refresh token"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The loopback listener could not open its socket.
    #[error("cannot bind callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Nobody completed the browser step within the allowed time.
    #[error("no authorization callback received within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("malformed authorization callback: {0}")]
    MalformedCallback(String),

    /// The provider redirected back with an `error` parameter instead of a code.
    #[error("authorization was denied: {reason}")]
    AuthorizationDenied {
        reason: String,
        /// State echoed by the redirect. A denial is only trusted once this
        /// matches the state of the attempt.
        state: Option<String>,
    },

    /// The callback carried a state that differs from the one we sent.
    #[error("authorization state mismatch, the callback was not issued for this attempt")]
    StateMismatch,

    #[error("the {grant} was rejected by the provider: {description}")]
    InvalidGrant {
        grant: GrantKind,
        description: String,
    },

    #[error("malformed token endpoint response: {0}")]
    MalformedResponse(String),

    #[error("token endpoint request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success answer from the token endpoint other than `invalid_grant`.
    #[error("token endpoint answered {status}: {error}")]
    Rejected { status: u16, error: String },

    /// The refresh token was revoked while running; a new interactive
    /// authorization is needed.
    #[error("the stored credential is no longer valid, run the authorization flow again")]
    ReauthorizationRequired,

    #[error("no session yet, the authorization flow has not completed")]
    NotStarted,

    #[error("secure random source unavailable: {0}")]
    Entropy(String),

    #[error("cannot write token cache: {0}")]
    Cache(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthError {
    /// Errors after which starting a new authorization attempt (with fresh
    /// PKCE and state values) or retrying later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Timeout(_)
                | AuthError::Network(_)
                | AuthError::AuthorizationDenied { .. }
                | AuthError::MalformedCallback(_)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("cannot load {}: {reason}", .path.display())]
    EnvFile { path: PathBuf, reason: String },
}
