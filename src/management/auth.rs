use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{TimeDelta, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    Res,
    config::AuthConfig,
    error::AuthError,
    management::{FileTokenCache, TokenCache},
    server::{CallbackListener, LoopbackListener},
    spotify::{SpotifyTokenClient, TokenExchange, build_authorization_url},
    types::{AuthSession, AuthorizationRequest, Phase, TokenGrant},
    utils,
};

/// Access tokens are renewed this many seconds before they expire, so a
/// token handed out is never about to lapse while a request is in flight.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Shows the authorization URL to the user. Opening a browser or printing
/// the URL is up to the implementation.
pub trait AuthorizationPrompt: Send + Sync {
    fn present(&self, url: &Url);
}

enum SessionState {
    Empty,
    Active(AuthSession),
    /// The refresh token was rejected while running.
    Revoked,
}

/// Owns the session and is the only place that mutates it.
///
/// [`start`](Self::start) establishes a session from the cache or through
/// the interactive flow; [`get_access_token`](Self::get_access_token) hands
/// out a token that is valid for at least [`REFRESH_MARGIN_SECS`], refreshing
/// first if needed. Both run under one async mutex, so at most one exchange
/// is in flight and concurrent callers wait for its outcome.
pub struct TokenManager {
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
    authorize_url: Url,
    exchange: Arc<dyn TokenExchange>,
    cache: Arc<dyn TokenCache>,
    listener: Arc<dyn CallbackListener>,
    prompt: Arc<dyn AuthorizationPrompt>,
    session: Mutex<SessionState>,
    phase: watch::Sender<Phase>,
    /// False while the cache holds an older refresh token than the session.
    persisted: AtomicBool,
}

impl TokenManager {
    /// Creates a manager around its collaborators. Nothing is loaded or
    /// contacted until [`start`](Self::start).
    ///
    /// # Arguments
    ///
    /// * `config` - Client id, redirect URI, scopes and authorize endpoint
    /// * `exchange` - Token endpoint client
    /// * `cache` - Storage for the refresh token
    /// * `listener` - Source of the authorization redirect
    /// * `prompt` - Shows the authorization URL to the user
    pub fn new(
        config: &AuthConfig,
        exchange: Arc<dyn TokenExchange>,
        cache: Arc<dyn TokenCache>,
        listener: Arc<dyn CallbackListener>,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Self {
        Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.to_string(),
            scopes: config.scopes.clone(),
            authorize_url: config.authorize_url.clone(),
            exchange,
            cache,
            listener,
            prompt,
            session: Mutex::new(SessionState::Empty),
            phase: watch::Sender::new(Phase::Uninitialized),
            persisted: AtomicBool::new(true),
        }
    }

    /// Wires the Spotify token client, the file cache and the loopback
    /// listener described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig, prompt: Arc<dyn AuthorizationPrompt>) -> Res<Self> {
        Ok(Self::new(
            config,
            Arc::new(SpotifyTokenClient::from_config(config)?),
            Arc::new(FileTokenCache::new(config.token_cache_path.clone())),
            Arc::new(LoopbackListener::from_config(config)),
            prompt,
        ))
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Whether the refresh token of the current session made it into the
    /// cache. A failed write does not stop the session, but the next process
    /// will have to authorize again.
    pub fn credential_persisted(&self) -> bool {
        self.persisted.load(Ordering::Acquire)
    }

    pub async fn has_cached_credential(&self) -> bool {
        self.cache.load().await.is_some()
    }

    /// Snapshot of the current session. Waits while a refresh is running.
    pub async fn session(&self) -> Option<AuthSession> {
        match &*self.session.lock().await {
            SessionState::Active(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Establishes a session.
    ///
    /// A cached refresh token is tried first. If the provider rejects it the
    /// cache is cleared and the interactive flow runs instead. Every
    /// interactive attempt uses a fresh PKCE verifier and state.
    ///
    /// # Errors
    ///
    /// Any error leaves the manager in [`Phase::Failed`]. Calling `start`
    /// again begins a new attempt. After a revocation, a failed attempt
    /// keeps [`get_access_token`](Self::get_access_token) reporting
    /// [`AuthError::ReauthorizationRequired`].
    ///
    /// A denial redirect only counts as [`AuthError::AuthorizationDenied`]
    /// when it echoes this attempt's state; anything else is
    /// [`AuthError::StateMismatch`].
    pub async fn start(&self) -> Res<()> {
        let mut guard = self.session.lock().await;
        match self.establish().await {
            Ok(session) => {
                info!(expires_at = %session.expires_at(), "session ready");
                *guard = SessionState::Active(session);
                self.phase.send_replace(Phase::Ready);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "could not establish a session");
                if !matches!(*guard, SessionState::Revoked) {
                    *guard = SessionState::Empty;
                }
                self.phase.send_replace(Phase::Failed);
                Err(e)
            }
        }
    }

    /// Returns an access token valid for at least the refresh margin.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotStarted`] before a successful [`start`](Self::start)
    /// - [`AuthError::ReauthorizationRequired`] once the refresh token has
    ///   been revoked; only a new interactive authorization recovers
    /// - transient exchange errors, which keep the previous session
    pub async fn get_access_token(&self) -> Res<String> {
        let mut guard = self.session.lock().await;
        let refresh_token = match &*guard {
            SessionState::Empty => return Err(AuthError::NotStarted),
            SessionState::Revoked => return Err(AuthError::ReauthorizationRequired),
            SessionState::Active(session)
                if !session.expires_within(refresh_margin(), Utc::now()) =>
            {
                return Ok(session.access_token().to_string());
            }
            SessionState::Active(session) => session.refresh_token().to_string(),
        };

        debug!("access token is about to expire, refreshing");
        self.phase.send_replace(Phase::Refreshing);
        match self.refresh_with(&refresh_token).await {
            Ok(session) => {
                let access_token = session.access_token().to_string();
                *guard = SessionState::Active(session);
                self.phase.send_replace(Phase::Ready);
                Ok(access_token)
            }
            Err(AuthError::InvalidGrant { description, .. }) => {
                warn!(reason = %description, "refresh token revoked, authorization required");
                self.forget_cached().await;
                *guard = SessionState::Revoked;
                self.phase.send_replace(Phase::Failed);
                Err(AuthError::ReauthorizationRequired)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, keeping the current session");
                self.phase.send_replace(Phase::Ready);
                Err(e)
            }
        }
    }

    /// Drops the session and deletes the cached refresh token.
    pub async fn logout(&self) -> Res<()> {
        let mut guard = self.session.lock().await;
        self.cache.clear().await?;
        *guard = SessionState::Empty;
        self.persisted.store(true, Ordering::Release);
        self.phase.send_replace(Phase::Uninitialized);
        Ok(())
    }

    async fn establish(&self) -> Res<AuthSession> {
        if let Some(refresh_token) = self.cache.load().await {
            debug!("found cached refresh token");
            self.phase.send_replace(Phase::Refreshing);
            match self.refresh_with(&refresh_token).await {
                Ok(session) => return Ok(session),
                Err(AuthError::InvalidGrant { description, .. }) => {
                    warn!(reason = %description, "cached refresh token rejected, authorizing again");
                    self.forget_cached().await;
                }
                Err(e) => return Err(e),
            }
        }

        self.phase.send_replace(Phase::Authorizing);
        self.authorize().await
    }

    async fn authorize(&self) -> Res<AuthSession> {
        let pkce = utils::generate_pkce()?;
        let state = utils::generate_state()?;
        let request = AuthorizationRequest::new(
            &self.client_id,
            &self.redirect_uri,
            &self.scopes,
            &pkce,
            &state,
        );
        let url = build_authorization_url(&self.authorize_url, &request);

        let pending = self.listener.open().await?;
        self.prompt.present(&url);
        let callback = match pending.receive().await {
            Ok(callback) => callback,
            Err(AuthError::AuthorizationDenied {
                reason,
                state: Some(echoed),
            }) if state.matches(&echoed) => {
                return Err(AuthError::AuthorizationDenied {
                    reason,
                    state: Some(echoed),
                });
            }
            Err(AuthError::AuthorizationDenied { .. }) => {
                warn!("denial redirect does not carry the state of this attempt, aborting");
                return Err(AuthError::StateMismatch);
            }
            Err(e) => return Err(e),
        };

        if !state.matches(&callback.state) {
            warn!("authorization callback state does not match, aborting");
            return Err(AuthError::StateMismatch);
        }

        let grant = self
            .exchange
            .exchange_authorization_code(&callback.code, &pkce.verifier)
            .await?;
        self.adopt(grant, None).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> Res<AuthSession> {
        let grant = self.exchange.exchange_refresh_token(refresh_token).await?;
        self.adopt(grant, Some(refresh_token)).await
    }

    /// Turns a grant into a session, persisting a rotated refresh token.
    /// Without rotation the previous token stays valid and the cache is left
    /// untouched.
    async fn adopt(&self, grant: TokenGrant, previous: Option<&str>) -> Res<AuthSession> {
        let ttl = i64::try_from(grant.expires_in).unwrap_or(i64::MAX);
        let expires_at = TimeDelta::try_seconds(ttl)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::MalformedResponse(format!(
                    "expires_in out of range: {}",
                    grant.expires_in
                ))
            })?;

        let refresh_token = match (grant.rotated_refresh_token(), previous) {
            (Some(rotated), _) => {
                match self.cache.save(rotated).await {
                    Ok(()) => self.persisted.store(true, Ordering::Release),
                    Err(e) => {
                        warn!(error = %e, "could not persist refresh token");
                        self.persisted.store(false, Ordering::Release);
                    }
                }
                rotated.to_string()
            }
            (None, Some(previous)) => previous.to_string(),
            (None, None) => {
                return Err(AuthError::MalformedResponse(
                    "token response carried no refresh_token".to_string(),
                ));
            }
        };

        Ok(AuthSession::new(
            grant.access_token,
            refresh_token,
            expires_at,
            grant.scope,
        ))
    }

    async fn forget_cached(&self) {
        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "could not clear token cache");
        }
    }
}

fn refresh_margin() -> TimeDelta {
    TimeDelta::seconds(REFRESH_MARGIN_SECS)
}
