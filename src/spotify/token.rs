use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    config::AuthConfig,
    error::{AuthError, GrantKind},
    types::TokenGrant,
};

/// The two token-producing exchanges of the PKCE flow.
///
/// Implementations never retry on their own. A rejected grant is reported as
/// [`AuthError::InvalidGrant`] so callers can tell a dead credential apart
/// from a transport failure.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<TokenGrant, AuthError>;

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

/// Error body defined by RFC 6749 section 5.2.
#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Token endpoint client for a public (secretless) PKCE client.
#[derive(Debug, Clone)]
pub struct SpotifyTokenClient {
    client: Client,
    token_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl SpotifyTokenClient {
    /// Creates a client for the token endpoint at `token_url`.
    ///
    /// # Arguments
    ///
    /// * `token_url` - Token endpoint, usually `https://accounts.spotify.com/api/token`
    /// * `client_id` - Client id of the registered application
    /// * `redirect_uri` - Redirect URI sent with the code exchange; must equal
    ///   the one in the authorization request
    /// * `timeout` - Upper bound for a whole request
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] if the HTTP client cannot be built.
    pub fn new(
        token_url: Url,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token_url,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        })
    }

    /// Client for the endpoint, client id and timeout in `config`.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(
            config.token_url.clone(),
            config.client_id.clone(),
            config.redirect_uri.as_str(),
            config.http_timeout,
        )
    }

    async fn request(
        &self,
        grant: GrantKind,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, AuthError> {
        let res = self
            .client
            .post(self.token_url.clone())
            .form(form)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        debug!(%grant, status = status.as_u16(), "token endpoint answered");

        if !status.is_success() {
            return Err(classify_failure(grant, status, &body));
        }

        serde_json::from_str::<TokenGrant>(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenExchange for SpotifyTokenClient {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<TokenGrant, AuthError> {
        let grant = self
            .request(
                GrantKind::AuthorizationCode,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", self.redirect_uri.as_str()),
                    ("client_id", self.client_id.as_str()),
                    ("code_verifier", verifier),
                ],
            )
            .await?;

        // Without a refresh token the session could not outlive the first
        // access token.
        if grant.rotated_refresh_token().is_none() {
            return Err(AuthError::MalformedResponse(
                "authorization code grant returned no refresh_token".to_string(),
            ));
        }
        Ok(grant)
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        self.request(
            GrantKind::RefreshToken,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ],
        )
        .await
    }
}

fn classify_failure(grant: GrantKind, status: StatusCode, body: &str) -> AuthError {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(err)
            if err.error == "invalid_grant"
                && matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) =>
        {
            AuthError::InvalidGrant {
                grant,
                description: err.error_description.unwrap_or(err.error),
            }
        }
        Ok(err) => AuthError::Rejected {
            status: status.as_u16(),
            error: match err.error_description {
                Some(description) => format!("{}: {description}", err.error),
                None => err.error,
            },
        },
        Err(_) => AuthError::Rejected {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("unknown").to_string(),
        },
    }
}
