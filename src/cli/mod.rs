//! # CLI Module
//!
//! Command-line front end for spotnow. It plays the part of the external
//! collaborator around the authorization core: it reads the configuration,
//! presents the authorization URL to the user and turns [`AuthError`]s into
//! terminal messages. The library itself never prints.
//!
//! ## Commands
//!
//! - [`auth`] - Establish a session, interactively if no credential is cached
//! - [`token`] - Print a currently valid access token
//! - [`status`] - Report whether a refresh token is cached
//! - [`logout`] - Delete the cached refresh token
//!
//! ## Usage
//!
//! ```bash
//! spotnow auth                 # authorize once, caches the refresh token
//! spotnow token                # access token for scripts, refreshed as needed
//! curl -H "Authorization: Bearer $(spotnow token)" \
//!   https://api.spotify.com/v1/me/player/currently-playing
//! ```

mod auth;

use std::sync::Arc;

use url::Url;

use crate::{
    config::AuthConfig,
    error,
    error::AuthError,
    info,
    management::{AuthorizationPrompt, TokenManager},
    warning,
};

pub use auth::auth;
pub use auth::logout;
pub use auth::status;
pub use auth::token;

/// Opens the authorization URL in the default browser and prints it for
/// users on another device or without a browser.
pub struct BrowserPrompt;

impl AuthorizationPrompt for BrowserPrompt {
    fn present(&self, url: &Url) {
        if webbrowser::open(url.as_str()).is_err() {
            warning!("Failed to open browser.");
        }
        info!("Go to {} in your browser to authenticate.", url);
    }
}

fn load_config() -> AuthConfig {
    match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration: {}", e),
    }
}

fn manager(config: &AuthConfig) -> TokenManager {
    match TokenManager::from_config(config, Arc::new(BrowserPrompt)) {
        Ok(manager) => manager,
        Err(e) => error!("Cannot set up authorization: {}", e),
    }
}

/// One line telling the user what to do about `err`.
fn hint(err: &AuthError) -> &'static str {
    match err {
        AuthError::Bind { .. } => {
            "Another process holds the callback port. Free it or change SPOTIFY_API_REDIRECT_URI."
        }
        AuthError::StateMismatch => {
            "The redirect did not belong to this attempt and was discarded. Run `spotnow auth` again."
        }
        AuthError::ReauthorizationRequired | AuthError::InvalidGrant { .. } => {
            "Run `spotnow auth` to authorize again."
        }
        AuthError::Config(_) => "Check the .env file in the spotnow data directory.",
        e if e.is_retryable() => "Run the command again to start a new attempt.",
        _ => "See the error above.",
    }
}
