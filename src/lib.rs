//! spotnow library
//!
//! Obtains a Spotify Web API credential for a single local user through the
//! OAuth 2.0 Authorization Code flow with PKCE and keeps it valid through
//! refresh-token exchanges. Tools that poll the Web API only need
//! [`management::TokenManager`]: `start` once, then `get_access_token`
//! whenever a request is about to be made.
//!
//! # Modules
//!
//! - `api` - HTTP handler for the authorization redirect
//! - `cli` - Command-line front end
//! - `config` - Configuration from environment variables and `.env`
//! - `error` - Error types
//! - `management` - Token lifecycle manager and token cache
//! - `server` - One-shot loopback listener for the redirect
//! - `spotify` - Authorization URL and token endpoint client
//! - `types` - Data structures shared across the crate
//! - `utils` - PKCE and state generation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spotnow::{config::AuthConfig, management::TokenManager};
//!
//! let config = AuthConfig::from_env()?;
//! let manager = TokenManager::from_config(&config, Arc::new(spotnow::cli::BrowserPrompt))?;
//! manager.start().await?;
//! let token = manager.get_access_token().await?;
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::AuthError;

/// Result alias used throughout the crate.
pub type Res<T> = std::result::Result<T, AuthError>;

/// Prints an informational message with a blue bullet point.
///
/// Terminal output for the CLI layer only; the library logs through
/// `tracing` instead. Status lines go to stderr so stdout stays usable
/// for command output such as `spotnow token`.
///
/// ```ignore
/// info!("Starting authentication process...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the
/// program with status 1. Only for unrecoverable errors in the CLI.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
