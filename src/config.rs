//! Configuration management for spotnow.
//!
//! Values come from the process environment, after a `.env` file in the
//! local data directory has been merged into it:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Built-in defaults for everything except the client id
//!
//! [`AuthConfig::from_lookup`] accepts any key/value source, which keeps the
//! parsing logic testable without mutating the process environment.

use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    path::PathBuf,
    time::Duration,
};

use tracing::debug;
use url::{Host, Url};

use crate::error::ConfigError;

pub const CLIENT_ID: &str = "SPOTIFY_API_AUTH_CLIENT_ID";
pub const REDIRECT_URI: &str = "SPOTIFY_API_REDIRECT_URI";
pub const SCOPE: &str = "SPOTIFY_API_AUTH_SCOPE";
pub const AUTH_URL: &str = "SPOTIFY_API_AUTH_URL";
pub const TOKEN_URL: &str = "SPOTIFY_API_TOKEN_URL";
pub const SERVER_ADDRESS: &str = "SERVER_ADDRESS";
pub const CALLBACK_TIMEOUT: &str = "SPOTNOW_CALLBACK_TIMEOUT_SECS";
pub const HTTP_TIMEOUT: &str = "SPOTNOW_HTTP_TIMEOUT_SECS";
pub const TOKEN_CACHE: &str = "SPOTNOW_TOKEN_CACHE";

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_SCOPE: &str = "user-read-currently-playing user-read-playback-state";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Name of the application directory below the platform data directory.
const APP_DIR: &str = "spotnow";

/// Loads environment variables from `spotnow/.env` in the local data directory.
///
/// The directory is created if needed. A missing `.env` file is not an
/// error, since every setting can also come from the environment:
/// - Linux: `~/.local/share/spotnow/.env`
/// - macOS: `~/Library/Application Support/spotnow/.env`
/// - Windows: `%LOCALAPPDATA%/spotnow/.env`
///
/// # Errors
///
/// Returns [`ConfigError::EnvFile`] if the directory cannot be created or the
/// file exists but cannot be parsed.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = app_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::EnvFile {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded environment file");
            Ok(())
        }
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::EnvFile {
            path,
            reason: e.to_string(),
        }),
    }
}

fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Default token cache location: `<local data dir>/spotnow/cache/token.json`.
pub fn default_token_cache_path() -> PathBuf {
    let mut path = app_dir();
    path.push("cache/token.json");
    path
}

/// Everything the authorization core needs to talk to the provider.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    /// Must match a redirect URI registered for the client exactly.
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub authorize_url: Url,
    pub token_url: Url,
    /// Socket the loopback listener binds.
    pub bind_addr: SocketAddr,
    pub callback_timeout: Duration,
    pub http_timeout: Duration,
    pub token_cache_path: PathBuf,
}

impl AuthConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get(CLIENT_ID).ok_or(ConfigError::Missing(CLIENT_ID))?;

        let redirect_uri = parse_url(
            REDIRECT_URI,
            &get(REDIRECT_URI).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        )?;
        if redirect_uri.scheme() != "http" {
            return Err(ConfigError::Invalid {
                name: REDIRECT_URI,
                reason: "the loopback listener only serves plain http".to_string(),
            });
        }

        let scopes = get(SCOPE)
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let authorize_url = parse_url(
            AUTH_URL,
            &get(AUTH_URL).unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        )?;
        let token_url = parse_url(
            TOKEN_URL,
            &get(TOKEN_URL).unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        )?;

        let bind_addr = resolve_bind_addr(get(SERVER_ADDRESS).as_deref(), &redirect_uri)?;

        let callback_timeout = Duration::from_secs(parse_secs(
            CALLBACK_TIMEOUT,
            get(CALLBACK_TIMEOUT),
            DEFAULT_CALLBACK_TIMEOUT_SECS,
        )?);
        let http_timeout = Duration::from_secs(parse_secs(
            HTTP_TIMEOUT,
            get(HTTP_TIMEOUT),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        let token_cache_path = get(TOKEN_CACHE)
            .map(PathBuf::from)
            .unwrap_or_else(default_token_cache_path);

        Ok(Self {
            client_id,
            redirect_uri,
            scopes,
            authorize_url,
            token_url,
            bind_addr,
            callback_timeout,
            http_timeout,
            token_cache_path,
        })
    }

    /// Path component of the redirect URI, which is the only route the
    /// loopback listener serves.
    pub fn redirect_path(&self) -> &str {
        self.redirect_uri.path()
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_secs(
    name: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

/// Picks the address the loopback listener binds.
///
/// `SERVER_ADDRESS` wins when set. The value `auto` keeps the redirect port
/// but binds the address of the interface used for outbound traffic, which
/// lets a browser on another device on the LAN reach the listener. Without
/// `SERVER_ADDRESS` the redirect URI's own host and port are used.
fn resolve_bind_addr(
    server_address: Option<&str>,
    redirect_uri: &Url,
) -> Result<SocketAddr, ConfigError> {
    let port = redirect_uri
        .port_or_known_default()
        .ok_or_else(|| ConfigError::Invalid {
            name: REDIRECT_URI,
            reason: "no port".to_string(),
        })?;

    match server_address {
        Some("auto") => Ok(SocketAddr::new(outbound_ip()?, port)),
        Some(addr) => addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: SERVER_ADDRESS,
                reason: e.to_string(),
            }),
        None => {
            let ip = match redirect_uri.host() {
                Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
                Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
                Some(Host::Domain("localhost")) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: REDIRECT_URI,
                        reason: format!("cannot derive a bind address, set {SERVER_ADDRESS}"),
                    });
                }
            };
            Ok(SocketAddr::new(ip, port))
        }
    }
}

/// Address of the interface the OS routes outbound traffic through.
/// Connecting a UDP socket sends no packets.
fn outbound_ip() -> Result<IpAddr, ConfigError> {
    let detect = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    detect().map_err(|e| ConfigError::Invalid {
        name: SERVER_ADDRESS,
        reason: format!("cannot detect the outbound interface: {e}"),
    })
}
