use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};

use spotnow::{config::AuthConfig, error::ConfigError};

fn load(pairs: &[(&str, &str)]) -> Result<AuthConfig, ConfigError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AuthConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = load(&[("SPOTIFY_API_AUTH_CLIENT_ID", "client-123")]).unwrap();

    assert_eq!(config.client_id, "client-123");
    assert_eq!(config.redirect_uri.as_str(), "http://127.0.0.1:8080/callback");
    assert_eq!(config.redirect_path(), "/callback");
    assert_eq!(
        config.scopes,
        vec!["user-read-currently-playing", "user-read-playback-state"]
    );
    assert_eq!(
        config.authorize_url.as_str(),
        "https://accounts.spotify.com/authorize"
    );
    assert_eq!(
        config.token_url.as_str(),
        "https://accounts.spotify.com/api/token"
    );
    assert_eq!(
        config.bind_addr,
        "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(config.callback_timeout, Duration::from_secs(300));
    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert!(config.token_cache_path.ends_with("spotnow/cache/token.json"));
}

#[test]
fn test_client_id_is_required() {
    assert_eq!(
        load(&[]).unwrap_err(),
        ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID")
    );
    assert_eq!(
        load(&[("SPOTIFY_API_AUTH_CLIENT_ID", "  ")]).unwrap_err(),
        ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID")
    );
}

#[test]
fn test_localhost_redirect_binds_loopback() {
    let config = load(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
        ("SPOTIFY_API_REDIRECT_URI", "http://localhost:8888/callback/"),
    ])
    .unwrap();

    assert_eq!(
        config.bind_addr,
        "127.0.0.1:8888".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(config.redirect_path(), "/callback/");
}

#[test]
fn test_explicit_server_address_wins() {
    let config = load(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
        ("SERVER_ADDRESS", "0.0.0.0:9000"),
    ])
    .unwrap();

    assert_eq!(config.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
}

#[test]
fn test_invalid_values() {
    assert!(matches!(
        load(&[
            ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
            ("SERVER_ADDRESS", "not-an-address"),
        ]),
        Err(ConfigError::Invalid { name: "SERVER_ADDRESS", .. })
    ));
    assert!(matches!(
        load(&[
            ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
            ("SPOTIFY_API_REDIRECT_URI", "https://127.0.0.1:8080/callback"),
        ]),
        Err(ConfigError::Invalid { name: "SPOTIFY_API_REDIRECT_URI", .. })
    ));
    assert!(matches!(
        load(&[
            ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
            ("SPOTIFY_API_REDIRECT_URI", "http://my-host.example:8080/callback"),
        ]),
        Err(ConfigError::Invalid { name: "SPOTIFY_API_REDIRECT_URI", .. })
    ));
    assert!(matches!(
        load(&[
            ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
            ("SPOTNOW_CALLBACK_TIMEOUT_SECS", "0"),
        ]),
        Err(ConfigError::Invalid { name: "SPOTNOW_CALLBACK_TIMEOUT_SECS", .. })
    ));
    assert!(matches!(
        load(&[
            ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
            ("SPOTNOW_HTTP_TIMEOUT_SECS", "ten"),
        ]),
        Err(ConfigError::Invalid { name: "SPOTNOW_HTTP_TIMEOUT_SECS", .. })
    ));
}

#[test]
fn test_overrides() {
    let config = load(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "c"),
        ("SPOTIFY_API_AUTH_SCOPE", "user-read-currently-playing"),
        ("SPOTIFY_API_TOKEN_URL", "http://127.0.0.1:9999/api/token"),
        ("SPOTNOW_CALLBACK_TIMEOUT_SECS", "30"),
        ("SPOTNOW_TOKEN_CACHE", "/tmp/spotnow-test/token.json"),
    ])
    .unwrap();

    assert_eq!(config.scopes, vec!["user-read-currently-playing"]);
    assert_eq!(config.token_url.as_str(), "http://127.0.0.1:9999/api/token");
    assert_eq!(config.callback_timeout, Duration::from_secs(30));
    assert_eq!(
        config.token_cache_path,
        PathBuf::from("/tmp/spotnow-test/token.json")
    );
}
