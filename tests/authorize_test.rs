use std::collections::HashMap;

use spotnow::spotify::build_authorization_url;
use spotnow::types::{AuthorizationRequest, PkceChallenge, StateToken};
use url::Url;

fn authorize_endpoint() -> Url {
    Url::parse("https://accounts.spotify.com/authorize").unwrap()
}

fn request(pkce: &PkceChallenge, state: &StateToken) -> AuthorizationRequest {
    AuthorizationRequest::new(
        "client-123",
        "http://127.0.0.1:8080/callback",
        &[
            "user-read-currently-playing".to_string(),
            "user-read-playback-state".to_string(),
        ],
        pkce,
        state,
    )
}

fn query(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

#[test]
fn test_url_carries_all_parameters() {
    let pkce = PkceChallenge::generate().unwrap();
    let state = StateToken::new("state-xyz".to_string());
    let url = build_authorization_url(&authorize_endpoint(), &request(&pkce, &state));

    assert_eq!(url.host_str(), Some("accounts.spotify.com"));
    assert_eq!(url.path(), "/authorize");

    let params = query(&url);
    assert_eq!(params["client_id"], "client-123");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], "http://127.0.0.1:8080/callback");
    assert_eq!(params["code_challenge"], pkce.challenge);
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["state"], "state-xyz");
    assert_eq!(
        params["scope"],
        "user-read-currently-playing user-read-playback-state"
    );
    assert_eq!(params.len(), 7);
}

#[test]
fn test_url_never_contains_verifier() {
    for _ in 0..50 {
        let pkce = PkceChallenge::generate().unwrap();
        let state = StateToken::new("s".to_string());
        let url = build_authorization_url(&authorize_endpoint(), &request(&pkce, &state));

        assert!(!url.as_str().contains(&pkce.verifier));
        assert!(url.as_str().contains("code_challenge_method=S256"));
    }
}

#[test]
fn test_values_are_encoded() {
    let pkce = PkceChallenge::generate().unwrap();
    let state = StateToken::new("a&b=c".to_string());
    let url = build_authorization_url(&authorize_endpoint(), &request(&pkce, &state));
    let raw = url.query().unwrap();

    assert!(raw.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
    assert!(raw.contains("state=a%26b%3Dc"));
    assert!(raw.contains("scope=user-read-currently-playing+user-read-playback-state"));
    assert_eq!(query(&url)["state"], "a&b=c");
}

#[test]
fn test_build_is_deterministic() {
    let pkce = PkceChallenge::generate().unwrap();
    let state = StateToken::new("fixed".to_string());
    let req = request(&pkce, &state);

    assert_eq!(
        build_authorization_url(&authorize_endpoint(), &req),
        build_authorization_url(&authorize_endpoint(), &req)
    );
}
