use std::collections::HashSet;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use spotnow::types::{PKCE_METHOD, StateToken};
use spotnow::utils::*;

fn is_urlsafe(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier().unwrap();

    // 128 characters is the upper bound allowed for a verifier
    assert_eq!(verifier.len(), 128);
    assert!(is_urlsafe(&verifier));

    let verifier2 = generate_code_verifier().unwrap();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    // Deterministic
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // SHA-256 digest is 32 bytes, 43 characters without padding
    assert_eq!(challenge.len(), 43);
    assert!(is_urlsafe(&challenge));
    assert!(!challenge.ends_with('='));
}

#[test]
fn test_code_challenge_known_vector() {
    // Example from RFC 7636 appendix B
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    assert_eq!(
        generate_code_challenge(verifier),
        "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    );
}

#[test]
fn test_generate_pkce_challenge_matches_verifier() {
    for _ in 0..100 {
        let pkce = generate_pkce().unwrap();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier.as_bytes()));

        assert_eq!(pkce.challenge, expected);
        assert_eq!(pkce.method(), PKCE_METHOD);
        assert!((43..=128).contains(&pkce.verifier.len()));
    }
}

#[test]
fn test_pkce_debug_hides_verifier() {
    let pkce = generate_pkce().unwrap();
    let debug = format!("{:?}", pkce);

    assert!(!debug.contains(&pkce.verifier));
    assert!(debug.contains(&pkce.challenge));
}

#[test]
fn test_generate_state_never_repeats() {
    let mut seen = HashSet::new();
    let mut previous = generate_state().unwrap().as_str().to_string();

    for _ in 0..10_000 {
        let state = generate_state().unwrap().as_str().to_string();
        assert_ne!(state, previous);
        assert!(seen.insert(state.clone()), "state value repeated");
        previous = state;
    }
}

#[test]
fn test_generate_state_shape() {
    let state = generate_state().unwrap();

    assert_eq!(state.as_str().len(), 43);
    assert!(is_urlsafe(state.as_str()));
}

#[test]
fn test_state_token_matches() {
    let state = StateToken::new("abc123".to_string());

    assert!(state.matches("abc123"));
    assert!(!state.matches("abc124"));
    assert!(!state.matches("abc12"));
    assert!(!state.matches(""));
}

#[test]
fn test_state_token_debug_is_redacted() {
    let state = generate_state().unwrap();
    assert!(!format!("{:?}", state).contains(state.as_str()));
}
