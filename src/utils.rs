use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::{
    error::AuthError,
    types::{PkceChallenge, StateToken},
};

/// 96 bytes encode to exactly 128 base64url characters, the PKCE maximum.
const VERIFIER_BYTES: usize = 96;
const STATE_BYTES: usize = 32;

fn random_urlsafe(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generates a PKCE code verifier.
///
/// # Returns
///
/// 128 characters from the base64url alphabet, built from operating system
/// randomness.
///
/// # Errors
///
/// Returns [`AuthError::Entropy`] if the system random source fails.
pub fn generate_code_verifier() -> Result<String, AuthError> {
    random_urlsafe(VERIFIER_BYTES)
}

/// Derives the S256 challenge for `verifier`: base64url without padding of
/// its SHA-256 digest, always 43 characters.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates a fresh verifier together with its challenge.
///
/// # Errors
///
/// Returns [`AuthError::Entropy`] if the system random source fails.
pub fn generate_pkce() -> Result<PkceChallenge, AuthError> {
    let verifier = generate_code_verifier()?;
    let challenge = generate_code_challenge(&verifier);
    Ok(PkceChallenge {
        verifier,
        challenge,
    })
}

/// Generates an anti-CSRF state token of 43 base64url characters.
///
/// # Errors
///
/// Returns [`AuthError::Entropy`] if the system random source fails.
pub fn generate_state() -> Result<StateToken, AuthError> {
    random_urlsafe(STATE_BYTES).map(StateToken::new)
}

impl PkceChallenge {
    /// Same as [`generate_pkce`].
    pub fn generate() -> Result<Self, AuthError> {
        generate_pkce()
    }
}
