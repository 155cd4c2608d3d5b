//! Spotify accounts service endpoints.
//!
//! - [`authorize`] builds the URL the user opens to grant access.
//! - [`token`] talks to the token endpoint for both grants the crate uses.

pub mod authorize;
pub mod token;

pub use authorize::build_authorization_url;
pub use token::{SpotifyTokenClient, TokenExchange};
