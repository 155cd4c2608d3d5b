mod auth;
mod cache;

pub use auth::AuthorizationPrompt;
pub use auth::REFRESH_MARGIN_SECS;
pub use auth::TokenManager;
pub use cache::FileTokenCache;
pub use cache::TokenCache;
