use crate::{
    error, info,
    management::{FileTokenCache, TokenCache},
    success, warning,
};

use super::{hint, load_config, manager};

pub async fn auth(force: bool) {
    let config = load_config();
    let manager = manager(&config);

    if force {
        if let Err(e) = manager.logout().await {
            error!("Cannot clear cached credential: {}", e);
        }
    } else if manager.has_cached_credential().await {
        info!("Found a cached credential, renewing it.");
    }

    if let Err(e) = manager.start().await {
        error!("Authentication failed: {}\n{}", e, hint(&e));
    }

    if !manager.credential_persisted() {
        warning!("Could not save the credential. The next run will ask for authorization again.");
    }

    success!("Authentication successful!");
}

/// Prints an access token on stdout, authorizing first if needed.
pub async fn token() {
    let config = load_config();
    let manager = manager(&config);

    if let Err(e) = manager.start().await {
        error!("Authentication failed: {}\n{}", e, hint(&e));
    }

    match manager.get_access_token().await {
        Ok(token) => println!("{}", token),
        Err(e) => error!("Cannot obtain an access token: {}\n{}", e, hint(&e)),
    }
}

pub async fn status() {
    let config = load_config();
    let cache = FileTokenCache::new(config.token_cache_path.clone());

    if cache.load().await.is_some() {
        success!("Cached credential found at {}", cache.path().display());
    } else {
        warning!("No cached credential. Run `spotnow auth` to authorize.");
    }
}

pub async fn logout() {
    let config = load_config();
    let manager = manager(&config);

    match manager.logout().await {
        Ok(()) => success!("Cached credential removed."),
        Err(e) => error!("Cannot remove cached credential: {}", e),
    }
}
