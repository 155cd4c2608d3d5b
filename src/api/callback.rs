use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::{error::AuthError, types::CallbackResult};

/// Sender for the single redirect the listener accepts. Taken by the first
/// request that reaches the handler.
pub type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Result<CallbackResult, AuthError>>>>>;

const PAGE_RECEIVED: &str =
    "<h2>Authorization received.</h2><p>You can close this window and return to the terminal.</p>";
const PAGE_DENIED: &str = "<h4>Authorization was denied.</h4><p>You can close this window.</p>";
const PAGE_MALFORMED: &str = "<h4>Malformed authorization callback.</h4>";
const PAGE_HANDLED: &str = "<h4>This authorization attempt was already handled.</h4>";

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(slot): Extension<CallbackSlot>,
) -> (StatusCode, Html<&'static str>) {
    let Some(sender) = slot.lock().await.take() else {
        debug!("ignoring redirect after the first one");
        return (StatusCode::GONE, Html(PAGE_HANDLED));
    };

    let outcome = parse_callback(&params);
    let page = match &outcome {
        Ok(_) => (StatusCode::OK, Html(PAGE_RECEIVED)),
        Err(AuthError::AuthorizationDenied { .. }) => (StatusCode::OK, Html(PAGE_DENIED)),
        Err(_) => (StatusCode::BAD_REQUEST, Html(PAGE_MALFORMED)),
    };

    if sender.send(outcome).is_err() {
        warn!("authorization callback arrived after the listener stopped waiting");
    }
    page
}

/// Extracts `code` and `state` from the redirect's query parameters.
///
/// A provider `error` parameter wins over everything else; the echoed state
/// travels with the denial so the caller can verify it. Missing or empty
/// `code`/`state` is a hard error.
pub fn parse_callback(params: &HashMap<String, String>) -> Result<CallbackResult, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(AuthError::AuthorizationDenied {
            reason: error.clone(),
            state: params.get("state").filter(|v| !v.is_empty()).cloned(),
        });
    }

    let field = |name: &str| {
        params
            .get(name)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| AuthError::MalformedCallback(format!("missing `{name}` parameter")))
    };

    Ok(CallbackResult {
        code: field("code")?,
        state: field("state")?,
    })
}
