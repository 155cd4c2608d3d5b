//! HTTP handlers served by the loopback listener.
//!
//! The listener routes exactly one path, the redirect path registered with
//! the provider, to [`callback`]. The handler hands the parsed redirect to
//! whoever is waiting on the listener and answers the browser with a short
//! page. See [`crate::server`] for binding and shutdown.

mod callback;

pub use callback::{CallbackSlot, callback, parse_callback};
