pub mod candidates;
pub mod error;
pub mod matches;
pub mod middleware;
pub mod rewind;
pub mod swipes;
pub mod webhook;

use std::sync::Arc;

use ember_db::Database;
use ember_engage::{GreetingConfig, Notifier};

/// Shared application state for all route handlers. Everything is
/// constructed in main and injected; no ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub notifier: Notifier,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub greeting: GreetingConfig,
}
