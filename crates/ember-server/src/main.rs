use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ember_api::middleware::require_auth;
use ember_api::{AppState, candidates, matches, rewind, swipes, webhook};
use ember_engage::{GreetingConfig, Notifier, notifier, worker};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = require_secret("EMBER_JWT_SECRET")?;
    let webhook_secret = require_secret("EMBER_WEBHOOK_SECRET")?;

    let host = std::env::var("EMBER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("EMBER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("EMBER_DB_PATH")
        .unwrap_or_else(|_| "ember.db".into())
        .into();
    let delay_min: u64 = env_or("EMBER_GREETING_DELAY_MIN_SECS", 10);
    let delay_max: u64 = env_or("EMBER_GREETING_DELAY_MAX_SECS", 60);
    let poll_secs: u64 = env_or("EMBER_GREETING_POLL_SECS", 5);
    let notify_url = std::env::var("EMBER_NOTIFY_URL").ok();

    // Init database
    let db = Arc::new(ember_db::Database::open(&db_path)?);

    // Notification emitter + background tasks
    let notifier_handle = Notifier::new();
    if let Some(url) = notify_url {
        info!("Forwarding notification events to {}", url);
        tokio::spawn(notifier::run_forwarder(notifier_handle.clone(), url));
    }
    tokio::spawn(worker::run_delivery_loop(
        db.clone(),
        notifier_handle.clone(),
        poll_secs,
    ));

    let state = AppState {
        db,
        notifier: notifier_handle,
        jwt_secret,
        webhook_secret,
        greeting: GreetingConfig {
            delay_min_secs: delay_min,
            delay_max_secs: delay_max,
        },
    };

    // Routes. The webhook authenticates with its own shared secret, so
    // it sits outside the JWT middleware.
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/webhook/match-event", post(webhook::match_event))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/candidates", get(candidates::list_candidates))
        .route("/swipe", post(swipes::swipe))
        .route("/rewind", post(rewind::rewind))
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}/messages", get(matches::get_messages))
        .route("/matches/{match_id}/messages", post(matches::send_message))
        .route("/matches/{match_id}/read", post(matches::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("ember server listening on {}", addr);
    info!("Greeting delay window: {}-{}s, poll every {}s", delay_min, delay_max, poll_secs);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// A required secret must be set and not left at a placeholder value.
fn require_secret(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).unwrap_or_default();
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        anyhow::bail!("{} is unset or still a placeholder; set it in your .env and restart", name);
    }
    Ok(value)
}

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_secrets_are_refused() {
        // Env var names are namespaced per test to avoid cross-test races.
        unsafe {
            std::env::set_var("EMBER_TEST_SECRET_A", "dev-secret-change-me");
        }
        assert!(require_secret("EMBER_TEST_SECRET_A").is_err());
        assert!(require_secret("EMBER_TEST_SECRET_UNSET").is_err());

        unsafe {
            std::env::set_var("EMBER_TEST_SECRET_B", "a-real-secret");
        }
        assert_eq!(require_secret("EMBER_TEST_SECRET_B").unwrap(), "a-real-secret");
    }
}
