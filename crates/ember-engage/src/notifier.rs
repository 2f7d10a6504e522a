use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use ember_types::events::NotificationEvent;

/// Emits notification events to whoever listens: the optional HTTP
/// forwarder, tests, future in-process consumers. Cloneable handle over
/// a broadcast channel.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    tx: broadcast::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { inner: Arc::new(NotifierInner { tx }) }
    }

    /// Fire-and-forget; an event with no subscribers is dropped.
    pub fn emit(&self, event: NotificationEvent) {
        let _ = self.inner.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every event to the external notification transport as JSON.
/// Transport failures are logged and dropped; delivery retries belong
/// to the transport, not the matching core.
pub async fn run_forwarder(notifier: Notifier, transport_url: String) {
    let client = reqwest::Client::new();
    let mut rx = notifier.subscribe();

    loop {
        match rx.recv().await {
            Ok(event) => {
                let match_id = event.match_id().to_string();
                match client.post(&transport_url).json(&event).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        debug!("Notification forwarded for match {}", match_id);
                    }
                    Ok(resp) => {
                        warn!(
                            "Notification transport returned {} for match {}",
                            resp.status(),
                            match_id
                        );
                    }
                    Err(e) => {
                        warn!("Notification transport error for match {}: {}", match_id, e);
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Notification forwarder lagged, {} events skipped", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
